//! Moderation commands: kick, ban, purge, giverole, removerole, joined, mute, unmute
//!
//! Every command checks the invoker's permissions before touching the guild.

use super::{CommandContext, Reply};
use crate::error::{BotError, BotResult};
use crate::platform::{Capability, ChatPlatform, MemberInfo, PlatformError, RoleInfo};
use crate::state::SubjectKey;
use log::info;
use std::sync::Arc;

const DEFAULT_REASON: &str = "No reason provided";
const PURGE_MAX: u64 = 100;
/// Discord caps member timeouts at 28 days; timed mutes follow the same limit.
const MAX_MUTE_SECS: u64 = 28 * 24 * 60 * 60;

/// Parse `<@id>`, `<@!id>` or a raw numeric id.
pub fn parse_member_reference(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();

    let numeric = if trimmed.starts_with("<@") && trimmed.ends_with('>') {
        let inner = trimmed.strip_prefix("<@")?.strip_suffix('>')?;
        inner.strip_prefix('!').unwrap_or(inner)
    } else {
        trimmed
    };

    numeric.parse::<u64>().ok().filter(|id| *id != 0)
}

fn platform_error(action: &str) -> impl Fn(PlatformError) -> BotError + '_ {
    move |error| match error {
        PlatformError::Forbidden => BotError::BotForbidden(action.to_string()),
        PlatformError::NotFound => BotError::NotFound("that member".to_string()),
        PlatformError::Other(message) => BotError::Platform(message),
    }
}

async fn resolve_member(ctx: &CommandContext<'_>, guild_id: u64, raw: &str) -> BotResult<MemberInfo> {
    let lookup = match parse_member_reference(raw) {
        Some(user_id) => ctx.platform.member(guild_id, user_id).await,
        None => ctx.platform.find_member_by_name(guild_id, raw).await,
    };

    lookup
        .map_err(|e| BotError::Platform(e.to_string()))?
        .ok_or_else(|| {
            BotError::NotFound(
                "that member. Try mentioning them or use an exact server name".to_string(),
            )
        })
}

async fn find_role(ctx: &CommandContext<'_>, guild_id: u64, name: &str) -> BotResult<RoleInfo> {
    let roles = ctx
        .platform
        .roles(guild_id)
        .await
        .map_err(|e| BotError::Platform(e.to_string()))?;

    roles
        .into_iter()
        .find(|role| role.name == name)
        .ok_or_else(|| BotError::NotFound(format!("a role named `{}`", name)))
}

fn reason_or_default(reason: &str) -> &str {
    if reason.is_empty() {
        DEFAULT_REASON
    } else {
        reason
    }
}

pub async fn kick(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let guild_id = ctx.require(Capability::KickMembers).await?;
    let raw_target = ctx.command.arg(0).ok_or_else(|| ctx.usage())?;
    let target = resolve_member(ctx, guild_id, raw_target).await?;
    let reason = reason_or_default(ctx.command.tail(1));

    ctx.platform
        .kick(guild_id, target.user_id, reason)
        .await
        .map_err(platform_error("kick that user"))?;

    info!("👢 {} kicked {} in guild {}", ctx.message.author.user_id, target.user_id, guild_id);
    Ok(Reply::text(format!("👢 Kicked **{}** — {}", target.display_name, reason)))
}

pub async fn ban(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let guild_id = ctx.require(Capability::BanMembers).await?;
    let raw_target = ctx.command.arg(0).ok_or_else(|| ctx.usage())?;
    let target = resolve_member(ctx, guild_id, raw_target).await?;
    let reason = reason_or_default(ctx.command.tail(1));

    ctx.platform
        .ban(guild_id, target.user_id, reason)
        .await
        .map_err(platform_error("ban that user"))?;

    info!("🔨 {} banned {} in guild {}", ctx.message.author.user_id, target.user_id, guild_id);
    Ok(Reply::text(format!("🔨 Banned **{}** — {}", target.display_name, reason)))
}

pub async fn purge(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    ctx.require(Capability::ManageMessages).await?;
    let raw_count = ctx.command.arg(0).ok_or_else(|| ctx.usage())?;
    let count: i64 = raw_count.parse().map_err(|_| ctx.usage())?;

    let count = u64::try_from(count)
        .ok()
        .filter(|count| (1..=PURGE_MAX).contains(count))
        .ok_or(BotError::OutOfRange {
            what: "number",
            min: 1,
            max: PURGE_MAX,
        })?;

    let deleted = ctx
        .platform
        .purge(&ctx.message.origin, count)
        .await
        .map_err(platform_error("delete messages here"))?;

    Ok(Reply::text(format!("🧹 Deleted {} messages.", deleted)))
}

/// Shared body of `giverole` and `removerole`.
async fn edit_role(ctx: &CommandContext<'_>, add: bool) -> BotResult<Reply> {
    let guild_id = ctx.require(Capability::Administrator).await?;
    let raw_target = ctx.command.arg(0).ok_or_else(|| ctx.usage())?;
    let role_name = ctx.command.tail(1);
    if role_name.is_empty() {
        return Err(ctx.usage());
    }

    let target = resolve_member(ctx, guild_id, raw_target).await?;
    let role = find_role(ctx, guild_id, role_name).await?;

    let result = if add {
        ctx.platform.add_role(guild_id, target.user_id, role.id).await
    } else {
        ctx.platform.remove_role(guild_id, target.user_id, role.id).await
    };
    result.map_err(platform_error("manage that role"))?;

    let message = if add {
        format!("✅ Added role **{}** to {}", role.name, target.mention())
    } else {
        format!("✅ Removed role **{}** from {}", role.name, target.mention())
    };
    Ok(Reply::text(message))
}

pub async fn give_role(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    edit_role(ctx, true).await
}

pub async fn remove_role(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    edit_role(ctx, false).await
}

pub async fn joined(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let guild_id = ctx.require(Capability::Administrator).await?;
    let raw_target = ctx.command.tail(0);
    if raw_target.is_empty() {
        return Err(ctx.usage());
    }

    let target = resolve_member(ctx, guild_id, raw_target).await?;
    let guild_roles = ctx
        .platform
        .roles(guild_id)
        .await
        .map_err(|e| BotError::Platform(e.to_string()))?;

    // Highest role first; @everyone shares the guild's id and is skipped.
    let mut roles: Vec<&RoleInfo> = guild_roles
        .iter()
        .filter(|role| role.id != guild_id && target.role_ids.contains(&role.id))
        .collect();
    roles.sort_by(|a, b| b.position.cmp(&a.position));

    let role_line = if roles.is_empty() {
        "No roles".to_string()
    } else {
        roles
            .iter()
            .map(|role| role.mention())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let joined_line = match target.joined_at {
        Some(ts) => format!("<t:{}:F> (<t:{}:R>)", ts, ts),
        None => "at an unknown time".to_string(),
    };

    Ok(Reply::text(format!(
        "**{}** joined {}\n**Roles:** {}",
        target.display_name, joined_line, role_line
    )))
}

pub async fn mute(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let guild_id = ctx.require(Capability::ManageRoles).await?;
    let raw_target = ctx.command.arg(0).ok_or_else(|| ctx.usage())?;
    let target = resolve_member(ctx, guild_id, raw_target).await?;

    // A second token that is not a duration starts the reason.
    let (delay, reason) = match ctx.command.arg(1).map(|raw| ctx.state.durations.parse(raw)) {
        Some(Ok(delay)) => (Some(delay), ctx.command.tail(2)),
        _ => (None, ctx.command.tail(1)),
    };
    if delay.map_or(false, |delay| delay.as_secs() > MAX_MUTE_SECS) {
        return Err(BotError::DelayTooLong { max: "28 days" });
    }
    let reason = reason_or_default(reason);

    let role = find_role(ctx, guild_id, &ctx.state.mute_role).await?;
    ctx.platform
        .add_role(guild_id, target.user_id, role.id)
        .await
        .map_err(platform_error("manage the mute role"))?;

    let key = SubjectKey::Unmute {
        guild_id,
        user_id: target.user_id,
    };

    let Some(delay) = delay else {
        ctx.state.scheduler.cancel(&key);
        info!("🔇 {} muted {} indefinitely in guild {}", ctx.message.author.user_id, target.user_id, guild_id);
        return Ok(Reply::text(format!(
            "🔇 Muted **{}** until further notice — {}",
            target.display_name, reason
        )));
    };

    let platform: Arc<dyn ChatPlatform> = Arc::clone(ctx.platform);
    let origin = ctx.message.origin.clone();
    let user_id = target.user_id;
    let role_id = role.id;
    let notice = format!("🔊 **{}** has been unmuted.", target.display_name);

    ctx.state.scheduler.schedule(key, delay, move || async move {
        platform.remove_role(guild_id, user_id, role_id).await?;
        platform.send_message(&origin, &notice).await?;
        Ok(())
    });

    info!("🔇 {} muted {} for {} in guild {}", ctx.message.author.user_id, target.user_id, delay, guild_id);
    Ok(Reply::text(format!(
        "🔇 Muted **{}** for {} — {}",
        target.display_name, delay, reason
    )))
}

pub async fn unmute(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let guild_id = ctx.require(Capability::ManageRoles).await?;
    let raw_target = ctx.command.arg(0).ok_or_else(|| ctx.usage())?;
    let target = resolve_member(ctx, guild_id, raw_target).await?;

    let role = find_role(ctx, guild_id, &ctx.state.mute_role).await?;
    ctx.platform
        .remove_role(guild_id, target.user_id, role.id)
        .await
        .map_err(platform_error("manage the mute role"))?;

    // Only drop the timed unmute once the role is actually gone.
    ctx.state.scheduler.cancel(&SubjectKey::Unmute {
        guild_id,
        user_id: target.user_id,
    });

    info!("🔊 {} unmuted {} in guild {}", ctx.message.author.user_id, target.user_id, guild_id);
    Ok(Reply::text(format!("🔊 Unmuted **{}**.", target.display_name)))
}
