//! Reminder command: remindme

use super::{CommandContext, Reply};
use crate::error::{BotError, BotResult};
use crate::state::SubjectKey;
use chrono::Utc;
use log::info;
use std::sync::Arc;

/// Reminders further out than this are refused.
const MAX_REMINDER_SECS: u64 = 30 * 24 * 60 * 60;

pub fn remindme(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    if ctx.command.args.is_empty() {
        return Err(ctx.usage());
    }

    // `1h 30m stretch`: every leading token that is a whole duration counts.
    let delay_tokens = 1 + ctx
        .command
        .args
        .iter()
        .skip(1)
        .take_while(|token| ctx.state.durations.is_duration_token(token))
        .count();

    let text = ctx.command.tail(delay_tokens).to_string();
    if text.is_empty() {
        return Err(ctx.usage());
    }

    let delay = ctx
        .state
        .durations
        .parse(&ctx.command.args[..delay_tokens].join(" "))?;
    if delay.as_secs() > MAX_REMINDER_SECS {
        return Err(BotError::DelayTooLong { max: "30 days" });
    }

    let author = &ctx.message.author;
    let key = SubjectKey::Reminder { user_id: author.user_id };
    let replaced = ctx.state.scheduler.is_pending(&key);

    let platform = Arc::clone(ctx.platform);
    let origin = ctx.message.origin.clone();
    let delivery = format!("{} ⏰ Reminder: **{}**", author.mention(), text);

    ctx.state.scheduler.schedule(key, delay, move || async move {
        platform.send_message(&origin, &delivery).await?;
        Ok(())
    });

    info!("⏰ Reminder for user {} set in {}", author.user_id, delay);

    let due = Utc::now().timestamp().saturating_add(delay.as_secs() as i64);
    let mut response = format!(
        "⏰ Okay {}, I'll remind you in {} (<t:{}:R>).",
        author.mention(),
        delay,
        due
    );
    if replaced {
        response.push_str(" Your previous reminder was replaced.");
    }

    Ok(Reply::text(response))
}
