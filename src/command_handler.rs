use crate::commands::{
    find_command, fun, help_text, media, moderation, parse_command, reminders, CommandContext,
    Reply,
};
use crate::cooldown::CooldownPolicy;
use crate::error::{BotError, BotResult, ErrorKind};
use crate::generation;
use crate::platform::{Capability, ChatPlatform, IncomingMessage, Origin};
use crate::state::BotState;
use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(300);

/// Routes incoming messages to command handlers.
#[derive(Clone)]
pub struct CommandHandler {
    state: Arc<BotState>,
}

impl CommandHandler {
    pub fn new(state: BotState) -> Self {
        CommandHandler {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    pub async fn handle_message(&self, platform: Arc<dyn ChatPlatform>, msg: &IncomingMessage) -> Result<()> {
        if msg.author.is_bot {
            return Ok(());
        }

        let content = msg.content.trim();

        if let Some(input) = content.strip_prefix(self.state.prefix.as_str()) {
            return self.handle_command(&platform, msg, input).await;
        }

        if msg.origin.is_direct_message() && !content.is_empty() {
            let reply = self.dm_chatter(content);
            platform.send_message(&msg.origin, &reply).await?;
        }

        Ok(())
    }

    async fn handle_command(&self, platform: &Arc<dyn ChatPlatform>, msg: &IncomingMessage, input: &str) -> Result<()> {
        let command = parse_command(input);
        if command.name.is_empty() {
            return Ok(());
        }

        let prefix = self.state.prefix.as_str();
        let Some(meta) = find_command(&command.name) else {
            let unknown = format!("Unknown command. Use `{}help` to see available commands.", prefix);
            platform.send_message(&msg.origin, &unknown).await?;
            return Ok(());
        };

        info!("Processing command: {} from user: {}", meta.name, msg.author.user_id);

        let ctx = CommandContext {
            platform,
            state: &self.state,
            message: msg,
            command: &command,
            meta,
        };

        if let Some(bucket) = meta.bucket {
            let policy = if is_admin(&ctx).await {
                CooldownPolicy::Bypass
            } else {
                CooldownPolicy::Enforce
            };

            let identity = msg.author.user_id.to_string();
            let decision = self.state.cooldowns.check(&identity, bucket, policy);
            if !decision.is_allowed() {
                warn!("Cooldown exceeded for user: {} on {}", msg.author.user_id, meta.name);
                let slow_down = format!(
                    "⏳ Slow down! You can use `{}{}` again in {}s.",
                    prefix,
                    meta.name,
                    decision.retry_after_secs().unwrap_or(1)
                );
                platform.send_message(&msg.origin, &slow_down).await?;
                return Ok(());
            }
        }

        let reply = match dispatch(&ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                log_failure(&ctx, &e);
                Reply::Text(e.user_message(prefix))
            }
        };

        send_reply(platform.as_ref(), &msg.origin, reply).await
    }

    fn dm_chatter(&self, content: &str) -> String {
        let lowered = content.to_lowercase();
        if ["hi", "hello", "hola"].iter().any(|greeting| lowered.starts_with(greeting)) {
            format!(
                "👋 ¡Hola! I’m alive in DMs too. Try `{}help` for commands.",
                self.state.prefix
            )
        } else {
            format!("You whispered: **{}** {}", content, generation::whisper_emoji())
        }
    }

    /// Periodically drop expired cooldown records.
    /// This should be spawned once at startup.
    pub fn spawn_maintenance(&self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let mut tick = interval(MAINTENANCE_INTERVAL);
            loop {
                tick.tick().await;
                let pruned = state.cooldowns.prune();
                debug!(
                    "🧽 Pruned {} cooldown record(s), {} scheduled action(s) pending",
                    pruned,
                    state.scheduler.len()
                );
            }
        })
    }

    /// Cancel every pending scheduled action.
    pub fn shutdown(&self) {
        info!("Cancelling {} pending scheduled action(s)", self.state.scheduler.len());
        self.state.scheduler.cancel_all();
    }
}

async fn dispatch(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    match ctx.meta.name {
        "help" => Ok(Reply::Text(help_text(&ctx.state.prefix, is_admin(ctx).await))),
        "hello" => Ok(fun::hello()),
        "bye" => Ok(fun::bye()),
        "pass" => fun::pass(ctx),
        "8ball" => Ok(fun::eight_ball()),
        "flip" => Ok(fun::flip()),
        "roll" => fun::roll(ctx),
        "choose" => fun::choose(ctx),
        "say" => fun::say(ctx),
        "duck" => media::duck(ctx).await,
        "meme" => media::meme(ctx),
        "remindme" => reminders::remindme(ctx),
        "kick" => moderation::kick(ctx).await,
        "ban" => moderation::ban(ctx).await,
        "purge" => moderation::purge(ctx).await,
        "giverole" => moderation::give_role(ctx).await,
        "removerole" => moderation::remove_role(ctx).await,
        "joined" => moderation::joined(ctx).await,
        "mute" => moderation::mute(ctx).await,
        "unmute" => moderation::unmute(ctx).await,
        other => Err(BotError::Unexpected(anyhow::anyhow!("no handler registered for {}", other))),
    }
}

/// Administrators in the origin guild. Lookup failures count as not privileged.
async fn is_admin(ctx: &CommandContext<'_>) -> bool {
    let Some(guild_id) = ctx.message.origin.guild_id else {
        return false;
    };

    match ctx
        .platform
        .has_capability(guild_id, ctx.message.author.user_id, Capability::Administrator)
        .await
    {
        Ok(admin) => admin,
        Err(e) => {
            debug!("Permission lookup failed for {}: {}", ctx.message.author.user_id, e);
            false
        }
    }
}

fn log_failure(ctx: &CommandContext<'_>, e: &BotError) {
    let author = ctx.message.author.user_id;
    match e.kind() {
        ErrorKind::UserInput => debug!("Rejected input for {} from {}: {}", ctx.meta.name, author, e),
        ErrorKind::Permission => info!("Permission denied for {} from {}: {}", ctx.meta.name, author, e),
        ErrorKind::TransientExternal => warn!("⚠️ {} for {} failed: {}", ctx.meta.name, author, e),
        ErrorKind::Unexpected => error!(
            "❌ Command {} ({:?}) from user {} in channel {} failed: {:?}",
            ctx.meta.name, ctx.command.raw, author, ctx.message.origin.channel_id, e
        ),
    }
}

async fn send_reply(platform: &dyn ChatPlatform, origin: &Origin, reply: Reply) -> Result<()> {
    match reply {
        Reply::Text(content) => platform.send_message(origin, &content).await?,
        Reply::File { path, caption } => platform.send_file(origin, &path, &caption).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SubjectKey;
    use crate::test_support::*;
    use std::sync::atomic::AtomicBool;
    use tokio::time::sleep;

    fn setup() -> (CommandHandler, Arc<FakePlatform>, Arc<dyn ChatPlatform>) {
        setup_with(FakePlatform::guild())
    }

    fn setup_with(fake: FakePlatform) -> (CommandHandler, Arc<FakePlatform>, Arc<dyn ChatPlatform>) {
        let fake = Arc::new(fake);
        let platform: Arc<dyn ChatPlatform> = fake.clone();
        (CommandHandler::new(test_state()), fake, platform)
    }

    async fn send(handler: &CommandHandler, platform: &Arc<dyn ChatPlatform>, msg: IncomingMessage) {
        handler
            .handle_message(Arc::clone(platform), &msg)
            .await
            .expect("message handled");
    }

    #[tokio::test]
    async fn test_flip_replies() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MEMBER, "$flip")).await;

        let reply = fake.last_message();
        assert!(reply == "🪙 Heads!" || reply == "🪙 Tails!", "unexpected reply: {}", reply);
    }

    #[tokio::test]
    async fn test_unknown_command_points_to_help() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MEMBER, "$dance")).await;
        assert_eq!(
            fake.last_message(),
            "Unknown command. Use `$help` to see available commands."
        );
    }

    #[tokio::test]
    async fn test_bots_and_plain_chatter_are_ignored() {
        let (handler, fake, platform) = setup();

        let mut from_bot = guild_message(MEMBER, "$flip");
        from_bot.author.is_bot = true;
        send(&handler, &platform, from_bot).await;
        send(&handler, &platform, guild_message(MEMBER, "just chatting")).await;

        assert!(fake.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_blocks_then_recovers() {
        let (handler, fake, platform) = setup();

        for _ in 0..3 {
            send(&handler, &platform, guild_message(MEMBER, "$flip")).await;
        }
        send(&handler, &platform, guild_message(MEMBER, "$flip")).await;
        assert_eq!(
            fake.last_message(),
            "⏳ Slow down! You can use `$flip` again in 10s."
        );

        // The fun bucket is shared between commands.
        send(&handler, &platform, guild_message(MEMBER, "$8ball")).await;
        assert!(fake.last_message().starts_with("⏳ Slow down!"));

        // Other users have their own record.
        send(&handler, &platform, guild_message(TARGET, "$flip")).await;
        assert!(fake.last_message().starts_with("🪙"));

        sleep(Duration::from_secs(10)).await;
        send(&handler, &platform, guild_message(MEMBER, "$flip")).await;
        assert!(fake.last_message().starts_with("🪙"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_admin_bypasses_cooldown() {
        let (handler, fake, platform) = setup();

        for _ in 0..6 {
            send(&handler, &platform, guild_message(ADMIN, "$flip")).await;
        }

        assert_eq!(fake.messages().len(), 6);
        assert!(fake.messages().iter().all(|m| m.starts_with("🪙")));
    }

    #[tokio::test]
    async fn test_bad_input_gets_usage() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MEMBER, "$roll 2x6")).await;
        assert_eq!(fake.last_message(), "Usage: `$roll NdM` (e.g., `2d6`, `1d20`)");

        send(&handler, &platform, guild_message(MEMBER, "$choose tacos")).await;
        assert_eq!(
            fake.last_message(),
            "Give me at least two options: `$choose tacos | sushi`"
        );

        send(&handler, &platform, guild_message(MEMBER, "$pass twelve")).await;
        assert_eq!(fake.last_message(), "Usage: `$pass [length]`");
    }

    #[tokio::test]
    async fn test_roll_and_pass_output() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MEMBER, "$roll 3d1")).await;
        assert_eq!(fake.last_message(), "🎲 `3d1` → [1, 1, 1] = **3**");

        send(&handler, &platform, guild_message(MEMBER, "$pass 2")).await;
        assert_eq!(fake.last_message().chars().count(), 4);
    }

    #[tokio::test]
    async fn test_kick_requires_permission() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MEMBER, "$kick <@4> rude")).await;

        assert!(fake.last_message().contains("missing permissions"));
        assert!(fake.actions().is_empty());
    }

    #[tokio::test]
    async fn test_kick_with_permission() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MODERATOR, "$kick <@!4> being rude")).await;
        assert_eq!(fake.last_message(), "👢 Kicked **troll** — being rude");

        send(&handler, &platform, guild_message(MODERATOR, "$ban troll")).await;
        assert_eq!(fake.last_message(), "🔨 Banned **troll** — No reason provided");

        assert_eq!(
            fake.actions(),
            vec![
                Action::Kick {
                    user_id: TARGET,
                    reason: "being rude".to_string()
                },
                Action::Ban {
                    user_id: TARGET,
                    reason: "No reason provided".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_kick_unknown_member() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MODERATOR, "$kick nobody")).await;

        assert!(fake.last_message().starts_with("I can’t find that member"));
        assert!(fake.actions().is_empty());
    }

    #[tokio::test]
    async fn test_moderation_is_guild_only() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, direct_message(MODERATOR, "$kick <@4>")).await;
        assert_eq!(fake.last_message(), "This command only works in servers.");
    }

    #[tokio::test]
    async fn test_bot_forbidden_is_reported() {
        let (handler, fake, platform) = setup_with(FakePlatform {
            forbid_mutations: AtomicBool::new(true),
            ..FakePlatform::guild()
        });
        send(&handler, &platform, guild_message(MODERATOR, "$kick <@4>")).await;

        assert_eq!(
            fake.last_message(),
            "❌ I don’t have permission to kick that user. Move my role higher in the hierarchy."
        );
    }

    #[tokio::test]
    async fn test_purge_bounds() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MODERATOR, "$purge 0")).await;
        assert_eq!(fake.last_message(), "Please choose a number between 1 and 100.");

        send(&handler, &platform, guild_message(MODERATOR, "$purge 101")).await;
        assert_eq!(fake.last_message(), "Please choose a number between 1 and 100.");
        assert!(fake.actions().is_empty());

        send(&handler, &platform, guild_message(MODERATOR, "$purge 5")).await;
        assert_eq!(fake.last_message(), "🧹 Deleted 5 messages.");
        assert_eq!(fake.actions(), vec![Action::Purge { count: 5 }]);
    }

    #[tokio::test]
    async fn test_role_commands_need_admin() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MODERATOR, "$giverole troll Muted")).await;
        assert!(fake.last_message().contains("missing permissions"));

        send(&handler, &platform, guild_message(ADMIN, "$giverole troll Muted")).await;
        assert_eq!(fake.last_message(), "✅ Added role **Muted** to <@4>");

        send(&handler, &platform, guild_message(ADMIN, "$removerole <@4> Nope")).await;
        assert_eq!(fake.last_message(), "I can’t find a role named `Nope`.");

        assert_eq!(
            fake.actions(),
            vec![Action::AddRole {
                user_id: TARGET,
                role_id: MUTED_ROLE
            }]
        );
    }

    #[tokio::test]
    async fn test_joined_lists_highest_role_first() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(ADMIN, "$joined troll")).await;

        let reply = fake.last_message();
        assert!(reply.starts_with("**troll** joined <t:1700000000:F>"));
        assert!(reply.ends_with("**Roles:** <@&502>, <@&501>"));
    }

    #[tokio::test]
    async fn test_help_admin_section() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MEMBER, "$help")).await;
        assert!(!fake.last_message().contains("Admin only"));

        send(&handler, &platform, guild_message(ADMIN, "$help")).await;
        assert!(fake.last_message().contains("Admin only"));
    }

    #[tokio::test]
    async fn test_meme_with_empty_stash() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MEMBER, "$meme")).await;

        assert!(fake.last_message().starts_with("My stash is empty"));
        assert!(fake.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dm_chatter() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, direct_message(MEMBER, "Hola amigo")).await;
        assert!(fake.last_message().contains("alive in DMs"));

        send(&handler, &platform, direct_message(MEMBER, "psst")).await;
        assert!(fake.last_message().starts_with("You whispered: **psst**"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_is_delivered() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MEMBER, "$remindme 1m30s stretch")).await;

        assert!(fake.last_message().starts_with("⏰ Okay <@3>, I'll remind you in 1m 30s"));

        sleep(Duration::from_secs(91)).await;
        tokio::task::yield_now().await;

        assert_eq!(fake.last_message(), "<@3> ⏰ Reminder: **stretch**");
        assert!(!handler.state().scheduler.is_pending(&SubjectKey::Reminder { user_id: MEMBER }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_delay_may_span_tokens() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MEMBER, "$remindme 1h 30m stretch")).await;

        assert!(fake.last_message().starts_with("⏰ Okay <@3>, I'll remind you in 1h 30m"));

        sleep(Duration::from_secs(3601)).await;
        tokio::task::yield_now().await;
        assert!(!fake.last_message().contains("Reminder:"));

        sleep(Duration::from_secs(1800)).await;
        tokio::task::yield_now().await;
        assert_eq!(fake.last_message(), "<@3> ⏰ Reminder: **stretch**");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_text_starting_like_a_unit_is_kept() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MEMBER, "$remindme 1m 1st call")).await;

        assert!(fake.last_message().starts_with("⏰ Okay <@3>, I'll remind you in 1m "));

        sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert_eq!(fake.last_message(), "<@3> ⏰ Reminder: **1st call**");
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_reminder_replaces_previous() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MEMBER, "$remindme 1m first")).await;
        send(&handler, &platform, guild_message(MEMBER, "$remindme 2m second")).await;
        assert!(fake.last_message().ends_with("Your previous reminder was replaced."));

        sleep(Duration::from_secs(180)).await;
        tokio::task::yield_now().await;

        let messages = fake.messages();
        assert!(!messages.iter().any(|m| m.contains("**first**")));
        assert_eq!(messages.last().map(String::as_str), Some("<@3> ⏰ Reminder: **second**"));
    }

    #[tokio::test]
    async fn test_reminder_rejects_bad_delays() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(ADMIN, "$remindme soon stretch")).await;
        assert!(fake.last_message().contains("isn't a duration I understand"));

        send(&handler, &platform, guild_message(ADMIN, "$remindme 31d stretch")).await;
        assert_eq!(
            fake.last_message(),
            "That's too far out. The longest I can wait is 30 days."
        );

        send(&handler, &platform, guild_message(ADMIN, "$remindme 10m")).await;
        assert_eq!(fake.last_message(), "Usage: `$remindme <duration> <text>`");

        assert!(handler.state().scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_mute_expires() {
        let (handler, fake, platform) = setup();
        send(&handler, &platform, guild_message(MODERATOR, "$mute <@4> 10m spamming")).await;

        assert_eq!(fake.last_message(), "🔇 Muted **troll** for 10m — spamming");
        assert_eq!(
            fake.actions(),
            vec![Action::AddRole {
                user_id: TARGET,
                role_id: MUTED_ROLE
            }]
        );

        sleep(Duration::from_secs(601)).await;
        tokio::task::yield_now().await;

        assert_eq!(fake.last_message(), "🔊 **troll** has been unmuted.");
        assert_eq!(
            fake.actions().last(),
            Some(&Action::RemoveRole {
                user_id: TARGET,
                role_id: MUTED_ROLE
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmute_cancels_pending_unmute() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MODERATOR, "$mute <@4> 10m")).await;
        send(&handler, &platform, guild_message(MODERATOR, "$unmute <@4>")).await;
        assert_eq!(fake.last_message(), "🔊 Unmuted **troll**.");
        assert!(handler.state().scheduler.is_empty());

        sleep(Duration::from_secs(601)).await;
        tokio::task::yield_now().await;

        let removals = fake
            .actions()
            .iter()
            .filter(|a| matches!(a, Action::RemoveRole { .. }))
            .count();
        assert_eq!(removals, 1);
        assert_eq!(fake.last_message(), "🔊 Unmuted **troll**.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_unmute_keeps_timed_unmute() {
        let (handler, fake, platform) = setup();
        let key = SubjectKey::Unmute {
            guild_id: GUILD,
            user_id: TARGET,
        };

        send(&handler, &platform, guild_message(MODERATOR, "$mute <@4> 10m")).await;

        fake.set_forbidden(true);
        send(&handler, &platform, guild_message(MODERATOR, "$unmute <@4>")).await;
        assert_eq!(
            fake.last_message(),
            "❌ I don’t have permission to manage the mute role. Move my role higher in the hierarchy."
        );
        assert!(handler.state().scheduler.is_pending(&key));

        fake.set_forbidden(false);
        sleep(Duration::from_secs(601)).await;
        tokio::task::yield_now().await;

        assert_eq!(fake.last_message(), "🔊 **troll** has been unmuted.");
        assert_eq!(
            fake.actions().last(),
            Some(&Action::RemoveRole {
                user_id: TARGET,
                role_id: MUTED_ROLE
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmute_with_missing_role_keeps_timed_unmute() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MODERATOR, "$mute <@4> 10m")).await;
        fake.delete_role(MUTED_ROLE);

        send(&handler, &platform, guild_message(MODERATOR, "$unmute <@4>")).await;
        assert_eq!(fake.last_message(), "I can’t find a role named `Muted`.");
        assert!(handler.state().scheduler.is_pending(&SubjectKey::Unmute {
            guild_id: GUILD,
            user_id: TARGET,
        }));

        sleep(Duration::from_secs(601)).await;
        tokio::task::yield_now().await;

        let removals = fake
            .actions()
            .iter()
            .filter(|a| matches!(a, Action::RemoveRole { .. }))
            .count();
        assert_eq!(removals, 1);
        assert_eq!(fake.last_message(), "🔊 **troll** has been unmuted.");
    }

    #[tokio::test]
    async fn test_mute_without_duration_is_indefinite() {
        let (handler, fake, platform) = setup();

        send(&handler, &platform, guild_message(MODERATOR, "$mute troll flooding chat")).await;
        assert_eq!(
            fake.last_message(),
            "🔇 Muted **troll** until further notice — flooding chat"
        );
        assert!(handler.state().scheduler.is_empty());

        send(&handler, &platform, guild_message(MODERATOR, "$mute troll 29d")).await;
        assert_eq!(
            fake.last_message(),
            "That's too far out. The longest I can wait is 28 days."
        );
    }
}
