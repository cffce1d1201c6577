//! # Prefix Commands
//!
//! Text commands such as `$roll 2d6`. This module parses the raw text and
//! holds the command table; the handlers live in the submodules.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Configurable prefix, fun/media/moderation/reminder commands
//! - 1.0.0: Initial implementation with info, quick, and admin commands

pub mod fun;
pub mod media;
pub mod moderation;
pub mod reminders;

use crate::error::{BotError, BotResult};
use crate::platform::{Capability, ChatPlatform, IncomingMessage};
use crate::state::BotState;
use std::path::PathBuf;
use std::sync::Arc;

pub const FUN_BUCKET: &str = "fun";
pub const MEDIA_BUCKET: &str = "media";
pub const REMIND_BUCKET: &str = "remind";

/// Represents a parsed prefix command
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    /// The command name (without the prefix)
    pub name: String,
    /// Whitespace-separated arguments
    pub args: Vec<String>,
    /// The full original input (without the prefix)
    pub raw: String,
}

impl ParsedCommand {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }

    /// The raw text after the first `skip` arguments, spacing preserved.
    pub fn tail(&self, skip: usize) -> &str {
        let mut text = self.raw.as_str();
        for _ in 0..=skip {
            text = text.trim_start();
            let end = text.find(char::is_whitespace).unwrap_or(text.len());
            text = &text[end..];
        }
        text.trim()
    }
}

/// Parse a command from the text after the prefix
///
/// # Example
/// ```
/// use gremlin::commands::parse_command;
///
/// let cmd = parse_command("roll 2d6");
/// assert_eq!(cmd.name, "roll");
/// assert_eq!(cmd.args, vec!["2d6"]);
/// ```
pub fn parse_command(input: &str) -> ParsedCommand {
    let input = input.trim();
    let mut parts = input.split_whitespace();

    let name = parts.next().unwrap_or("").to_string();
    let args: Vec<String> = parts.map(|s| s.to_string()).collect();

    ParsedCommand {
        name,
        args,
        raw: input.to_string(),
    }
}

/// Static description of one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandMeta {
    pub name: &'static str,
    pub usage: &'static str,
    pub desc: &'static str,
    /// Cooldown bucket, if the command is rate limited.
    pub bucket: Option<&'static str>,
    /// Listed in the admin section of the help text.
    pub admin: bool,
}

const fn meta(
    name: &'static str,
    usage: &'static str,
    desc: &'static str,
    bucket: Option<&'static str>,
    admin: bool,
) -> CommandMeta {
    CommandMeta {
        name,
        usage,
        desc,
        bucket,
        admin,
    }
}

/// All available commands
pub const COMMANDS: &[CommandMeta] = &[
    meta("help", "help", "this list", None, false),
    meta("hello", "hello", "I say hi", None, false),
    meta("bye", "bye", "dramatic exit", None, false),
    meta("pass", "pass [length]", "generate a random symbol password (default 10)", Some(FUN_BUCKET), false),
    meta("8ball", "8ball [question]", "cosmic wisdom 🎱", Some(FUN_BUCKET), false),
    meta("flip", "flip", "coin flip", Some(FUN_BUCKET), false),
    meta("roll", "roll [NdM]", "roll dice, e.g. `roll 2d6`", Some(FUN_BUCKET), false),
    meta("choose", "choose a | b | ...", "I pick one for you", Some(FUN_BUCKET), false),
    meta("say", "say <text>", "I repeat (with ✨ flair)", Some(FUN_BUCKET), false),
    meta("duck", "duck", "a random duck picture 🦆", Some(MEDIA_BUCKET), false),
    meta("meme", "meme", "a random picture from my stash", Some(MEDIA_BUCKET), false),
    meta("remindme", "remindme <duration> <text>", "I ping you later, e.g. `remindme 1h 30m stretch`", Some(REMIND_BUCKET), false),
    meta("kick", "kick <member> [reason]", "kick a member", None, true),
    meta("ban", "ban <member> [reason]", "ban a member", None, true),
    meta("purge", "purge <count>", "delete last N messages (max 100)", None, true),
    meta("giverole", "giverole <member> <role name>", "assign a role", None, true),
    meta("removerole", "removerole <member> <role name>", "remove a role", None, true),
    meta("joined", "joined <member>", "joined date + roles", None, true),
    meta("mute", "mute <member> [duration] [reason]", "mute, optionally for a while", None, true),
    meta("unmute", "unmute <member>", "lift a mute", None, true),
];

/// Look up a command by name (case-insensitive)
pub fn find_command(name: &str) -> Option<&'static CommandMeta> {
    COMMANDS.iter().find(|cmd| cmd.name.eq_ignore_ascii_case(name))
}

/// Help text; the admin section is only shown to administrators.
pub fn help_text(prefix: &str, include_admin: bool) -> String {
    let mut help = format!("**Commands (prefix: `{}`)**\n", prefix);

    for cmd in COMMANDS.iter().filter(|cmd| !cmd.admin) {
        help.push_str(&format!("• `{}` → {}\n", cmd.usage, cmd.desc));
    }

    if include_admin {
        help.push_str("\n__Admin only__\n");
        for cmd in COMMANDS.iter().filter(|cmd| cmd.admin) {
            help.push_str(&format!("• `{}` → {}\n", cmd.usage, cmd.desc));
        }
    }

    help
}

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    File { path: PathBuf, caption: String },
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Reply::Text(content.into())
    }
}

/// Everything a handler can reach while running one command.
pub struct CommandContext<'a> {
    pub platform: &'a Arc<dyn ChatPlatform>,
    pub state: &'a BotState,
    pub message: &'a IncomingMessage,
    pub command: &'a ParsedCommand,
    pub meta: &'static CommandMeta,
}

impl<'a> CommandContext<'a> {
    pub fn guild_id(&self) -> BotResult<u64> {
        self.message.origin.guild_id.ok_or(BotError::GuildOnly)
    }

    pub fn usage(&self) -> BotError {
        BotError::Usage(self.meta.usage.to_string())
    }

    /// Fail unless the invoker holds `capability` in the origin guild.
    pub async fn require(&self, capability: Capability) -> BotResult<u64> {
        let guild_id = self.guild_id()?;
        let allowed = self
            .platform
            .has_capability(guild_id, self.message.author.user_id, capability)
            .await
            .map_err(|e| BotError::Platform(e.to_string()))?;

        if !allowed {
            return Err(BotError::MissingPermission(capability.describe()));
        }
        Ok(guild_id)
    }
}
