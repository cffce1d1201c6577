//! # Error Taxonomy
//!
//! Every command handler returns [`BotError`] on failure. The router turns the
//! error into a reply for the invoker based on its [`ErrorKind`].

use thiserror::Error;

/// Broad class of a failure, used to pick the reply and the log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; the invoker gets a corrective usage message.
    UserInput,
    /// The invoker or the bot lacks a capability on the target.
    Permission,
    /// An external fetch failed or timed out; worth retrying.
    TransientExternal,
    /// Anything else. Logged with full context.
    Unexpected,
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid dice expression: {0:?}")]
    InvalidDiceExpression(String),

    #[error("need at least two options, got {0}")]
    InsufficientOptions(usize),

    #[error("{what} must be between {min} and {max}")]
    OutOfRange { what: &'static str, min: u64, max: u64 },

    #[error("usage: {0}")]
    Usage(String),

    #[error("command only works in servers")]
    GuildOnly,

    #[error("delay longer than {max}")]
    DelayTooLong { max: &'static str },

    #[error("missing permission: {0}")]
    MissingPermission(&'static str),

    #[error("bot is not allowed to {0}")]
    BotForbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("external service unavailable: {0}")]
    Transient(String),

    #[error("platform request failed: {0}")]
    Platform(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl BotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::InvalidDuration(_)
            | BotError::InvalidDiceExpression(_)
            | BotError::InsufficientOptions(_)
            | BotError::OutOfRange { .. }
            | BotError::Usage(_)
            | BotError::GuildOnly
            | BotError::DelayTooLong { .. }
            | BotError::NotFound(_) => ErrorKind::UserInput,
            BotError::MissingPermission(_) | BotError::BotForbidden(_) => ErrorKind::Permission,
            BotError::Transient(_) => ErrorKind::TransientExternal,
            BotError::Platform(_) | BotError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Text sent back to whoever invoked the failing command.
    pub fn user_message(&self, prefix: &str) -> String {
        match self {
            BotError::InvalidDuration(raw) => format!(
                "⏱️ `{}` isn't a duration I understand. Try something like `10m`, `2h` or `1h30m`.",
                raw
            ),
            BotError::InvalidDiceExpression(_) => {
                format!("Usage: `{}roll NdM` (e.g., `2d6`, `1d20`)", prefix)
            }
            BotError::InsufficientOptions(_) => {
                format!("Give me at least two options: `{}choose tacos | sushi`", prefix)
            }
            BotError::OutOfRange { what, min, max } => {
                format!("Please choose a {} between {} and {}.", what, min, max)
            }
            BotError::Usage(usage) => format!("Usage: `{}{}`", prefix, usage),
            BotError::GuildOnly => "This command only works in servers.".to_string(),
            BotError::DelayTooLong { max } => {
                format!("That's too far out. The longest I can wait is {}.", max)
            }
            BotError::MissingPermission(_) => {
                "I’m brave, not lawless — you’re missing permissions for that. 🛡️".to_string()
            }
            BotError::BotForbidden(action) => format!(
                "❌ I don’t have permission to {}. Move my role higher in the hierarchy.",
                action
            ),
            BotError::NotFound(what) => format!("I can’t find {}.", what),
            BotError::Transient(_) => "⏳ That service took too long to answer. Please try again in a moment.".to_string(),
            BotError::Platform(_) | BotError::Unexpected(_) => {
                "Uh oh, I tripped on a cable. Please try again.".to_string()
            }
        }
    }
}

pub type BotResult<T> = std::result::Result<T, BotError>;
