//! # Feature: Generators
//!
//! Small random generators behind the fun commands: passwords, dice, the
//! magic 8-ball, coin flips and picking between options.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial release

use crate::error::{BotError, BotResult};
use rand::Rng;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub const PASSWORD_MIN_LEN: i64 = 4;
pub const PASSWORD_MAX_LEN: i64 = 64;
pub const PASSWORD_DEFAULT_LEN: i64 = 10;

/// Letters, digits and the symbols a password may contain.
pub const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+-/*!&$#?=@<>";

pub const MAX_DICE: u32 = 100;
pub const MAX_SIDES: u32 = 1000;

const EIGHT_BALL_RESPONSES: &[&str] = &[
    "It is certain.",
    "Without a doubt.",
    "You may rely on it.",
    "Yes, definitely.",
    "Most likely.",
    "Outlook good.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

const FLAIRS: &[&str] = &["✨", "🌈", "🎉", "🦄", "🍭"];

const WHISPER_EMOJI: &[&str] = &["😸", "🦄", "✨", "🌀", "🍀"];

/// Generate a password, clamping `length` into the supported range.
pub fn generate_password(length: i64) -> String {
    let length = length.clamp(PASSWORD_MIN_LEN, PASSWORD_MAX_LEN) as usize;
    let mut rng = rand::rng();

    (0..length)
        .map(|_| PASSWORD_ALPHABET[rng.random_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

/// A parsed `NdM` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
}

impl DiceExpression {
    pub fn parse(expr: &str) -> BotResult<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^([0-9]+)[dD]([0-9]+)$").expect("dice pattern is valid")
        });

        let invalid = || BotError::InvalidDiceExpression(expr.to_string());
        let caps = pattern.captures(expr.trim()).ok_or_else(invalid)?;

        let count: u32 = caps[1].parse().map_err(|_| invalid())?;
        let sides: u32 = caps[2].parse().map_err(|_| invalid())?;

        if !(1..=MAX_DICE).contains(&count) || !(1..=MAX_SIDES).contains(&sides) {
            return Err(invalid());
        }

        Ok(DiceExpression { count, sides })
    }

    pub fn roll(&self) -> DiceRoll {
        let mut rng = rand::rng();
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.random_range(1..=self.sides))
            .collect();
        let total = rolls.iter().sum();

        DiceRoll {
            expression: *self,
            rolls,
            total,
        }
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    pub expression: DiceExpression,
    pub rolls: Vec<u32>,
    pub total: u32,
}

/// Parse `NdM` and roll it.
pub fn parse_and_roll_dice(expr: &str) -> BotResult<DiceRoll> {
    Ok(DiceExpression::parse(expr)?.roll())
}

pub fn eight_ball() -> &'static str {
    pick(EIGHT_BALL_RESPONSES)
}

pub fn coin_flip() -> &'static str {
    if rand::rng().random_bool(0.5) {
        "Heads"
    } else {
        "Tails"
    }
}

/// Pick one of the `|`-separated options. Blank options are ignored.
pub fn choose_one(options: &str) -> BotResult<String> {
    let options: Vec<&str> = options
        .split('|')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .collect();

    if options.len() < 2 {
        return Err(BotError::InsufficientOptions(options.len()));
    }

    Ok(pick(options.as_slice()).to_string())
}

/// Decoration appended to echoed text.
pub fn flair() -> &'static str {
    pick(FLAIRS)
}

/// Emoji tacked onto echoed direct messages.
pub fn whisper_emoji() -> &'static str {
    pick(WHISPER_EMOJI)
}

/// Uniform pick from a non-empty slice.
pub fn pick<'a, T: ?Sized>(items: &[&'a T]) -> &'a T {
    let index = rand::rng().random_range(0..items.len());
    items[index]
}
