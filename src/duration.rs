//! # Feature: Duration Parsing
//!
//! Turns strings such as `30m`, `2h`, `1d` or `1h30m` into a second count.
//! Used by timed mutes and reminders.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial release with s/m/h/d/w units

use crate::error::{BotError, BotResult};
use regex::Regex;
use std::fmt;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// A non-zero number of seconds produced by [`DurationParser::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParsedDuration(u64);

impl ParsedDuration {
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl From<ParsedDuration> for std::time::Duration {
    fn from(value: ParsedDuration) -> Self {
        std::time::Duration::from_secs(value.0)
    }
}

impl fmt::Display for ParsedDuration {
    /// Renders the largest units first, e.g. `1h 30m`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut remaining = self.0;
        let mut parts = Vec::new();

        for (unit, label) in [(WEEK, "w"), (DAY, "d"), (HOUR, "h"), (MINUTE, "m"), (1, "s")] {
            let amount = remaining / unit;
            if amount > 0 {
                parts.push(format!("{}{}", amount, label));
                remaining %= unit;
            }
        }

        write!(f, "{}", parts.join(" "))
    }
}

/// Parser for `(integer)(unit)` sequences.
#[derive(Clone)]
pub struct DurationParser {
    pair_pattern: Regex,
    token_pattern: Regex,
}

impl DurationParser {
    pub fn new() -> Self {
        DurationParser {
            pair_pattern: Regex::new(r"([0-9]+)([smhdw])").expect("duration pattern is valid"),
            token_pattern: Regex::new(r"^(?i:[0-9]+[smhdw])+$").expect("token pattern is valid"),
        }
    }

    /// Whether `token` is made only of amount/unit pairs, like `30m` or `1h30m`.
    pub fn is_duration_token(&self, token: &str) -> bool {
        self.token_pattern.is_match(token.trim())
    }

    /// Sum every recognised amount/unit pair in `text`.
    ///
    /// Case and whitespace are ignored. Characters that are not part of a pair
    /// are skipped, so `"1h30"` is one hour. Huge amounts saturate instead of
    /// being capped; callers decide what a sensible maximum is.
    pub fn parse(&self, text: &str) -> BotResult<ParsedDuration> {
        let normalized: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        let mut total: u64 = 0;
        for caps in self.pair_pattern.captures_iter(&normalized) {
            let amount = caps[1].parse::<u64>().unwrap_or(u64::MAX);
            let unit = match &caps[2] {
                "s" => 1,
                "m" => MINUTE,
                "h" => HOUR,
                "d" => DAY,
                "w" => WEEK,
                _ => continue,
            };
            total = total.saturating_add(amount.saturating_mul(unit));
        }

        if total == 0 {
            return Err(BotError::InvalidDuration(text.trim().to_string()));
        }

        Ok(ParsedDuration(total))
    }
}

impl Default for DurationParser {
    fn default() -> Self {
        Self::new()
    }
}
