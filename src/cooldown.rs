//! # Feature: Command Cooldowns
//!
//! Limits how often one user can run the commands in a bucket. Uses a fixed
//! window per (user, bucket) with DashMap for thread-safe concurrent access.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Per-bucket windows, retry-after reporting and a bypass policy
//! - 1.0.0: Initial release with per-user sliding window rate limiting

use dashmap::DashMap;
use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Limits for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownConfig {
    pub max_uses: u32,
    pub window: Duration,
}

/// Whether the caller is subject to cooldowns at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownPolicy {
    Enforce,
    /// Privileged identities: always allowed, nothing is consumed.
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Allowed,
    RetryAfter(Duration),
}

impl CooldownDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allowed)
    }

    /// Wait time rounded up to whole seconds, never zero for a rejection.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            CooldownDecision::Allowed => None,
            CooldownDecision::RetryAfter(wait) => {
                let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                Some(secs.max(1))
            }
        }
    }
}

#[derive(Debug)]
struct CooldownRecord {
    window_start: Instant,
    uses_remaining: u32,
}

pub struct CooldownGate {
    records: DashMap<(String, String), CooldownRecord>,
    buckets: HashMap<String, CooldownConfig>,
}

impl CooldownGate {
    pub fn new() -> Self {
        CooldownGate {
            records: DashMap::new(),
            buckets: HashMap::new(),
        }
    }

    /// Configure a bucket. Buckets that are never configured always allow.
    pub fn with_bucket(mut self, bucket: &str, max_uses: u32, window: Duration) -> Self {
        self.buckets
            .insert(bucket.to_string(), CooldownConfig { max_uses, window });
        self
    }

    /// Consume one use for `identity` in `bucket`, or report how long to wait.
    ///
    /// The lookup, window reset and decrement happen under one entry lock, so
    /// two racing calls can never both take the last slot.
    pub fn check(&self, identity: &str, bucket: &str, policy: CooldownPolicy) -> CooldownDecision {
        if policy == CooldownPolicy::Bypass {
            return CooldownDecision::Allowed;
        }

        let Some(config) = self.buckets.get(bucket).copied() else {
            return CooldownDecision::Allowed;
        };

        if config.max_uses == 0 {
            return CooldownDecision::RetryAfter(config.window);
        }

        let now = Instant::now();
        let mut record = self
            .records
            .entry((identity.to_string(), bucket.to_string()))
            .or_insert_with(|| CooldownRecord {
                window_start: now,
                uses_remaining: config.max_uses,
            });

        let elapsed = now.duration_since(record.window_start);
        if elapsed >= config.window {
            record.window_start = now;
            record.uses_remaining = config.max_uses;
        }

        if record.uses_remaining == 0 {
            let wait = config.window - now.duration_since(record.window_start);
            debug!("Cooldown hit for {} in bucket {}: {:?} left", identity, bucket, wait);
            return CooldownDecision::RetryAfter(wait);
        }

        record.uses_remaining -= 1;
        CooldownDecision::Allowed
    }

    /// Drop records whose window has already elapsed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();

        self.records.retain(|(_, bucket), record| match self.buckets.get(bucket) {
            Some(config) => now.duration_since(record.window_start) < config.window,
            None => false,
        });

        before - self.records.len()
    }

    pub fn tracked(&self) -> usize {
        self.records.len()
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new()
    }
}
