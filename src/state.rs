use crate::assets::AssetLibrary;
use crate::commands::{FUN_BUCKET, MEDIA_BUCKET, REMIND_BUCKET};
use crate::config::Config;
use crate::cooldown::CooldownGate;
use crate::duration::DurationParser;
use crate::fetch::DuckFetcher;
use crate::scheduler::DelayedActionScheduler;
use anyhow::Result;
use std::time::Duration;

/// What a scheduled action is about. One pending action per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    Unmute { guild_id: u64, user_id: u64 },
    Reminder { user_id: u64 },
}

/// Process-lifetime state shared by every command. Nothing here is persisted.
pub struct BotState {
    pub prefix: String,
    pub mute_role: String,
    pub cooldowns: CooldownGate,
    pub scheduler: DelayedActionScheduler<SubjectKey>,
    pub durations: DurationParser,
    pub assets: AssetLibrary,
    pub ducks: DuckFetcher,
}

impl BotState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let assets = match &config.assets_dir {
            Some(dir) => AssetLibrary::load(dir)?,
            None => AssetLibrary::empty(),
        };

        Ok(BotState {
            prefix: config.command_prefix.clone(),
            mute_role: config.mute_role.clone(),
            cooldowns: default_cooldowns(),
            scheduler: DelayedActionScheduler::new(),
            durations: DurationParser::new(),
            assets,
            ducks: DuckFetcher::new(&config.duck_api_url, config.fetch_timeout())?,
        })
    }
}

pub fn default_cooldowns() -> CooldownGate {
    CooldownGate::new()
        .with_bucket(FUN_BUCKET, 3, Duration::from_secs(10))
        .with_bucket(MEDIA_BUCKET, 1, Duration::from_secs(5))
        .with_bucket(REMIND_BUCKET, 2, Duration::from_secs(60))
}
