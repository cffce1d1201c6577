use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const TOKEN_PLACEHOLDER: &str = "REPLACE_ME_WITH_ENV_VAR";
pub const DEFAULT_DUCK_API_URL: &str = "https://random-d.uk/api/v2/random";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub command_prefix: String,
    pub assets_dir: Option<PathBuf>,
    pub mute_role: String,
    pub fetch_timeout_secs: u64,
    pub duck_api_url: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("DISCORD_TOKEN is not set. Put it in a .env file or your OS env vars.")
            })?;

        if discord_token == TOKEN_PLACEHOLDER {
            anyhow::bail!("Set DISCORD_TOKEN env var instead of hardcoding your token.");
        }

        let fetch_timeout_secs = match lookup("FETCH_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow::anyhow!("FETCH_TIMEOUT_SECS must be a positive integer, got {:?}", raw))?,
            None => 5,
        };

        Ok(Config {
            discord_token,
            command_prefix: lookup("COMMAND_PREFIX").unwrap_or_else(|| "$".to_string()),
            assets_dir: lookup("ASSETS_DIR").map(PathBuf::from),
            mute_role: lookup("MUTE_ROLE").unwrap_or_else(|| "Muted".to_string()),
            fetch_timeout_secs,
            duck_api_url: lookup("DUCK_API_URL").unwrap_or_else(|| DEFAULT_DUCK_API_URL.to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
