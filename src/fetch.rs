//! # Feature: Duck Pictures
//!
//! Fetches a random duck picture URL. Every request has a bounded timeout and
//! any failure is reported as a transient error so the user can retry.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial release

use crate::error::{BotError, BotResult};
use anyhow::Result;
use log::warn;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct DuckResponse {
    url: String,
}

#[derive(Clone)]
pub struct DuckFetcher {
    client: reqwest::Client,
    api_url: String,
}

impl DuckFetcher {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(DuckFetcher {
            client,
            api_url: api_url.to_string(),
        })
    }

    pub async fn random_duck(&self) -> BotResult<String> {
        let response = self
            .client
            .get(&self.api_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(transient)?;

        let body = response.text().await.map_err(transient)?;
        parse_duck_payload(&body)
    }
}

fn transient(error: reqwest::Error) -> BotError {
    if error.is_timeout() {
        warn!("⚠️ Duck API timed out: {}", error);
        BotError::Transient("request timed out".to_string())
    } else {
        warn!("⚠️ Duck API request failed: {}", error);
        BotError::Transient(error.to_string())
    }
}

fn parse_duck_payload(body: &str) -> BotResult<String> {
    let payload: DuckResponse = serde_json::from_str(body).map_err(|e| {
        warn!("⚠️ Duck API returned an unexpected payload: {}", e);
        BotError::Transient(format!("unexpected payload: {}", e))
    })?;
    Ok(payload.url)
}
