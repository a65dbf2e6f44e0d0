//! Request/response client for the dashboard API.
//!
//! Every call degrades to "no update" for the caller: a failed or
//! malformed response surfaces as a typed error and prior state stays in
//! place.

use crate::dispatch::CommandFallback;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use botdeck_core::{ChannelRecord, ChatLogEntry, CommandAction, MusicCommand, ResourceUsage};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const LOG_TARGET: &str = "botdeck::gateway::api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// The channel listing as served by `/api/channels`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelListing {
    #[serde(default)]
    pub public: Vec<ChannelRecord>,
    #[serde(default)]
    pub private: Vec<ChannelRecord>,
}

#[derive(Debug, Deserialize)]
struct ChatLogPage {
    #[serde(default)]
    items: Vec<ChatLogEntry>,
}

/// HTTP client for the dashboard endpoints.
pub struct ApiClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl ApiClient {
    /// Create a client with a 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("botdeck/0.1")
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    /// The raw middleware client, for opening the push stream against the
    /// same host with the same retry policy.
    #[must_use]
    pub fn http(&self) -> &ClientWithMiddleware {
        &self.client
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Playback source endpoint for the audio element;
    /// `?track_id=` is appended by the player.
    #[must_use]
    pub fn stream_endpoint(&self) -> String {
        format!("{}/api/music/stream", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            warn!(target: LOG_TARGET, "{url} returned {}", response.status());
            return Err(GatewayError::Status {
                endpoint: url,
                status: response.status(),
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch the channel listing.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success status.
    pub async fn channels(&self) -> Result<ChannelListing> {
        self.get_json("/api/channels").await
    }

    /// Fetch the most recent chat logs, newest first.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success status.
    pub async fn chat_logs(&self, limit: usize) -> Result<Vec<ChatLogEntry>> {
        let page: ChatLogPage = self.get_json(&format!("/api/chatlogs?limit={limit}")).await?;
        Ok(page.items)
    }

    /// Fetch the resource monitor summary.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success status.
    pub async fn monitor(&self) -> Result<ResourceUsage> {
        self.get_json("/api/monitor").await
    }

    /// Archive a channel. Callers remove it from local state only on
    /// success; a non-2xx leaves everything unchanged.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success status.
    pub async fn archive_channel(&self, channel_id: i64) -> Result<()> {
        let url = format!("{}/api/channels/{channel_id}", self.base_url);
        let response = self.client.delete(&url).send().await?;
        if !response.status().is_success() {
            warn!(target: LOG_TARGET, "archive of {channel_id} returned {}", response.status());
            return Err(GatewayError::Status {
                endpoint: url,
                status: response.status(),
            });
        }
        debug!(target: LOG_TARGET, "archived channel {channel_id}");
        Ok(())
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<()> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            warn!(target: LOG_TARGET, "{url} returned {}", response.status());
            return Err(GatewayError::Status {
                endpoint: url,
                status: response.status(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CommandFallback for ApiClient {
    /// The request/response twin of a control-channel command; the server
    /// treats both paths identically.
    async fn send_command(&self, command: &MusicCommand) -> Result<()> {
        match command.action {
            CommandAction::Play => {
                let body = serde_json::json!({
                    "guild_id": command.guild_id,
                    "query": command.query,
                });
                self.post_json("/api/music/play", &body).await
            }
            CommandAction::Skip => {
                let body = serde_json::json!({ "guild_id": command.guild_id });
                self.post_json("/api/music/skip", &body).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let api = ApiClient::new("http://host:8000/").unwrap();
        assert_eq!(api.base_url(), "http://host:8000");
        assert_eq!(api.stream_endpoint(), "http://host:8000/api/music/stream");
    }

    #[test]
    fn test_channel_listing_tolerates_missing_partitions() {
        let listing: ChannelListing = serde_json::from_str(r#"{"public":[]}"#).unwrap();
        assert!(listing.public.is_empty());
        assert!(listing.private.is_empty());
    }

    #[test]
    fn test_chat_log_page_decodes_items() {
        let page: ChatLogPage = serde_json::from_str(
            r#"{"items":[{"id":1,"user_message":"hi","tokens":3.5,"latency_ms":120.0}]}"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, 1);
    }
}
