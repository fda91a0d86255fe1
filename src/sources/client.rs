//! HTTP client for the outreach data API.
//!
//! One paginated query endpoint per record kind. Every request carries an
//! explicit offset/limit pair; the API caps responses at 1000 rows and this
//! client never relies on an implicit unbounded mode.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::models::{
    CampaignDayRollup, CampaignStatusRecord, Config, MeetingEvent, ReplyEvent,
};
use crate::sources::{EngagementSource, Page, SourceFilter};

const ROLLUPS_PATH: &str = "/v1/campaign-rollups";
const REPLIES_PATH: &str = "/v1/reply-events";
const MEETINGS_PATH: &str = "/v1/meeting-events";
const STATUSES_PATH: &str = "/v1/campaign-statuses";

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Page envelope returned by every list endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct PageEnvelope<T> {
    #[serde(default)]
    items: Vec<T>,
    #[serde(default)]
    total: Option<u64>,
}

pub struct FunnelApiClient {
    http: Client,
    base_url: String,
}

impl FunnelApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("FunnelDesk/1.0 (reconciliation engine)");

        if let Some(key) = &config.api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {key}")
                    .parse()
                    .context("Invalid API key format")?,
            );
            builder = builder.default_headers(headers);
        }

        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<T>> {
        let url = format!("{}{}", self.base_url, path);

        let mut query: Vec<(&str, String)> = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(client) = &filter.client {
            query.push(("client", client.clone()));
        }
        if let Some(campaign_id) = &filter.campaign_id {
            query.push(("campaign_id", campaign_id.clone()));
        }
        if let Some(from) = filter.date_from {
            query.push(("date_from", from.to_string()));
        }
        if let Some(to) = filter.date_to {
            query.push(("date_to", to.to_string()));
        }

        let response = self.retry_get(&url, &query).await?;
        let envelope: PageEnvelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {path} page at offset {offset}"))?;

        debug!(path, offset, rows = envelope.items.len(), "fetched page");

        Ok(Page {
            rows: envelope.items,
            total: envelope.total,
        })
    }

    /// Execute a GET with exponential backoff on 5xx and connection errors.
    /// 4xx responses fail immediately: retrying a bad request never helps.
    async fn retry_get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);

        for attempt in 1..=MAX_RETRIES {
            match self.http.get(url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        warn!(attempt, "rate limited (429), backing off 5s");
                        sleep(Duration::from_secs(5)).await;
                    } else if status.is_server_error() {
                        warn!(
                            %status,
                            attempt,
                            "server error, backing off {}ms",
                            backoff.as_millis()
                        );
                        sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        bail!("source API error {}: {}", status, body);
                    }
                }
                Err(err) => {
                    warn!(attempt, error = %err, "request failed");
                    if attempt == MAX_RETRIES {
                        return Err(err.into());
                    }
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }

        bail!("max retries exceeded for {}", url)
    }
}

#[async_trait]
impl EngagementSource for FunnelApiClient {
    async fn campaign_rollups(
        &self,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<CampaignDayRollup>> {
        self.fetch_page(ROLLUPS_PATH, filter, offset, limit).await
    }

    async fn reply_events(
        &self,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<ReplyEvent>> {
        self.fetch_page(REPLIES_PATH, filter, offset, limit).await
    }

    async fn meeting_events(
        &self,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MeetingEvent>> {
        self.fetch_page(MEETINGS_PATH, filter, offset, limit).await
    }

    async fn campaign_statuses(
        &self,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<CampaignStatusRecord>> {
        self.fetch_page(STATUSES_PATH, filter, offset, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(api_key: Option<&str>) -> Config {
        Config {
            api_base: "https://api.example.com/".to_string(),
            api_key: api_key.map(str::to_string),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn client_builds_with_and_without_key() {
        assert!(FunnelApiClient::new(&test_config(None)).is_ok());
        assert!(FunnelApiClient::new(&test_config(Some("secret"))).is_ok());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = FunnelApiClient::new(&test_config(None)).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }
}
