//! Paginated monitoring API client
//!
//! This module provides the read path against `timeSeries.list`:
//! - Bearer-token auth via a [`TokenProvider`]
//! - Pagination through `nextPageToken`
//! - Bounded retries with exponential backoff on transient errors
//! - Partial-result accumulation when a page ultimately fails

use crate::auth::TokenProvider;
use crate::error::MetricsError;
use crate::query::TimeSeriesQuery;
use crate::timeseries::{ListTimeSeriesResponse, TimeSeries};
use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default monitoring API base URL
pub const DEFAULT_ENDPOINT: &str = "https://monitoring.googleapis.com/v3";

/// Configuration for the monitoring client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Monitoring API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Total attempts per page request, first try included
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// First retry delay in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the retry delay in seconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_tries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            max_tries: default_max_tries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from `MONITORING_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITORING"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

/// Client for the monitoring time-series API
pub struct MonitoringClient {
    http: reqwest::Client,
    config: ClientConfig,
    project_resource: String,
    list_url: Url,
    token_provider: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for MonitoringClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringClient")
            .field("config", &self.config)
            .field("project_resource", &self.project_resource)
            .field("list_url", &self.list_url)
            .finish_non_exhaustive()
    }
}

impl MonitoringClient {
    /// Create a client scoped to one project
    pub fn new(
        config: ClientConfig,
        project_id: &str,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, MetricsError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let project_resource = format!("projects/{project_id}");

        let mut list_url =
            Url::parse(&config.endpoint).map_err(|source| MetricsError::Endpoint {
                url: config.endpoint.clone(),
                source,
            })?;
        let path = format!(
            "{}/{}/timeSeries",
            list_url.path().trim_end_matches('/'),
            project_resource
        );
        list_url.set_path(&path);

        Ok(Self {
            http,
            config,
            project_resource,
            list_url,
            token_provider,
        })
    }

    /// The `projects/<id>` resource this client queries
    pub fn project_resource(&self) -> &str {
        &self.project_resource
    }

    /// Read every series matching the query, following pagination.
    ///
    /// A page that fails after retries is logged and the series gathered so
    /// far are returned, so a flaky backend degrades to a shorter result
    /// rather than an error. Callers needing hard failures use
    /// [`MonitoringClient::fetch_page`] directly.
    pub async fn read_time_series(&self, query: &TimeSeriesQuery) -> Vec<TimeSeries> {
        let (start, end) = query.interval(Utc::now());

        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            match self
                .fetch_page(query, &start, &end, page_token.as_deref())
                .await
            {
                Ok(page) => {
                    out.extend(page.time_series);
                    match page.next_page_token {
                        Some(token) if !token.is_empty() => page_token = Some(token),
                        _ => break,
                    }
                }
                Err(err) => {
                    warn!(
                        metric_type = %query.metric_type,
                        cluster = %query.cluster_name,
                        series_so_far = out.len(),
                        error = %err,
                        "Listing time series failed, returning partial results"
                    );
                    break;
                }
            }
        }

        out
    }

    /// Fetch one page, retrying transient failures with exponential backoff
    pub async fn fetch_page(
        &self,
        query: &TimeSeriesQuery,
        start: &str,
        end: &str,
        page_token: Option<&str>,
    ) -> Result<ListTimeSeriesResponse, MetricsError> {
        let mut backoff = self.config.initial_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.try_fetch_page(query, start, end, page_token).await {
                Ok(page) => {
                    debug!(
                        metric_type = %query.metric_type,
                        series = page.time_series.len(),
                        has_next = page.next_page_token.is_some(),
                        "Fetched time series page"
                    );
                    return Ok(page);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_tries => {
                    warn!(
                        metric_type = %query.metric_type,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient error listing time series, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.config.max_backoff());
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_fetch_page(
        &self,
        query: &TimeSeriesQuery,
        start: &str,
        end: &str,
        page_token: Option<&str>,
    ) -> Result<ListTimeSeriesResponse, MetricsError> {
        let token = self.token_provider.token().await?;

        let mut params = vec![
            ("filter", query.filter()),
            ("interval.startTime", start.to_string()),
            ("interval.endTime", end.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response = self
            .http
            .get(self.list_url.clone())
            .query(&params)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MetricsError::Http { status, body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(MetricsError::Decode)
    }
}
