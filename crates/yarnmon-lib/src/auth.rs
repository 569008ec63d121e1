//! Access token acquisition for the monitoring API
//!
//! Requests carry an OAuth2 bearer token. On GCE/App Engine the token comes
//! from the instance metadata server; elsewhere a pre-fetched token can be
//! injected. Both sit behind the [`TokenProvider`] trait so the client and
//! tests stay agnostic of the source.

use crate::error::MetricsError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Default metadata server base URL
pub const METADATA_BASE_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

/// Refresh tokens this long before they actually expire
const EXPIRY_SKEW_SECS: i64 = 60;

/// Source of bearer tokens for monitoring API requests
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a token valid for at least the next request
    async fn token(&self) -> Result<String, MetricsError>;
}

/// Token provider backed by a fixed, externally obtained token
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, MetricsError> {
        Ok(self.token.clone())
    }
}

/// Wire format of the metadata server token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Token provider backed by the GCE/App Engine instance metadata server
///
/// Tokens are cached and refreshed shortly before expiry so repeated
/// snapshot calls do not hit the metadata server each time.
pub struct MetadataTokenProvider {
    http: reqwest::Client,
    base_url: String,
    cached: RwLock<Option<CachedToken>>,
}

impl MetadataTokenProvider {
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_base_url(METADATA_BASE_URL)
    }

    /// Use a non-default metadata base URL (tests point this at a mock)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, MetricsError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            cached: RwLock::new(None),
        })
    }

    async fn fetch_token(&self) -> Result<CachedToken, MetricsError> {
        let url = format!(
            "{}/instance/service-accounts/default/token",
            self.base_url
        );

        let response = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MetricsError::Auth(format!(
                "metadata server returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MetricsError::Auth(format!("bad token response: {e}")))?;

        debug!(expires_in = token.expires_in, "Fetched access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in - EXPIRY_SKEW_SECS),
        })
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn token(&self) -> Result<String, MetricsError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Utc::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();

        let mut cached = self.cached.write().await;
        *cached = Some(fresh);

        Ok(access_token)
    }
}

/// Determine the project id this process runs under.
///
/// `GOOGLE_CLOUD_PROJECT` wins when set; otherwise the metadata server is
/// asked, matching how App Engine and GCE workloads resolve it.
pub async fn detect_project_id(metadata_base_url: &str) -> Result<String, MetricsError> {
    if let Ok(project) = std::env::var("GOOGLE_CLOUD_PROJECT") {
        if !project.is_empty() {
            return Ok(project);
        }
    }

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{metadata_base_url}/project/project-id");
    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        return Err(MetricsError::Auth(format!(
            "could not resolve project id, metadata server returned {status}"
        )));
    }

    Ok(response.text().await?.trim().to_string())
}
