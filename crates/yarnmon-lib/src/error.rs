//! Error types for the monitoring client

use thiserror::Error;

/// Errors produced while reading cluster metrics
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The backend answered with a non-success HTTP status
    #[error("monitoring API error ({status}): {body}")]
    Http { status: u16, body: String },

    /// The request never produced an HTTP response (DNS, connect, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Obtaining or refreshing an access token failed
    #[error("authentication error: {0}")]
    Auth(String),

    /// The configured API base URL could not be parsed
    #[error("invalid endpoint URL {url}: {source}")]
    Endpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The response body could not be decoded as the expected wire format
    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// Fewer time series came back than the extraction expects
    #[error("missing time series for {metric_type} at position {index}")]
    MissingSeries { metric_type: String, index: usize },

    /// A series came back with no data points in the window
    #[error("no points for {metric_type} in the queried window")]
    EmptyPoints { metric_type: String },

    /// A point carried a value of the wrong kind for this metric
    #[error("expected {expected} value for {metric_type}")]
    ValueKind {
        metric_type: String,
        expected: &'static str,
    },
}

impl MetricsError {
    /// Whether a retry with backoff can reasonably succeed.
    ///
    /// 429 and 5xx statuses are transient; other 4xx statuses, auth and
    /// decode failures are fatal. Transport errors are retried since they
    /// cover timeouts and connection resets.
    pub fn is_retryable(&self) -> bool {
        match self {
            MetricsError::Http { status, .. } => *status == 429 || *status >= 500,
            MetricsError::Transport(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_retryable() {
        for status in [429u16, 500, 502, 503, 504] {
            let err = MetricsError::Http {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "{status} should be retryable");
        }
    }

    #[test]
    fn test_client_errors_are_fatal() {
        for status in [400u16, 401, 403, 404] {
            let err = MetricsError::Http {
                status,
                body: String::new(),
            };
            assert!(!err.is_retryable(), "{status} should be fatal");
        }
    }

    #[test]
    fn test_auth_errors_are_fatal() {
        let err = MetricsError::Auth("no token".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_shape_errors_are_fatal() {
        let err = MetricsError::MissingSeries {
            metric_type: "cluster/yarn/containers".to_string(),
            index: 2,
        };
        assert!(!err.is_retryable());
    }
}
