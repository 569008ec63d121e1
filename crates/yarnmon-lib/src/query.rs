//! Query construction for `timeSeries.list`
//!
//! A query is a metric type, the cluster label that scopes it, and a
//! lookback window ending now. The filter grammar and the RFC 3339
//! interval encoding are fixed by the monitoring backend.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Metric prefix for all Dataproc cluster metrics
pub const METRIC_DOMAIN: &str = "dataproc.googleapis.com";

/// YARN memory pool sizes (available / allocated / reserved)
pub const MEMORY_METRIC: &str = "cluster/yarn/memory_size";

/// YARN container counts (allocated / pending / reserved)
pub const CONTAINERS_METRIC: &str = "cluster/yarn/containers";

/// NodeManager counts by state
pub const NODE_MANAGERS_METRIC: &str = "cluster/yarn/nodemanagers";

/// Default lookback window in minutes
pub const DEFAULT_LOOKBACK_MINS: i64 = 60;

/// Recent interval ending now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    lookback: Duration,
}

impl TimeWindow {
    pub fn from_minutes(minutes: i64) -> Self {
        Self {
            lookback: Duration::minutes(minutes),
        }
    }

    /// Interval bounds relative to the given end instant
    pub fn bounds(&self, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (end - self.lookback, end)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_LOOKBACK_MINS)
    }
}

/// One `timeSeries.list` request worth of parameters
#[derive(Debug, Clone)]
pub struct TimeSeriesQuery {
    pub metric_type: String,
    pub cluster_name: String,
    pub window: TimeWindow,
}

impl TimeSeriesQuery {
    /// Query for a Dataproc metric under [`METRIC_DOMAIN`]
    pub fn dataproc(metric: &str, cluster_name: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            metric_type: format!("{METRIC_DOMAIN}/{metric}"),
            cluster_name: cluster_name.into(),
            window,
        }
    }

    /// Filter expression selecting this metric for this cluster
    pub fn filter(&self) -> String {
        format!(
            r#"metric.type="{}" AND resource.labels.cluster_name="{}""#,
            self.metric_type, self.cluster_name
        )
    }

    /// Interval bounds as RFC 3339 strings, ending at `end`
    pub fn interval(&self, end: DateTime<Utc>) -> (String, String) {
        let (start, end) = self.window.bounds(end);
        (rfc3339(start), rfc3339(end))
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
