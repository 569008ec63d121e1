//! Aggregate YARN snapshots read from the monitoring backend
//!
//! The backend returns one series per status label, in a fixed order per
//! metric. Each snapshot picks the latest point of each series by position
//! and names the fields.

use crate::client::MonitoringClient;
use crate::error::MetricsError;
use crate::query::{
    TimeSeriesQuery, TimeWindow, CONTAINERS_METRIC, MEMORY_METRIC, NODE_MANAGERS_METRIC,
};
use crate::timeseries::TimeSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Memory pool sizes are reported in a coarser unit; consumers expect them
/// scaled by 1024.
const MEMORY_SCALE: f64 = 1024.0;

/// YARN memory pool sizes, scaled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub available: f64,
    pub allocated: f64,
    pub reserved: f64,
}

impl MemorySnapshot {
    /// Extract from the series returned for [`MEMORY_METRIC`]
    pub fn from_series(series: &[TimeSeries]) -> Result<Self, MetricsError> {
        Ok(Self {
            available: double_at(series, 0, MEMORY_METRIC)? * MEMORY_SCALE,
            allocated: double_at(series, 1, MEMORY_METRIC)? * MEMORY_SCALE,
            reserved: double_at(series, 2, MEMORY_METRIC)? * MEMORY_SCALE,
        })
    }
}

/// YARN container counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub allocated: i64,
    pub pending: i64,
    pub reserved: i64,
}

impl ContainerSnapshot {
    /// Extract from the series returned for [`CONTAINERS_METRIC`]
    pub fn from_series(series: &[TimeSeries]) -> Result<Self, MetricsError> {
        Ok(Self {
            allocated: int_at(series, 0, CONTAINERS_METRIC)?,
            pending: int_at(series, 1, CONTAINERS_METRIC)?,
            reserved: int_at(series, 2, CONTAINERS_METRIC)?,
        })
    }
}

/// NodeManager counts by state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub active: i64,
    pub decommissioned: i64,
    pub lost: i64,
    pub rebooted: i64,
    pub unhealthy: i64,
}

impl NodeSnapshot {
    /// Extract from the series returned for [`NODE_MANAGERS_METRIC`]
    pub fn from_series(series: &[TimeSeries]) -> Result<Self, MetricsError> {
        Ok(Self {
            active: int_at(series, 0, NODE_MANAGERS_METRIC)?,
            decommissioned: int_at(series, 1, NODE_MANAGERS_METRIC)?,
            lost: int_at(series, 2, NODE_MANAGERS_METRIC)?,
            rebooted: int_at(series, 3, NODE_MANAGERS_METRIC)?,
            unhealthy: int_at(series, 4, NODE_MANAGERS_METRIC)?,
        })
    }
}

/// All three snapshot categories for one cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub cluster_name: String,
    pub collected_at: DateTime<Utc>,
    pub memory: MemorySnapshot,
    pub containers: ContainerSnapshot,
    pub nodes: NodeSnapshot,
}

/// Reader facade for one cluster's YARN metrics
pub struct YarnMetrics {
    client: MonitoringClient,
    cluster_name: String,
    window: TimeWindow,
}

impl YarnMetrics {
    pub fn new(client: MonitoringClient, cluster_name: impl Into<String>) -> Self {
        Self::with_window(client, cluster_name, TimeWindow::default())
    }

    pub fn with_window(
        client: MonitoringClient,
        cluster_name: impl Into<String>,
        window: TimeWindow,
    ) -> Self {
        Self {
            client,
            cluster_name: cluster_name.into(),
            window,
        }
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    async fn read(&self, metric: &str) -> Vec<TimeSeries> {
        let query = TimeSeriesQuery::dataproc(metric, &self.cluster_name, self.window);
        self.client.read_time_series(&query).await
    }

    /// Memory pool sizes for the cluster
    pub async fn memory_metrics(&self) -> Result<MemorySnapshot, MetricsError> {
        let series = self.read(MEMORY_METRIC).await;
        MemorySnapshot::from_series(&series)
    }

    /// Container allocation counts for the cluster
    pub async fn container_metrics(&self) -> Result<ContainerSnapshot, MetricsError> {
        let series = self.read(CONTAINERS_METRIC).await;
        ContainerSnapshot::from_series(&series)
    }

    /// NodeManager state counts for the cluster
    pub async fn node_metrics(&self) -> Result<NodeSnapshot, MetricsError> {
        let series = self.read(NODE_MANAGERS_METRIC).await;
        NodeSnapshot::from_series(&series)
    }

    /// All three categories in one snapshot
    pub async fn cluster_snapshot(&self) -> Result<ClusterSnapshot, MetricsError> {
        let memory = self.memory_metrics().await?;
        let containers = self.container_metrics().await?;
        let nodes = self.node_metrics().await?;

        let snapshot = ClusterSnapshot {
            cluster_name: self.cluster_name.clone(),
            collected_at: Utc::now(),
            memory,
            containers,
            nodes,
        };

        info!(
            cluster = %snapshot.cluster_name,
            active_nodes = snapshot.nodes.active,
            allocated_containers = snapshot.containers.allocated,
            "Collected cluster snapshot"
        );

        Ok(snapshot)
    }
}

fn series_at<'a>(
    series: &'a [TimeSeries],
    index: usize,
    metric_type: &str,
) -> Result<&'a TimeSeries, MetricsError> {
    series.get(index).ok_or_else(|| MetricsError::MissingSeries {
        metric_type: metric_type.to_string(),
        index,
    })
}

fn double_at(series: &[TimeSeries], index: usize, metric_type: &str) -> Result<f64, MetricsError> {
    let point = series_at(series, index, metric_type)?
        .latest()
        .ok_or_else(|| MetricsError::EmptyPoints {
            metric_type: metric_type.to_string(),
        })?;

    point
        .value
        .double_value
        .ok_or_else(|| MetricsError::ValueKind {
            metric_type: metric_type.to_string(),
            expected: "double",
        })
}

fn int_at(series: &[TimeSeries], index: usize, metric_type: &str) -> Result<i64, MetricsError> {
    let point = series_at(series, index, metric_type)?
        .latest()
        .ok_or_else(|| MetricsError::EmptyPoints {
            metric_type: metric_type.to_string(),
        })?;

    point
        .value
        .int64_value
        .ok_or_else(|| MetricsError::ValueKind {
            metric_type: metric_type.to_string(),
            expected: "int64",
        })
}
