//! Library for reading YARN cluster metrics from the cloud monitoring API
//!
//! This crate provides the core functionality for:
//! - Filtered, paginated time-series reads with bounded retry
//! - Access token acquisition (static or metadata server)
//! - Aggregate memory / container / node snapshots per cluster

pub mod auth;
pub mod client;
pub mod error;
pub mod query;
pub mod snapshot;
pub mod timeseries;

pub use auth::{MetadataTokenProvider, StaticTokenProvider, TokenProvider};
pub use client::{ClientConfig, MonitoringClient};
pub use error::MetricsError;
pub use query::{TimeSeriesQuery, TimeWindow};
pub use snapshot::{
    ClusterSnapshot, ContainerSnapshot, MemorySnapshot, NodeSnapshot, YarnMetrics,
};
