//! Snapshot CLI commands

use anyhow::Result;
use colored::Colorize;
use yarnmon_lib::{ContainerSnapshot, MemorySnapshot, NodeSnapshot, YarnMetrics};

use crate::output::{
    color_trouble_count, format_memory, print_json, print_metric_table, MetricRow, OutputFormat,
};

/// Show YARN memory pool sizes
pub async fn show_memory(metrics: &YarnMetrics, format: OutputFormat) -> Result<()> {
    let snapshot = metrics.memory_metrics().await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => print_metric_table("YARN Memory", memory_rows(&snapshot)),
    }

    Ok(())
}

/// Show YARN container counts
pub async fn show_containers(metrics: &YarnMetrics, format: OutputFormat) -> Result<()> {
    let snapshot = metrics.container_metrics().await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => print_metric_table("YARN Containers", container_rows(&snapshot)),
    }

    Ok(())
}

/// Show NodeManager counts by state
pub async fn show_nodes(metrics: &YarnMetrics, format: OutputFormat) -> Result<()> {
    let snapshot = metrics.node_metrics().await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => print_metric_table("YARN NodeManagers", node_rows(&snapshot)),
    }

    Ok(())
}

/// Show all three categories for the cluster
pub async fn show_snapshot(metrics: &YarnMetrics, format: OutputFormat) -> Result<()> {
    let snapshot = metrics.cluster_snapshot().await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => {
            println!(
                "Cluster: {}  ({})",
                snapshot.cluster_name.cyan(),
                snapshot.collected_at.to_rfc3339()
            );
            println!();
            print_metric_table("YARN Memory", memory_rows(&snapshot.memory));
            println!();
            print_metric_table("YARN Containers", container_rows(&snapshot.containers));
            println!();
            print_metric_table("YARN NodeManagers", node_rows(&snapshot.nodes));
        }
    }

    Ok(())
}

fn memory_rows(snapshot: &MemorySnapshot) -> Vec<MetricRow> {
    vec![
        MetricRow::new("available", format_memory(snapshot.available)),
        MetricRow::new("allocated", format_memory(snapshot.allocated)),
        MetricRow::new("reserved", format_memory(snapshot.reserved)),
    ]
}

fn container_rows(snapshot: &ContainerSnapshot) -> Vec<MetricRow> {
    vec![
        MetricRow::new("allocated", snapshot.allocated.to_string()),
        MetricRow::new("pending", snapshot.pending.to_string()),
        MetricRow::new("reserved", snapshot.reserved.to_string()),
    ]
}

fn node_rows(snapshot: &NodeSnapshot) -> Vec<MetricRow> {
    vec![
        MetricRow::new("active", snapshot.active.to_string()),
        MetricRow::new("decommissioned", snapshot.decommissioned.to_string()),
        MetricRow::new("lost", color_trouble_count(snapshot.lost)),
        MetricRow::new("rebooted", snapshot.rebooted.to_string()),
        MetricRow::new("unhealthy", color_trouble_count(snapshot.unhealthy)),
    ]
}
