//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Two-column row used by all snapshot tables
#[derive(Tabled)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub name: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl MetricRow {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Print a titled metrics table
pub fn print_metric_table(title: &str, rows: Vec<MetricRow>) {
    println!("{}", title.bold());
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a scaled memory value for display
pub fn format_memory(value: f64) -> String {
    const GIB: f64 = 1024.0 * 1024.0;
    if value >= GIB {
        format!("{:.2}Gi", value / GIB)
    } else if value >= 1024.0 {
        format!("{:.2}Mi", value / 1024.0)
    } else {
        format!("{:.0}Ki", value)
    }
}

/// Color a node count that signals trouble when non-zero
pub fn color_trouble_count(count: i64) -> String {
    if count > 0 {
        count.to_string().red().to_string()
    } else {
        count.to_string().green().to_string()
    }
}
