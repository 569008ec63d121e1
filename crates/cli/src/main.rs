//! YARN Cluster Monitor CLI
//!
//! A command-line tool for reading YARN memory, container and NodeManager
//! metrics for a Dataproc cluster from the cloud monitoring backend.

mod commands;
mod config;
mod output;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use yarnmon_lib::{
    auth, ClientConfig, MetadataTokenProvider, MonitoringClient, StaticTokenProvider,
    TimeWindow, TokenProvider, YarnMetrics,
};

/// YARN Cluster Monitor CLI
#[derive(Parser)]
#[command(name = "yarnmon")]
#[command(author, version, about = "CLI for YARN cluster metrics", long_about = None)]
pub struct Cli {
    /// Cluster whose metrics to read (can also be set via YARNMON_CLUSTER env var)
    #[arg(long, short, env = "YARNMON_CLUSTER")]
    pub cluster: Option<String>,

    /// Project id (resolved from GOOGLE_CLOUD_PROJECT or the metadata server if unset)
    #[arg(long, short, env = "YARNMON_PROJECT")]
    pub project: Option<String>,

    /// Monitoring API base URL
    #[arg(long, env = "YARNMON_API_URL")]
    pub api_url: Option<String>,

    /// Pre-fetched access token (the metadata server is used if unset)
    #[arg(long, env = "YARNMON_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Lookback window in minutes
    #[arg(long, default_value_t = 60)]
    pub window_mins: i64,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show YARN memory pool sizes
    Memory,

    /// Show YARN container counts
    Containers,

    /// Show NodeManager counts by state
    Nodes,

    /// Show all metric categories for the cluster
    Snapshot,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(fmt::layer())
            .init();
    }

    // File config fills in whatever the flags and env left unset
    let file_config = config::Config::load().unwrap_or_default();

    let Some(cluster) = cli.cluster.or(file_config.cluster) else {
        bail!("no cluster name given; pass --cluster or set YARNMON_CLUSTER");
    };

    let mut client_config = ClientConfig::load()?;
    if let Some(api_url) = cli.api_url.or(file_config.api_url) {
        client_config.endpoint = api_url;
    }

    let token_provider: Arc<dyn TokenProvider> = match cli.access_token {
        Some(token) => Arc::new(StaticTokenProvider::new(token)),
        None => Arc::new(MetadataTokenProvider::new()?),
    };

    let project = match cli.project.or(file_config.project) {
        Some(project) => project,
        None => auth::detect_project_id(auth::METADATA_BASE_URL).await?,
    };

    let client = MonitoringClient::new(client_config, &project, token_provider)?;
    let metrics = YarnMetrics::with_window(
        client,
        cluster,
        TimeWindow::from_minutes(cli.window_mins),
    );

    match cli.command {
        Commands::Memory => commands::metrics::show_memory(&metrics, cli.format).await?,
        Commands::Containers => commands::metrics::show_containers(&metrics, cli.format).await?,
        Commands::Nodes => commands::metrics::show_nodes(&metrics, cli.format).await?,
        Commands::Snapshot => commands::metrics::show_snapshot(&metrics, cli.format).await?,
    }

    Ok(())
}
