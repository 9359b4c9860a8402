use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use appshelf_core::config::{self, Config};
use appshelf_core::contract::to_dtos;
use appshelf_core::core_service::CatalogService;
use appshelf_core::discovery::DiscoverySource;
use appshelf_core::launcher::CommandLauncher;
use appshelf_core::{logging, transport};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Parser)]
#[command(name = "appshelf-core", about = "Installed application catalog")]
struct Cli {
    /// Config file (.toml or .json5). Defaults to <data dir>/appshelf/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print ranked applications for a query as JSON.
    List {
        query: Option<String>,
        /// Skip discovery and rank what is already stored.
        #[arg(long)]
        cached: bool,
    },
    /// Run one discovery cycle and print what changed.
    Refresh,
    /// Serve JSON requests line by line on stdin.
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("[appshelf-core] {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Err(error) = logging::init() {
        eprintln!("[appshelf-core] logging disabled: {error}");
    }

    let config_path = cli
        .config
        .unwrap_or_else(|| config::stable_app_data_dir().join("config.toml"));
    let config = config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let service = Arc::new(build_service(config)?);

    match cli.command {
        Command::List { query, cached } => {
            if !cached {
                service.refresh().await.context("refreshing catalog")?;
            }
            service.search(query.as_deref().unwrap_or_default());
            let ranked = service.evaluate();
            println!("{}", serde_json::to_string_pretty(&to_dtos(&ranked))?);
        }
        Command::Refresh => {
            let outcome = service.refresh().await.context("refreshing catalog")?;
            let response: appshelf_core::contract::RefreshResponse = outcome.into();
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Serve => serve(service).await?,
    }
    Ok(())
}

fn build_service(config: Config) -> anyhow::Result<CatalogService> {
    let discovery = DiscoverySource::from_config(&config);
    let launcher = Arc::new(CommandLauncher::new(config.launch_command.clone()));
    CatalogService::new(config, discovery, launcher).context("opening catalog")
}

async fn serve(service: Arc<CatalogService>) -> anyhow::Result<()> {
    let background = Arc::clone(&service);
    tokio::spawn(async move {
        if let Err(error) = background.refresh().await {
            tracing::error!(%error, "initial refresh failed");
        }
    });
    let sweeper = service.spawn_retention_sweeper(RETENTION_SWEEP_INTERVAL);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let mut response = transport::handle_json(&service, &line).await;
        response.push('\n');
        stdout.write_all(response.as_bytes()).await?;
        stdout.flush().await?;
    }

    sweeper.abort();
    Ok(())
}
