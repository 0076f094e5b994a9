use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracker_config::{Config, ConfigLoader};
use tracker_service::TrackerService;
use tracker_types::{OperationRef, Phase};

#[derive(Parser)]
#[command(name = "tx-tracker")]
#[command(about = "Tracks transactions until they are mined and indexed", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[arg(short, long, value_name = "FILE", default_value = "config/tracker.toml")]
	config: PathBuf,

	#[arg(long, env = "TRACKER_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Stream status events for each transaction as JSON lines
	Track {
		#[arg(required = true, value_name = "HASH")]
		hashes: Vec<OperationRef>,
	},
	/// Wait until every transaction is indexed
	Wait {
		#[arg(required = true, value_name = "HASH")]
		hashes: Vec<OperationRef>,
	},
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	let config = load_config(&cli).await?;

	match cli.command {
		Commands::Validate => {
			info!("Configuration is valid");
			info!("Execution client: {}", config.execution.implementation);
			info!("Index client: {}", config.index.implementation);
			Ok(())
		}
		Commands::Track { hashes } => run_until_shutdown(track(&config, hashes)).await,
		Commands::Wait { hashes } => run_until_shutdown(wait(&config, hashes)).await,
	}
}

async fn load_config(cli: &Cli) -> Result<Config> {
	info!("Loading configuration from: {:?}", cli.config);

	ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.context("Failed to load configuration")
}

async fn track(config: &Config, ops: Vec<OperationRef>) -> Result<()> {
	let service = TrackerService::from_config(config).context("Failed to build tracker")?;

	let events = service.stream_events(ops);
	futures::pin_mut!(events);

	let mut failures = 0usize;
	while let Some(item) = events.next().await {
		let event = item.context("Tracking aborted")?;
		if event.phase == Phase::Failed {
			failures += 1;
		}
		println!("{}", serde_json::to_string(&event)?);
	}

	if failures > 0 {
		bail!("{} transaction(s) failed", failures);
	}
	Ok(())
}

async fn wait(config: &Config, ops: Vec<OperationRef>) -> Result<()> {
	let service = TrackerService::from_config(config).context("Failed to build tracker")?;

	let events = service.wait_all(ops).await?;
	for event in events {
		println!("{}", serde_json::to_string(&event)?);
	}
	Ok(())
}

/// Runs `work` until it finishes or a shutdown signal arrives. On shutdown
/// the work is dropped, which stops any further polling.
async fn run_until_shutdown(work: impl std::future::Future<Output = Result<()>>) -> Result<()> {
	tokio::select! {
		result = work => result,
		_ = setup_shutdown_signal() => {
			warn!("Shutdown signal received, tracking abandoned");
			Ok(())
		}
	}
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
