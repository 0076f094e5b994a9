//! Configuration validation utility
//!
//! Usage: cargo run --bin validate-config config/tracker.toml

use std::env;
use std::process;

use tracker_config::ConfigLoader;

#[tokio::main]
async fn main() {
	let args: Vec<String> = env::args().collect();

	if args.len() != 2 {
		eprintln!("Usage: {} <config-file>", args[0]);
		process::exit(1);
	}

	let config_path = &args[1];

	println!("Validating configuration file: {}", config_path);

	match ConfigLoader::new().with_file(config_path).load().await {
		Ok(config) => {
			println!("✅ Configuration is valid!");
			println!("Execution client: {}", config.execution.implementation);
			println!("Index client: {}", config.index.implementation);
			println!("Max receipt attempts: {}", config.tracker.max_attempts);
			println!("Receipt delay: {}ms", config.tracker.receipt_delay_ms);
			println!(
				"Indexing: every {}ms for up to {}ms",
				config.tracker.indexing_poll_interval_ms, config.tracker.indexing_timeout_ms
			);
		}
		Err(e) => {
			eprintln!("❌ Configuration validation failed:");
			eprintln!("{}", e);
			process::exit(1);
		}
	}
}
