//! Imagery CLI binary.
//!
//! This binary provides command-line access to Imagery's functionality:
//! - Serve signed image URLs over HTTP
//! - Upload and delete images
//! - Print signed URLs and clear the variant cache

use clap::Parser;
use imagery::{ImageryConfig, ObservabilityConfig, init_logging};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, handle_command};

    // Load .env before reading configuration
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = ImageryConfig::load_from(cli.config.as_deref())?;

    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    init_logging(
        &ObservabilityConfig::new("imagery")
            .with_log_level(log_level)
            .with_json_logs(config.json_logs),
    )?;
    tracing::debug!(?config, "Loaded configuration");

    handle_command(cli.command, &config).await?;
    Ok(())
}
