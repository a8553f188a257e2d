// Agrocrew task-execution engine
// Main entry point for the agrocrew binary

use agrocrew_engine::cli::{Cli, Command};
use agrocrew_engine::config::Config;
use agrocrew_engine::handlers::{
    handle_run, handle_tasks, handle_tools, handle_validate, OutputFormat, RunOptions,
};
use agrocrew_engine::telemetry::init_telemetry_with_level;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!("Agrocrew Engine v{}", env!("CARGO_PKG_VERSION"));

    // Handle commands
    match cli.command {
        Command::Run {
            crew,
            images,
            image_dir,
            overrides,
            unknown_tool,
        } => {
            tracing::info!("Running crew...");
            let options = RunOptions {
                crew,
                images,
                image_dir,
                overrides,
                unknown_tool,
            };
            handle_run(options, &config, format)
        }

        Command::Tasks { crew } => handle_tasks(&crew, &config, format),

        Command::Validate { crew } => {
            tracing::info!("Validating crew...");
            handle_validate(&crew, &config, format)
        }

        Command::Tools => handle_tools(&config, format),
    }
}
