//! Storylens CLI - turn an image into a short story with a local vision model.
//!
//! Storylens sends an image to a locally running Ollama server and prints the
//! story the model writes about it. Missing models are pulled on first use.
//!
//! # Usage
//!
//! ```bash
//! # Write a story about a photo
//! storylens story beach.jpg
//!
//! # Pick a model and save the story
//! storylens story beach.jpg --model llava:7b --output beach.txt
//!
//! # Browse and install models
//! storylens models list
//! storylens models pull llava:7b
//!
//! # View configuration
//! storylens config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Storylens - turn images into short stories with a local vision model.
#[derive(Parser, Debug)]
#[command(name = "storylens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Ollama server address (overrides the config file)
    #[arg(long, global = true, env = "OLLAMA_HOST")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a story from an image
    Story(cli::story::StoryArgs),

    /// Browse, check and pull vision models
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match storylens_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `storylens config path`."
            );
            storylens_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Storylens v{}", storylens_core::VERSION);

    let config = match cli.endpoint.as_deref() {
        Some(endpoint) => config.with_endpoint(&cli::normalize_endpoint(endpoint))?,
        None => config,
    };

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Story(args) => cli::story::execute(args, &config).await,
        Commands::Models(args) => cli::models::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
