//! Tagline - image tagging service built from caption-derived tags.
//!
//! Tagline describes an image with a vision-language model several times,
//! reduces the captions to stop-word-free candidate tags, and ranks the tags
//! with a CLIP zero-shot classifier. It is served over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the scoring model
//! tagline models download
//!
//! # Serve on the configured host/port
//! tagline serve --port 8080
//!
//! # Tag an image
//! curl -X POST localhost:8080/ -d "{\"image\": \"$(base64 -w0 dog.jpg)\"}"
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;
mod server;

/// Tagline - caption an image and rank the words it is described with.
#[derive(Parser, Debug)]
#[command(name = "tagline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP tagging service
    Serve(cli::serve::ServeArgs),

    /// Manage the scoring model (download, list, path)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

impl Commands {
    /// Config file named on the command line, if this command takes one.
    fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Commands::Serve(args) => args.config.as_ref(),
            Commands::Models(_) | Commands::Config(_) => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Resolve the same file `serve` will run with, so its [logging] applies.
    let loaded = cli::serve::load_config(cli.command.config_path());

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let log_config = match &loaded {
        Ok(config) => config.clone(),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tagline config path`."
            );
            tagline_core::Config::default()
        }
    };
    logging::init_from_config(&log_config, cli.verbose, cli.json_logs);

    tracing::debug!("Tagline v{}", tagline_core::VERSION);

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, loaded?).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
