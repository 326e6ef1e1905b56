//! The `tagline serve` command.

use std::path::PathBuf;

use clap::Args;
use tagline_core::{Config, TaggingPipeline};

use crate::server;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Config file to load instead of the default location
    #[arg(short, long, env = "TAGLINE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Apply overrides to the loaded configuration, build the pipeline and
/// serve until Ctrl-C.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!(
        "Loading models (captioner: {} / {}, scorer: {})",
        config.caption.provider,
        config.caption.model,
        config.scoring.model
    );
    let pipeline = TaggingPipeline::from_config(&config)?;

    server::serve(pipeline, &config).await
}

/// Load `path` if given (with `~` expansion), otherwise the default location.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            Ok(Config::load_from(&PathBuf::from(expanded))?)
        }
        None => Ok(Config::load()?),
    }
}
