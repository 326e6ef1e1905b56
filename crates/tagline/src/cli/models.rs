//! The `tagline models` command for managing the scoring model.

use std::path::Path;

use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tagline_core::Config;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the CLIP vision encoder, text encoder and tokenizer
    Download {
        /// Re-download files that already exist
        #[arg(long)]
        force: bool,
    },

    /// List installed model files
    List,

    /// Show model directory path
    Path,
}

/// A file fetched from the Hugging Face hub.
struct ModelFile {
    label: &'static str,
    remote_path: &'static str,
    local_name: &'static str,
}

/// Hub repository holding the ONNX export of CLIP ViT-L/14.
const CLIP_REPO: &str = "Xenova/clip-vit-large-patch14";

const CLIP_FILES: &[ModelFile] = &[
    ModelFile {
        label: "vision encoder",
        remote_path: "onnx/vision_model.onnx",
        local_name: "vision_model.onnx",
    },
    ModelFile {
        label: "text encoder",
        remote_path: "onnx/text_model.onnx",
        local_name: "text_model.onnx",
    },
    ModelFile {
        label: "tokenizer",
        remote_path: "tokenizer.json",
        local_name: "tokenizer.json",
    },
];

fn hub_url(repo: &str, remote_path: &str) -> String {
    format!("https://huggingface.co/{repo}/resolve/main/{remote_path}")
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let model_dir = config.scoring_model_dir();

    match args.command {
        ModelsCommand::Download { force } => {
            std::fs::create_dir_all(&model_dir)?;
            let client = reqwest::Client::new();

            for file in CLIP_FILES {
                let dest = model_dir.join(file.local_name);
                if dest.exists() && !force {
                    tracing::info!("{} already exists at {:?}", file.label, dest);
                    continue;
                }

                let url = hub_url(CLIP_REPO, file.remote_path);
                tracing::info!("Downloading {}...", file.label);
                tracing::info!("  Source: {}", url);
                tracing::info!("  Destination: {:?}", dest);

                download_file(&client, &url, &dest).await?;

                let file_size = std::fs::metadata(&dest)?.len();
                tracing::info!(
                    "  {} complete ({:.1} MB)",
                    file.label,
                    file_size as f64 / (1024.0 * 1024.0)
                );
            }

            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            if !model_dir.exists() {
                println!("No models installed.");
                println!("Run `tagline models download` to download required models.");
                return Ok(());
            }

            println!("Scoring model: {}", config.scoring.model);
            println!("  Directory: {}\n", model_dir.display());
            for file in CLIP_FILES {
                let status = if model_dir.join(file.local_name).exists() {
                    "ready"
                } else {
                    "not installed"
                };
                println!("    - {:30} {}", file.local_name, status);
            }
        }

        ModelsCommand::Path => {
            println!("{}", model_dir.display());
        }
    }

    Ok(())
}

/// Stream a URL to `dest`, showing a progress bar.
///
/// Writes to a `.part` file first so an interrupted download never leaves a
/// truncated model behind.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let progress = create_progress_bar(response.content_length());
    let partial = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        progress.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, dest).await?;
    progress.finish_and_clear();

    Ok(())
}

fn create_progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    }
}
