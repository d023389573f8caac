//! The `tagyard models` command for managing tagging models.
//!
//! Models are fetched from their Hugging Face repos: the ONNX weights plus
//! the `selected_tags.csv` label list, stored under
//! `<model_dir>/<identity>/`.

use clap::{Args, Subcommand};
use std::path::Path;

use tagyard_core::tagger::wd::{LABEL_FILE, MODEL_FILE};
use tagyard_core::{Config, ContentHash, KNOWN_MODELS};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download a model (weights + label list)
    Download {
        /// Model identity (defaults to the configured default model)
        model: Option<String>,
    },

    /// List known models and their install status
    List,

    /// Show model directory path
    Path,
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: Config) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Download { model } => {
            let identity = model.unwrap_or_else(|| config.defaults.model.clone());
            if !KNOWN_MODELS.contains(&identity.as_str()) {
                anyhow::bail!(
                    "Unknown model {identity:?}. Known models:\n  {}",
                    KNOWN_MODELS.join("\n  ")
                );
            }

            let client = reqwest::Client::new();
            download_model(&identity, &config, &client).await?;
            tracing::info!("Download complete.");
        }

        ModelsCommand::List => {
            let model_dir = config.model_dir();
            println!("Known models:");
            println!("  Directory: {}\n", model_dir.display());

            for identity in KNOWN_MODELS {
                let installed = is_installed(&model_dir, identity);
                let status = if installed { "ready" } else { "not installed" };
                let default_marker = if *identity == config.defaults.model {
                    "  (default)"
                } else {
                    ""
                };
                println!("  - {:42} {:14}{}", identity, status, default_marker);
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }
    }

    Ok(())
}

/// Whether both model files exist locally.
pub fn is_installed(model_dir: &Path, identity: &str) -> bool {
    let dir = model_dir.join(identity);
    dir.join(MODEL_FILE).exists() && dir.join(LABEL_FILE).exists()
}

/// Download a model's weights and label list. Skips files already present.
pub async fn download_model(
    identity: &str,
    config: &Config,
    client: &reqwest::Client,
) -> anyhow::Result<()> {
    let dir = config.model_dir().join(identity);
    std::fs::create_dir_all(&dir)?;

    for file in [MODEL_FILE, LABEL_FILE] {
        let dest = dir.join(file);
        if dest.exists() {
            tracing::info!("{file} already exists at {:?}", dest);
            continue;
        }

        let url = format!("https://huggingface.co/{identity}/resolve/main/{file}");
        tracing::info!("Downloading {file} for {identity}...");
        tracing::info!("  Source: {}", url);
        tracing::info!("  Destination: {:?}", dest);

        download_file(client, &url, &dest).await?;

        let file_size = std::fs::metadata(&dest)?.len();
        let checksum = ContentHash::of_file(&dest)?;
        tracing::info!(
            "  {file} complete ({:.1} MB, blake3 {})",
            file_size as f64 / (1024.0 * 1024.0),
            checksum
        );
    }

    Ok(())
}

/// Download a file from a URL to a local path, streaming to disk.
async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_check_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let identity = "SmilingWolf/wd-vit-tagger-v3";
        let model_path = dir.path().join(identity);
        std::fs::create_dir_all(&model_path).unwrap();

        assert!(!is_installed(dir.path(), identity));

        std::fs::write(model_path.join(MODEL_FILE), b"weights").unwrap();
        assert!(!is_installed(dir.path(), identity));

        std::fs::write(model_path.join(LABEL_FILE), b"labels").unwrap();
        assert!(is_installed(dir.path(), identity));
    }
}
