//! The `mixclip models` command for managing the CLIP model files.

use std::path::Path;

use clap::{Args, Subcommand};
use mixclip_core::embedding::{hf_url, ClipPaths, CLIP_FILES, CLIP_REPO};
use mixclip_core::Config;

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
        /// Hugging Face repository to fetch from
        #[arg(long, default_value = CLIP_REPO)]
        repo: String,
    },

    /// List installed model files
    List,

    /// Show model directory path
    Path,
}

/// Download every missing file of the CLIP bundle into `dir`.
///
/// Files already on disk are left alone.
pub async fn download_clip(repo: &str, dir: &Path, client: &reqwest::Client) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;

    for file in CLIP_FILES {
        let dest = dir.join(file.local);
        if dest.exists() {
            tracing::info!("{} already exists at {:?}", file.local, dest);
            continue;
        }

        let url = hf_url(repo, file.remote);
        tracing::info!("Downloading {} ({})...", file.local, file.approx_size);
        tracing::info!("  Source: {}", url);
        tracing::info!("  Destination: {:?}", dest);

        download_file(client, &url, &dest).await?;

        let file_size = std::fs::metadata(&dest)?.len();
        tracing::info!(
            "  {} complete ({:.1} MB)",
            file.local,
            file_size as f64 / (1024.0 * 1024.0)
        );
    }

    Ok(())
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    let model_dir = config.clip_model_dir();

    match args.command {
        ModelsCommand::Download { repo } => {
            let client = reqwest::Client::new();
            download_clip(&repo, &model_dir, &client).await?;
            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            if !model_dir.exists() {
                println!("No models installed.");
                println!("Run `mixclip models download` to download the CLIP model.");
                return Ok(());
            }

            let paths = ClipPaths::new(&model_dir);
            let missing = paths.missing();

            println!("Model: {}", config.embedding.model);
            println!("  Directory: {}\n", model_dir.display());
            for file in [&paths.vision, &paths.text, &paths.tokenizer] {
                let status = if missing.contains(file) {
                    "not installed"
                } else {
                    "ready"
                };
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                println!("    - {:30} {}", name, status);
            }
        }

        ModelsCommand::Path => {
            println!("{}", model_dir.display());
        }
    }

    Ok(())
}

/// Download a file from a URL to a local path, streaming to disk.
///
/// A partial file is removed when the transfer fails.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
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
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(dest).await;
                anyhow::bail!("Download of {} interrupted: {e}", url);
            }
        };
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

    #[tokio::test]
    async fn test_download_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        for file in CLIP_FILES {
            std::fs::write(dir.path().join(file.local), b"present").unwrap();
        }

        // No request is made when every file is present.
        let client = reqwest::Client::new();
        download_clip("invalid/repo", dir.path(), &client)
            .await
            .unwrap();

        for file in CLIP_FILES {
            assert_eq!(std::fs::read(dir.path().join(file.local)).unwrap(), b"present");
        }
    }
}
