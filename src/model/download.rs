//! Model weight download and verification.

use crate::config::LocalModelConfig;
use crate::constants::download;
use crate::error::{Error, Result};
use crate::output::{partial_path, register_in_flight, unregister_in_flight};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Download a file with progress bar.
///
/// Bytes are streamed into a `.partial` sibling, hashed on the way, and only
/// renamed onto `dest` once the optional checksum matches.
pub async fn download_file(
    client: &Client,
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
    show_progress: bool,
) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::DownloadFailed {
            url: url.to_string(),
            source: Box::new(e),
        })?;

    if !response.status().is_success() {
        return Err(Error::DownloadFailed {
            url: url.to_string(),
            source: format!("HTTP {}", response.status()).into(),
        });
    }

    let total_size = response.content_length().unwrap_or(0);

    let pb = if show_progress {
        ProgressBar::new(total_size)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{bar:40.cyan/blue} {percent}% ({bytes}/{total_bytes})")
            .map_err(|e| Error::Internal {
                message: format!("Failed to create progress bar: {e}"),
            })?
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(format!(
        "Downloading {}...",
        dest.file_name().map_or_else(
            || std::borrow::Cow::Borrowed("file"),
            |n| n.to_string_lossy()
        )
    ));

    let partial = partial_path(dest);
    register_in_flight(&partial);
    let result = stream_to_file(response, url, &partial, &pb).await;
    let digest = match result {
        Ok(digest) => digest,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            unregister_in_flight(&partial);
            return Err(e);
        }
    };

    pb.finish_with_message("Download complete");

    if let Some(expected) = expected_sha256
        && !digest.eq_ignore_ascii_case(expected)
    {
        let _ = tokio::fs::remove_file(&partial).await;
        unregister_in_flight(&partial);
        return Err(Error::ChecksumMismatch {
            path: dest.to_path_buf(),
            expected: expected.to_lowercase(),
            actual: digest,
        });
    }

    let renamed = tokio::fs::rename(&partial, dest).await;
    unregister_in_flight(&partial);
    renamed.map_err(Error::Io)
}

async fn stream_to_file(
    response: reqwest::Response,
    url: &str,
    partial: &Path,
    pb: &ProgressBar,
) -> Result<String> {
    let mut file = File::create(partial).await.map_err(Error::Io)?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::DownloadFailed {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        file.write_all(&chunk).await.map_err(Error::Io)?;
        hasher.update(&chunk);

        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush().await.map_err(Error::Io)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fetch the configured model weights to `dest`.
///
/// An existing file is kept unless `force` is set.
pub fn fetch_model(
    config: &LocalModelConfig,
    dest: &Path,
    force: bool,
    show_progress: bool,
) -> Result<PathBuf> {
    if dest.is_file() && !force {
        info!("Model already present at {}", dest.display());
        return Ok(dest.to_path_buf());
    }

    let url = config.model_url.as_deref().ok_or_else(|| Error::ModelLoad {
        path: dest.to_path_buf(),
        reason: "no local.model_url configured to fetch weights from".to_string(),
    })?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(Error::Io)?;
    }

    let client = Client::builder()
        .connect_timeout(Duration::from_secs(download::CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(download::TIMEOUT_SECS))
        .build()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create HTTP client: {e}"),
        })?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;

    info!("Fetching model weights from {url}");
    runtime.block_on(download_file(
        &client,
        url,
        dest,
        config.model_sha256.as_deref(),
        show_progress,
    ))?;
    info!("Model saved to {}", dest.display());

    Ok(dest.to_path_buf())
}
