//! Artifact download with streaming SHA256 verification.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::Reporter;
use kit_schema::{PackageName, Sha256Digest, Version};

/// Errors raised while fetching or verifying an artifact.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure while writing the download.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded bytes do not hash to the descriptor's checksum.
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Digest declared by the descriptor.
        expected: String,
        /// Digest of the bytes actually received.
        actual: String,
    },
}

/// Request for a download operation
pub struct DownloadRequest<'a, R: Reporter + ?Sized> {
    /// Shared HTTP client.
    pub client: &'a Client,
    /// Package being fetched, for progress reporting.
    pub pkg_name: &'a PackageName,
    /// Version being fetched, for progress reporting.
    pub version: &'a Version,
    /// Source URL.
    pub url: &'a str,
    /// Final location of the verified file.
    pub dest: &'a Path,
    /// Digest the body must match.
    pub expected_hash: &'a Sha256Digest,
    /// Progress sink.
    pub reporter: &'a R,
}

impl<R: Reporter + ?Sized> std::fmt::Debug for DownloadRequest<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("url", &self.url)
            .field("dest", &self.dest)
            .field("expected_hash", &self.expected_hash)
            .finish_non_exhaustive()
    }
}

impl<'a, R: Reporter + ?Sized> DownloadRequest<'a, R> {
    /// Bundle the arguments of a download.
    pub fn new(
        client: &'a Client,
        pkg_name: &'a PackageName,
        version: &'a Version,
        url: &'a str,
        dest: &'a Path,
        expected_hash: &'a Sha256Digest,
        reporter: &'a R,
    ) -> Self {
        Self {
            client,
            pkg_name,
            version,
            url,
            dest,
            expected_hash,
            reporter,
        }
    }

    /// Execute the download.
    ///
    /// # Errors
    ///
    /// See [`download_and_verify`].
    pub async fn execute(self) -> Result<PathBuf, DownloadError> {
        download_and_verify(self).await
    }
}

/// Stream `url` to disk while hashing it.
///
/// Bytes land in `<dest>.part` and are only renamed to `dest` once the digest
/// matches, so `dest` never holds unverified content.
///
/// # Errors
///
/// `DownloadError::Http` for transport/status failures, `DownloadError::Io`
/// for local write failures and `DownloadError::HashMismatch` when the digest
/// differs (the partial file is removed).
pub async fn download_and_verify<R: Reporter + ?Sized>(
    req: DownloadRequest<'_, R>,
) -> Result<PathBuf, DownloadError> {
    let DownloadRequest {
        client,
        pkg_name,
        version,
        url,
        dest,
        expected_hash,
        reporter,
    } = req;

    debug!("Downloading {url} -> {}", dest.display());

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let total_size = response.content_length();
    reporter.downloading(pkg_name, version, 0, total_size);

    let part = part_path(dest);
    let written = async {
        let mut file = File::create(&part).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            reporter.downloading(pkg_name, version, downloaded, total_size);
        }

        file.flush().await?;
        Ok::<_, DownloadError>(hex::encode(hasher.finalize()))
    }
    .await;

    let actual_hash = match written {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Download of {url} interrupted: {e}");
            tokio::fs::remove_file(&part).await.ok();
            return Err(e);
        }
    };

    if expected_hash.as_str() != actual_hash {
        warn!("Checksum mismatch for {url}: expected {expected_hash}, got {actual_hash}");
        reporter.failed(pkg_name, version, "hash mismatch");
        tokio::fs::remove_file(&part).await.ok();
        return Err(DownloadError::HashMismatch {
            expected: expected_hash.to_string(),
            actual: actual_hash,
        });
    }

    tokio::fs::rename(&part, dest).await?;
    Ok(dest.to_path_buf())
}

/// Whether `path` exists and still hashes to `expected`.
///
/// A cached file that no longer matches is deleted.
pub async fn verify_cached(path: &Path, expected: &Sha256Digest) -> bool {
    if !path.is_file() {
        return false;
    }

    let owned = path.to_path_buf();
    let actual = tokio::task::spawn_blocking(move || Sha256Digest::compute_file(&owned)).await;

    match actual {
        Ok(Ok(actual)) if actual == *expected => true,
        _ => {
            warn!("Discarding stale cache entry {}", path.display());
            tokio::fs::remove_file(path).await.ok();
            false
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
