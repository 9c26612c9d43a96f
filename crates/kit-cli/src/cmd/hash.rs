//! Hash command

use anyhow::{Context, Result};
use kit_schema::Sha256Digest;
use std::path::PathBuf;

/// Compute SHA256 hash of files
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let hash = Sha256Digest::compute_file(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        println!("{} {}", hash, file.display());
    }
    Ok(())
}
