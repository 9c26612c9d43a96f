//! Resolve command

use std::path::Path;

use anyhow::{Context, Result};
use kit_core::PackageDescriptor;

/// Print `<url> <sha256>` for a formula.
pub fn resolve(path: &Path) -> Result<()> {
    let descriptor = PackageDescriptor::from_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let artifact = descriptor.resolve_artifact();
    println!("{} {}", artifact.url, artifact.sha256);
    Ok(())
}
