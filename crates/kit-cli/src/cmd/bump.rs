//! Bump command
//!
//! Rewrites `[package].version` and `[artifact].sha256` in place. Comments
//! and key order survive because the file is edited with `toml_edit` rather
//! than re-serialized.

use std::path::Path;

use anyhow::{Context, Result, bail};
use kit_core::PackageDescriptor;
use kit_schema::{Sha256Digest, Version};
use toml_edit::{DocumentMut, value};
use tracing::info;

use crate::ui::Output;

/// Point `path` at a new release.
pub fn bump(path: &Path, version: &str, sha256: &str, dry_run: bool, quiet: bool) -> Result<()> {
    let output = Output::with_quiet(quiet);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let updated = bump_content(&content, version, sha256, &output)?;

    if dry_run {
        output.info(&format!("Would rewrite {}", path.display()));
        print!("{updated}");
        return Ok(());
    }

    std::fs::write(path, &updated).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Rewrote {} for {version}", path.display());
    output.success(&format!("Bumped {} to {version}", path.display()));
    Ok(())
}

/// Apply the bump to formula text and return the new text.
fn bump_content(content: &str, version: &str, sha256: &str, output: &Output) -> Result<String> {
    let current = PackageDescriptor::parse(content).context("Current formula is invalid")?;

    let new_version = Version::from(version);
    if !new_version.is_url_safe() {
        bail!("Version '{version}' cannot be used in a download URL");
    }
    let digest = Sha256Digest::new(sha256).context("Invalid --sha256")?;

    if new_version <= *current.version() {
        output.warning(&format!(
            "{new_version} is not newer than {}",
            current.version()
        ));
    }

    let mut doc = content.parse::<DocumentMut>()?;
    doc["package"]["version"] = value(new_version.as_str());
    doc["artifact"]["sha256"] = value(digest.as_str());
    let updated = doc.to_string();

    let bumped = PackageDescriptor::parse(&updated).context("Bumped formula is invalid")?;
    output.info(&format!("New URL: {}", bumped.resolve_artifact().url));

    Ok(updated)
}
