//! Check command

use std::path::Path;

use anyhow::{Context, Result};
use kit_core::PackageDescriptor;

use crate::ui::Output;

/// Validate a formula and print what it resolves to.
pub fn check(path: &Path, quiet: bool) -> Result<()> {
    let descriptor = PackageDescriptor::from_file(path)
        .with_context(|| format!("Invalid formula {}", path.display()))?;
    let output = Output::with_quiet(quiet);
    let artifact = descriptor.resolve_artifact();

    output.success("Formula is valid");
    output.detail("Name", descriptor.name());
    output.detail("Version", descriptor.version());
    output.detail("Platform", &descriptor.platform.require.to_string());
    output.detail("URL", &artifact.url);
    output.detail("SHA256", artifact.sha256.as_str());
    output.detail("Format", artifact.format.as_str());
    for entry in descriptor.install.entries() {
        output.detail("Bin", &format!("{} -> {}", entry.source, entry.target));
    }

    if descriptor.package.homepage.is_empty() {
        output.warning("No homepage defined");
    }
    if descriptor.version().semver().is_none() {
        output.warning(&format!(
            "Version '{}' is not semver; `kit bump` cannot tell if a new version is newer",
            descriptor.version()
        ));
    }

    Ok(())
}
