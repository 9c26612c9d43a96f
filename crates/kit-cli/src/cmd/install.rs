//! Install command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use kit_core::{HostConfig, HostRuntime, InstallOutcome, PackageDescriptor, install_formula};

use crate::ui::Output;

/// Install the package described by `formula`.
///
/// An unsupported host surfaces as `FlowError::UnsupportedPlatform`; `main`
/// turns that into the `Hardware not supported` message.
pub async fn install(
    formula: &Path,
    bin_dir: Option<PathBuf>,
    dry_run: bool,
    quiet: bool,
) -> Result<()> {
    let descriptor = PackageDescriptor::from_file(formula)
        .with_context(|| format!("Failed to load {}", formula.display()))?;

    let mut config = HostConfig::from_env()?;
    if let Some(dir) = bin_dir {
        config = config.with_bin_dir(dir);
    }
    debug!(
        "Host {} installing into {}",
        config.arch,
        config.bin_dir.display()
    );

    let output = Output::with_quiet(quiet);
    let runtime = HostRuntime::with_reporter(config, Arc::new(output.clone()));

    output.section(&format!("Installing {}", descriptor.name()));

    match install_formula(&descriptor, &runtime, &output, dry_run).await? {
        InstallOutcome::Installed { files } => {
            for file in &files {
                output.detail("bin", &file.display().to_string());
            }
            if !descriptor.hints.post_install.is_empty() {
                output.info(&descriptor.hints.post_install);
            }
        }
        InstallOutcome::DryRun { artifact } => {
            output.info(&format!("Would download {}", artifact.url));
            output.detail("sha256", artifact.sha256.as_str());
            output.detail("format", artifact.format.as_str());
            output.detail("into", &runtime.config().bin_dir.display().to_string());
        }
    }

    Ok(())
}
