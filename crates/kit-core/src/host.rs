//! The real [`PlatformRuntime`]: HTTP downloads, an on-disk cache keyed by
//! checksum, and extraction into a staging directory under the kit home.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::descriptor::ResolvedArtifact;
use crate::io::download::{self, DownloadError, DownloadRequest};
use crate::io::extract::{self, ExtractError};
use crate::paths::{
    KIT_ARCH_ENV, KIT_BIN_DIR_ENV, bin_path, cache_path, filename_from_url, tmp_path,
    try_kit_home,
};
use crate::reporter::{NullReporter, Reporter};
use crate::runtime::PlatformRuntime;
use kit_schema::Arch;

/// Problems with the environment-supplied configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither `KIT_HOME` nor the user's home directory is available.
    #[error("Could not determine a home directory; set KIT_HOME")]
    NoHome,

    /// `KIT_ARCH` is set to something that is not an architecture.
    #[error("Invalid KIT_ARCH: {0}")]
    InvalidArch(String),
}

/// Directory layout and host facts used by [`HostRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Where installed executables go.
    pub bin_dir: PathBuf,
    /// Verified downloads, reused across runs.
    pub cache_dir: PathBuf,
    /// Parent of per-install staging directories.
    pub tmp_dir: PathBuf,
    /// Architecture reported to platform checks.
    pub arch: Arch,
}

impl HostConfig {
    /// Layout rooted at `home` with the detected architecture.
    pub fn under(home: &Path) -> Self {
        Self {
            bin_dir: bin_path(home),
            cache_dir: cache_path(home),
            tmp_dir: tmp_path(home),
            arch: Arch::current(),
        }
    }

    /// Layout from `KIT_HOME` / `KIT_BIN_DIR` / `KIT_ARCH`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] when no home directory can be
    /// determined and [`ConfigError::InvalidArch`] when `KIT_ARCH` does not
    /// name a known architecture.
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = try_kit_home().ok_or(ConfigError::NoHome)?;
        Self::under(&home).with_overrides(
            std::env::var(KIT_BIN_DIR_ENV).ok(),
            std::env::var(KIT_ARCH_ENV).ok().as_deref(),
        )
    }

    /// Apply the bin directory and architecture overrides, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidArch`] for an unknown architecture name.
    pub fn with_overrides(
        mut self,
        bin_dir: Option<String>,
        arch: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if let Some(bin) = bin_dir {
            self.bin_dir = PathBuf::from(bin);
        }
        if let Some(arch) = arch {
            self.arch = arch.parse().map_err(ConfigError::InvalidArch)?;
        }
        Ok(self)
    }

    /// Override the binary directory.
    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = bin_dir.into();
        self
    }

    /// Override the reported architecture.
    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }
}

/// Runtime backed by the local machine.
#[derive(Clone)]
pub struct HostRuntime {
    config: HostConfig,
    client: Client,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for HostRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRuntime")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HostRuntime {
    /// Create a runtime with a silent reporter.
    pub fn new(config: HostConfig) -> Self {
        Self::with_reporter(config, Arc::new(NullReporter))
    }

    /// Create a runtime that reports download progress to `reporter`.
    pub fn with_reporter(config: HostConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            config,
            client: Client::new(),
            reporter,
        }
    }

    /// The layout this runtime writes into.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    fn cache_file(&self, artifact: &ResolvedArtifact) -> PathBuf {
        let file_name = match filename_from_url(&artifact.url) {
            "" => "artifact",
            name => name,
        };
        self.config
            .cache_dir
            .join(format!("{}-{file_name}", artifact.sha256))
    }
}

#[async_trait]
impl PlatformRuntime for HostRuntime {
    fn host_arch(&self) -> Arch {
        self.config.arch
    }

    async fn download_and_verify(
        &self,
        artifact: &ResolvedArtifact,
    ) -> Result<PathBuf, DownloadError> {
        let dest = self.cache_file(artifact);

        if download::verify_cached(&dest, &artifact.sha256).await {
            info!("Using cached {}", dest.display());
            return Ok(dest);
        }

        tokio::fs::create_dir_all(&self.config.cache_dir).await?;

        DownloadRequest::new(
            &self.client,
            &artifact.name,
            &artifact.version,
            &artifact.url,
            &dest,
            &artifact.sha256,
            self.reporter.as_ref(),
        )
        .execute()
        .await
    }

    fn extract(
        &self,
        archive: &Path,
        artifact: &ResolvedArtifact,
    ) -> Result<PathBuf, ExtractError> {
        std::fs::create_dir_all(&self.config.tmp_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("{}-{}-", artifact.name, artifact.version))
            .tempdir_in(&self.config.tmp_dir)?
            .keep();

        let files = match extract::extract(archive, artifact.format, &staging, &artifact.name) {
            Ok(files) => files,
            Err(e) => {
                std::fs::remove_dir_all(&staging).ok();
                return Err(e);
            }
        };
        let executables = files.iter().filter(|f| f.is_executable).count();
        debug!(
            "Extracted {} file(s), {executables} executable, into {}",
            files.len(),
            staging.display()
        );
        Ok(staging)
    }

    fn bin_directory(&self) -> PathBuf {
        self.config.bin_dir.clone()
    }

    fn cleanup(&self, staging: &Path) {
        if !staging.starts_with(&self.config.tmp_dir) {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(staging) {
            warn!("Failed to remove {}: {e}", staging.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_layout_under_home() {
        let home = Path::new("/opt/kit");
        let config = HostConfig::under(home).with_arch(Arch::X86);
        assert_eq!(config.bin_dir, Path::new("/opt/kit/bin"));
        assert_eq!(config.cache_dir, Path::new("/opt/kit/cache"));
        assert_eq!(config.tmp_dir, Path::new("/opt/kit/tmp"));
        assert_eq!(config.arch, Arch::X86);

        let moved = config.with_bin_dir("/usr/local/bin");
        assert_eq!(moved.bin_dir, Path::new("/usr/local/bin"));
    }

    #[test]
    fn overrides_apply_and_reject_unknown_arch() {
        let base = HostConfig::under(Path::new("/opt/kit"));

        let config = base
            .clone()
            .with_overrides(Some("/usr/local/bin".to_string()), Some("i386"))
            .unwrap();
        assert_eq!(config.bin_dir, Path::new("/usr/local/bin"));
        assert_eq!(config.arch, Arch::X86);

        let err = base.clone().with_overrides(None, Some("i386x")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArch(_)));
        assert!(err.to_string().contains("i386x"));

        assert_eq!(base.clone().with_overrides(None, None).unwrap(), base);
    }

    #[test]
    fn cleanup_only_touches_staging_area() {
        let home = TempDir::new().unwrap();
        let runtime = HostRuntime::new(HostConfig::under(home.path()));

        let outside = home.path().join("keep");
        std::fs::create_dir_all(&outside).unwrap();
        runtime.cleanup(&outside);
        assert!(outside.exists());

        let staging = home.path().join("tmp/kitcli-v0.0.9-abc");
        std::fs::create_dir_all(&staging).unwrap();
        runtime.cleanup(&staging);
        assert!(!staging.exists());
    }
}
