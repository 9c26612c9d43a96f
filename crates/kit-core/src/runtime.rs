//! The capability boundary between a descriptor and the machine it installs on.
//!
//! A [`PackageDescriptor`](crate::PackageDescriptor) never touches the network
//! or decides where binaries live. Everything with a side effect goes through
//! a `PlatformRuntime`, which lets the install flow run against
//! [`HostRuntime`](crate::HostRuntime) in production and a fake in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::descriptor::ResolvedArtifact;
use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;
use kit_schema::{Arch, PlatformRequirement};

/// Host services a descriptor needs in order to be installed.
#[async_trait]
pub trait PlatformRuntime: Send + Sync {
    /// Architecture of the machine being installed on.
    fn host_arch(&self) -> Arch;

    /// Whether the host satisfies `requirement`.
    fn is_supported_architecture(&self, requirement: &PlatformRequirement) -> bool {
        requirement.is_satisfied_by(self.host_arch())
    }

    /// Fetch the artifact and verify its SHA-256 digest, returning the local path.
    ///
    /// # Errors
    ///
    /// A digest mismatch must fail with [`DownloadError::HashMismatch`] and
    /// must not leave the mismatching file behind.
    async fn download_and_verify(&self, artifact: &ResolvedArtifact)
    -> Result<PathBuf, DownloadError>;

    /// Unpack the downloaded `archive` into a fresh staging directory and return it.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] for unreadable or corrupt archives.
    fn extract(&self, archive: &Path, artifact: &ResolvedArtifact)
    -> Result<PathBuf, ExtractError>;

    /// Directory that installed executables are placed in.
    fn bin_directory(&self) -> PathBuf;

    /// Release a staging directory returned by [`extract`](Self::extract).
    fn cleanup(&self, _staging: &Path) {}
}
