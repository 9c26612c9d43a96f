//! The install sequence for a single descriptor.
//!
//! Strictly linear: platform gate, resolve, download + verify, extract,
//! install, clean up. The first failure ends the run; nothing is retried.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::descriptor::{InstallError, PackageDescriptor, ResolvedArtifact};
use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;
use crate::reporter::Reporter;
use crate::runtime::PlatformRuntime;
use kit_schema::{Arch, PlatformRequirement};

/// Everything that can stop an install.
#[derive(Error, Debug)]
pub enum FlowError {
    /// The host does not satisfy `[platform].require`. Terminal: no fallback artifact exists.
    #[error("Hardware not supported")]
    UnsupportedPlatform {
        /// What the descriptor asked for.
        required: PlatformRequirement,
        /// What the host reported.
        host: Arch,
    },

    /// Fetching or verifying the artifact failed (including checksum mismatch).
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    /// The verified artifact could not be unpacked.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Placing files into the binary directory failed.
    #[error("Install failed: {0}")]
    Install(#[from] InstallError),
}

/// Result of a successful [`install_formula`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Files now present in the binary directory.
    Installed {
        /// Absolute paths of the installed files.
        files: Vec<PathBuf>,
    },
    /// `dry_run` was set; this is what would have been fetched.
    DryRun {
        /// The resolved download.
        artifact: ResolvedArtifact,
    },
}

/// Drive `descriptor` through `runtime`.
///
/// # Errors
///
/// Returns [`FlowError::UnsupportedPlatform`] before any side effect when the
/// host fails the platform check; otherwise the first download, extraction or
/// install error.
#[instrument(skip_all, fields(package = %descriptor.name(), version = %descriptor.version()))]
pub async fn install_formula<R, P>(
    descriptor: &PackageDescriptor,
    runtime: &R,
    reporter: &P,
    dry_run: bool,
) -> Result<InstallOutcome, FlowError>
where
    R: PlatformRuntime + ?Sized,
    P: Reporter + ?Sized,
{
    let name = descriptor.name();
    let version = descriptor.version();

    if !descriptor.check_platform(runtime) {
        warn!(
            "Host architecture {} does not satisfy '{}'",
            runtime.host_arch(),
            descriptor.platform.require
        );
        return Err(FlowError::UnsupportedPlatform {
            required: descriptor.platform.require.clone(),
            host: runtime.host_arch(),
        });
    }

    let artifact = descriptor.resolve_artifact();
    info!("Resolved {} ({})", artifact.url, artifact.sha256);

    if dry_run {
        reporter.done(name, version, "(dry run)");
        return Ok(InstallOutcome::DryRun { artifact });
    }

    let archive = runtime.download_and_verify(&artifact).await?;

    reporter.extracting(name, version);
    let staging = runtime.extract(&archive, &artifact)?;

    reporter.installing(name, version);
    let result = descriptor.install(&staging, &runtime.bin_directory());
    runtime.cleanup(&staging);

    match result {
        Ok(files) => {
            info!("Installed {} file(s)", files.len());
            reporter.done(name, version, "installed");
            Ok(InstallOutcome::Installed { files })
        }
        Err(e) => {
            reporter.failed(name, version, &e.to_string());
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostConfig, HostRuntime};
    use crate::reporter::NullReporter;
    use crate::runtime::fake::FakeRuntime;
    use kit_schema::{PackageName, Sha256Digest, Version};
    use std::io::Write;
    use std::sync::Mutex;

    const KITCLI_FORMULA: &str = include_str!("../../../formulae/kitcli.toml");

    #[derive(Debug, Default)]
    struct RecordingReporter {
        events: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn count(&self, prefix: &str) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.starts_with(prefix))
                .count()
        }
    }

    impl Reporter for RecordingReporter {
        fn section(&self, title: &str) {
            self.push(format!("section {title}"));
        }
        fn downloading(&self, _: &PackageName, _: &Version, _: u64, _: Option<u64>) {
            self.push("downloading".to_string());
        }
        fn extracting(&self, name: &PackageName, _: &Version) {
            self.push(format!("extracting {name}"));
        }
        fn installing(&self, name: &PackageName, _: &Version) {
            self.push(format!("installing {name}"));
        }
        fn done(&self, name: &PackageName, _: &Version, detail: &str) {
            self.push(format!("done {name} {detail}"));
        }
        fn failed(&self, name: &PackageName, _: &Version, reason: &str) {
            self.push(format!("failed {name} {reason}"));
        }
        fn info(&self, msg: &str) {
            self.push(format!("info {msg}"));
        }
        fn warning(&self, msg: &str) {
            self.push(format!("warning {msg}"));
        }
    }

    fn kitcli() -> PackageDescriptor {
        PackageDescriptor::parse(KITCLI_FORMULA).unwrap()
    }

    #[tokio::test]
    async fn supported_host_installs_exactly_once() {
        let runtime = FakeRuntime::new(Arch::X86_64).with_file("kitcli", b"kit binary");
        let reporter = RecordingReporter::default();

        let outcome = install_formula(&kitcli(), &runtime, &reporter, false)
            .await
            .unwrap();

        let target = runtime.bin_directory().join("kitcli");
        assert_eq!(outcome, InstallOutcome::Installed { files: vec![target.clone()] });
        assert_eq!(std::fs::read(target).unwrap(), b"kit binary");
        assert_eq!(runtime.downloads(), 1);
        assert_eq!(runtime.extracts(), 1);
        assert_eq!(reporter.count("installing"), 1);
        assert_eq!(runtime.cleaned.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_host_stops_before_any_side_effect() {
        for arch in [Arch::X86, Arch::Arm] {
            let runtime = FakeRuntime::new(arch).with_file("kitcli", b"kit binary");
            let reporter = RecordingReporter::default();

            let err = install_formula(&kitcli(), &runtime, &reporter, false)
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                FlowError::UnsupportedPlatform { host, .. } if host == arch
            ));
            assert_eq!(err.to_string(), "Hardware not supported");
            assert_eq!(runtime.downloads(), 0);
            assert_eq!(runtime.extracts(), 0);
            assert_eq!(reporter.count("installing"), 0);
            assert!(runtime.installed().is_empty());
        }
    }

    #[tokio::test]
    async fn missing_binary_fails_and_installs_nothing() {
        let runtime = FakeRuntime::new(Arch::Arm64).with_file("README.md", b"docs");
        let reporter = RecordingReporter::default();

        let err = install_formula(&kitcli(), &runtime, &reporter, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FlowError::Install(InstallError::MissingFile { .. })
        ));
        assert!(runtime.installed().is_empty());
        assert_eq!(reporter.count("failed kitcli"), 1);
        // Staging is released on failure too.
        assert_eq!(runtime.cleaned.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn checksum_mismatch_never_reaches_install() {
        let mut runtime = FakeRuntime::new(Arch::X86_64).with_file("kitcli", b"kit binary");
        runtime.served_digest = Some("0".repeat(64));

        let err = install_formula(&kitcli(), &runtime, &NullReporter, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FlowError::Download(DownloadError::HashMismatch { .. })
        ));
        assert_eq!(runtime.extracts(), 0);
        assert!(runtime.installed().is_empty());
    }

    #[tokio::test]
    async fn dry_run_resolves_without_downloading() {
        let runtime = FakeRuntime::new(Arch::X86_64);

        let outcome = install_formula(&kitcli(), &runtime, &NullReporter, true)
            .await
            .unwrap();

        match outcome {
            InstallOutcome::DryRun { artifact } => {
                assert!(artifact.url.ends_with("/v0.0.9/kitcli_v0.0.9_darwin_amd64.zip"));
            }
            other => panic!("expected dry run, got {other:?}"),
        }
        assert_eq!(runtime.downloads(), 0);
    }

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
            for (name, data) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn served_descriptor(base: &str, sha256: &Sha256Digest) -> PackageDescriptor {
        PackageDescriptor::parse(&format!(
            r#"
[package]
name = "kitcli"
version = "v0.0.9"

[platform]
require = "64-bit"

[artifact]
url = "{base}/download/{{version}}/kitcli_{{version}}_darwin_amd64.zip"
sha256 = "{sha256}"

[install]
bin = ["kitcli"]
"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn host_runtime_end_to_end() {
        let archive = zip_bytes(&[("kitcli", b"#!/bin/sh\necho kit\n")]);
        let digest = Sha256Digest::compute(&archive);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/download/v0.0.9/kitcli_v0.0.9_darwin_amd64.zip")
            .with_status(200)
            .with_body(&archive)
            .expect(1)
            .create_async()
            .await;

        let home = tempfile::TempDir::new().unwrap();
        let runtime =
            HostRuntime::new(HostConfig::under(home.path()).with_arch(Arch::X86_64));
        let descriptor = served_descriptor(&server.url(), &digest);

        install_formula(&descriptor, &runtime, &NullReporter, false)
            .await
            .unwrap();
        assert!(home.path().join("bin/kitcli").is_file());
        assert_eq!(
            std::fs::read_dir(home.path().join("tmp")).unwrap().count(),
            0,
            "staging directory should be removed"
        );

        // Second run is served from the checksum-keyed cache.
        install_formula(&descriptor, &runtime, &NullReporter, false)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn host_runtime_rejects_tampered_artifact() {
        let archive = zip_bytes(&[("kitcli", b"binary")]);
        let expected = Sha256Digest::compute(b"the real release");

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/download/v0.0.9/kitcli_v0.0.9_darwin_amd64.zip")
            .with_status(200)
            .with_body(&archive)
            .create_async()
            .await;

        let home = tempfile::TempDir::new().unwrap();
        let runtime =
            HostRuntime::new(HostConfig::under(home.path()).with_arch(Arch::Arm64));
        let descriptor = served_descriptor(&server.url(), &expected);

        let err = install_formula(&descriptor, &runtime, &NullReporter, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FlowError::Download(DownloadError::HashMismatch { .. })
        ));
        assert!(!home.path().join("bin/kitcli").exists());
        assert_eq!(
            std::fs::read_dir(home.path().join("cache")).unwrap().count(),
            0
        );
    }
}
