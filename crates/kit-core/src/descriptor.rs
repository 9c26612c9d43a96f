//! TOML package descriptor parsing and the install step.
//!
//! ```toml
//! [package]
//! name = "kitcli"
//! version = "v0.0.9"
//!
//! [platform]
//! require = "64-bit"
//!
//! [artifact]
//! url = "https://example.com/download/{version}/kitcli_{version}.zip"
//! sha256 = "228e9423813950beb149b8890f8bb9911424a1dd49664686948b340b50dc3a22"
//!
//! [install]
//! bin = ["kitcli"]
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::runtime::PlatformRuntime;
use kit_schema::{
    ArtifactFormat, PackageName, PlatformRequirement, Sha256Digest, UrlTemplate, Version,
};

/// Errors that can occur when loading or parsing a descriptor.
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// An I/O error occurred while reading a descriptor file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized. Malformed checksums and
    /// URL templates surface here, since both are validated while parsing.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The descriptor could not be rendered back to TOML.
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The descriptor parsed but violates a structural rule.
    #[error("Invalid descriptor: {0}")]
    Invalid(String),
}

/// Failures of the install step itself.
#[derive(Error, Debug)]
pub enum InstallError {
    /// A file the descriptor promises is not present in the extracted artifact.
    #[error("'{file}' not found in extracted artifact at {}", searched.display())]
    MissingFile {
        /// Relative path declared in `[install].bin`.
        file: String,
        /// Directory that was searched.
        searched: PathBuf,
    },

    /// Copying into the binary directory failed (permissions, disk space, ...).
    #[error("Failed to write {}: {source}", target.display())]
    WriteFailure {
        /// Destination that could not be written.
        target: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Metadata describing a package's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Package identifier.
    pub name: PackageName,
    /// Release version; the only place the version is written down.
    pub version: Version,
    /// Short human-readable summary of the package.
    #[serde(default)]
    pub description: String,
    /// URL of the project's homepage. Informational only.
    #[serde(default)]
    pub homepage: String,
}

/// Platform gate evaluated before anything is downloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSpec {
    /// Architecture predicate; defaults to `"any"`.
    #[serde(default)]
    pub require: PlatformRequirement,
}

/// Location and integrity information for the prebuilt artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    /// Download URL template, rendered with the package version.
    pub url: UrlTemplate,
    /// Expected SHA-256 digest of the downloaded artifact.
    pub sha256: Sha256Digest,
    /// Archive format; inferred from the rendered URL when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ArtifactFormat>,
}

/// Files to place into the binary directory after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSpec {
    /// Entries of the form `path` or `path:target`.
    pub bin: Vec<String>,
}

/// One parsed `[install].bin` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinEntry {
    /// Path relative to the extraction root.
    pub source: String,
    /// File name inside the binary directory.
    pub target: String,
}

impl InstallSpec {
    /// Parse the `bin` entries, splitting `src:target` renames.
    pub fn entries(&self) -> Vec<BinEntry> {
        self.bin
            .iter()
            .map(|spec| match spec.split_once(':') {
                Some((source, target)) => BinEntry {
                    source: source.to_string(),
                    target: target.to_string(),
                },
                None => {
                    let target = Path::new(spec)
                        .file_name()
                        .map_or_else(|| spec.clone(), |n| n.to_string_lossy().to_string());
                    BinEntry {
                        source: spec.clone(),
                        target,
                    }
                }
            })
            .collect()
    }
}

/// Post-install hints (printed, never executed)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hints {
    /// Message to display after installation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub post_install: String,
}

/// A complete package descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Identity and version.
    pub package: PackageInfo,
    /// Host requirement gating the install.
    #[serde(default)]
    pub platform: PlatformSpec,
    /// Artifact URL template and checksum.
    pub artifact: ArtifactSpec,
    /// Files copied into the binary directory.
    pub install: InstallSpec,
    /// Post-install messages displayed to the user.
    #[serde(default)]
    pub hints: Hints,
}

/// The concrete download a descriptor resolves to for its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Package the artifact belongs to.
    pub name: PackageName,
    /// Version the URL was rendered for.
    pub version: Version,
    /// Rendered download URL.
    pub url: String,
    /// Digest the downloaded bytes must match.
    pub sha256: Sha256Digest,
    /// Archive format to extract with.
    pub format: ArtifactFormat,
}

impl PackageDescriptor {
    /// Parse a descriptor from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::Io` if the file cannot be read, otherwise
    /// whatever [`parse`](Self::parse) returns.
    pub fn from_file(path: &Path) -> Result<Self, DescriptorError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a descriptor from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::Parse` for malformed TOML, checksums or URL
    /// templates, and `DescriptorError::Invalid` for structural problems.
    pub fn parse(content: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = toml::from_str(content)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Serialize this descriptor to a pretty-printed TOML string.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::Serialize` if serialization fails.
    pub fn to_toml(&self) -> Result<String, DescriptorError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Structural checks that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::Invalid` describing the first violation.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.package.name.is_empty() {
            return Err(DescriptorError::Invalid("package name is empty".to_string()));
        }
        if !self.package.version.is_url_safe() {
            return Err(DescriptorError::Invalid(format!(
                "version '{}' cannot be substituted into a URL",
                self.package.version
            )));
        }
        if self.install.bin.is_empty() {
            return Err(DescriptorError::Invalid(
                "[install].bin lists no files".to_string(),
            ));
        }
        for entry in self.install.entries() {
            let source = Path::new(&entry.source);
            let escapes = source
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if entry.source.is_empty() || escapes {
                return Err(DescriptorError::Invalid(format!(
                    "install entry '{}' must be a relative path inside the artifact",
                    entry.source
                )));
            }
            if entry.target.is_empty() || entry.target.contains(['/', '\\']) {
                return Err(DescriptorError::Invalid(format!(
                    "install target '{}' must be a plain file name",
                    entry.target
                )));
            }
        }
        Ok(())
    }

    /// Package name.
    pub fn name(&self) -> &PackageName {
        &self.package.name
    }

    /// Package version.
    pub fn version(&self) -> &Version {
        &self.package.version
    }

    /// Whether the runtime's host satisfies `[platform].require`.
    pub fn check_platform<R: PlatformRuntime + ?Sized>(&self, runtime: &R) -> bool {
        runtime.is_supported_architecture(&self.platform.require)
    }

    /// Render the download URL for this version and pair it with its checksum.
    ///
    /// Pure: no network access, same output for the same descriptor.
    pub fn resolve_artifact(&self) -> ResolvedArtifact {
        let url = self
            .artifact
            .url
            .render(&self.package.name, &self.package.version);
        let format = self
            .artifact
            .format
            .unwrap_or_else(|| ArtifactFormat::from_url(&url));
        ResolvedArtifact {
            name: self.package.name.clone(),
            version: self.package.version.clone(),
            url,
            sha256: self.artifact.sha256.clone(),
            format,
        }
    }

    /// Copy the declared files from `extracted` into `bin_dir`.
    ///
    /// Every source is located before anything is written. If a copy fails
    /// midway, files already placed by this call are removed again.
    ///
    /// # Errors
    ///
    /// `InstallError::MissingFile` if a declared file is absent,
    /// `InstallError::WriteFailure` if the binary directory cannot be written.
    pub fn install(&self, extracted: &Path, bin_dir: &Path) -> Result<Vec<PathBuf>, InstallError> {
        let mut plan = Vec::new();
        for entry in self.install.entries() {
            let source = locate(extracted, &entry.source).ok_or_else(|| {
                InstallError::MissingFile {
                    file: entry.source.clone(),
                    searched: extracted.to_path_buf(),
                }
            })?;
            plan.push((source, bin_dir.join(&entry.target)));
        }

        fs::create_dir_all(bin_dir).map_err(|source| InstallError::WriteFailure {
            target: bin_dir.to_path_buf(),
            source,
        })?;

        let mut placed: Vec<PathBuf> = Vec::with_capacity(plan.len());
        for (source, target) in plan {
            if let Err(source_err) = place_file(&source, &target) {
                for done in &placed {
                    fs::remove_file(done).ok();
                }
                return Err(InstallError::WriteFailure {
                    target,
                    source: source_err,
                });
            }
            debug!("Installed {} -> {}", source.display(), target.display());
            placed.push(target);
        }

        Ok(placed)
    }
}

impl std::str::FromStr for PackageDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Find `rel` under `root`, looking one level down when the archive wraps
/// everything in a single top-level directory.
fn locate(root: &Path, rel: &str) -> Option<PathBuf> {
    let direct = root.join(rel);
    if direct.is_file() {
        return Some(direct);
    }

    let mut dirs = fs::read_dir(root)
        .ok()?
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()));
    let only = dirs.next()?;
    if dirs.next().is_some() {
        return None;
    }
    let nested = only.path().join(rel);
    nested.is_file().then_some(nested)
}

/// Stage next to the target and rename, so the target is never half-written.
fn place_file(source: &Path, target: &Path) -> std::io::Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let staged = target.with_file_name(format!(".{file_name}.kit-tmp"));

    let result = (|| {
        fs::copy(source, &staged)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&staged, fs::Permissions::from_mode(0o755))?;
        }
        fs::rename(&staged, target)
    })();

    if result.is_err() {
        fs::remove_file(&staged).ok();
    }
    result
}
