use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// A normalized package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name, normalizing the input to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Return the normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.0
    }
}

/// A release version string, stored exactly as written (`v0.0.9`).
///
/// Release tags commonly carry a leading `v`; ordering strips it and compares
/// as semver where possible, falling back to plain string order. Equal
/// semver values spelled differently are ordered by their raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.semver(), other.semver()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as semver, ignoring a single leading `v`.
    pub fn semver(&self) -> Option<semver::Version> {
        let bare = self.0.strip_prefix('v').unwrap_or(&self.0);
        semver::Version::parse(bare).ok()
    }

    /// Whether the string can be substituted into a URL path segment.
    pub fn is_url_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Archive or binary format of a downloadable artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Gzip-compressed tar archive (`.tar.gz` / `.tgz`).
    #[serde(rename = "tar.gz")]
    TarGz,
    /// Zstandard-compressed tar archive (`.tar.zst`).
    #[serde(rename = "tar.zst")]
    TarZst,
    /// Uncompressed tar archive (`.tar`).
    Tar,
    /// Zip archive (`.zip`).
    Zip,
    /// Standalone executable with no archive wrapper.
    Binary,
}

impl ArtifactFormat {
    /// Infer the format from a URL or file name by its extension.
    ///
    /// Anything unrecognized is treated as a bare executable.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();

        if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Self::TarGz
        } else if path.ends_with(".tar.zst") || path.ends_with(".tzst") {
            Self::TarZst
        } else if path.ends_with(".tar") {
            Self::Tar
        } else if path.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Binary
        }
    }

    /// Canonical name as written in descriptors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
            Self::Tar => "tar",
            Self::Zip => "zip",
            Self::Binary => "binary",
        }
    }
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_is_lowercased() {
        assert_eq!(PackageName::new("KitCLI"), "kitcli");
    }

    #[test]
    fn version_ordering_ignores_v_prefix() {
        assert!(Version::from("v0.0.10") > Version::from("v0.0.9"));
        assert!(Version::from("0.1.0") > Version::from("v0.0.9"));
        assert_eq!(Version::from("v0.0.9").to_string(), "v0.0.9");
    }

    #[test]
    fn version_ordering_agrees_with_equality() {
        use std::cmp::Ordering;

        let prefixed = Version::from("v1.0.0");
        let bare = Version::from("1.0.0");
        assert_ne!(prefixed, bare);
        assert_ne!(prefixed.cmp(&bare), Ordering::Equal);
        assert_eq!(prefixed.cmp(&bare), bare.cmp(&prefixed).reverse());
        assert_eq!(prefixed.cmp(&prefixed.clone()), Ordering::Equal);
        assert!(Version::from("v1.0.1") > bare);
    }

    #[test]
    fn url_safety() {
        assert!(Version::from("v0.0.9").is_url_safe());
        assert!(!Version::from("").is_url_safe());
        assert!(!Version::from("v1/../2").is_url_safe());
        assert!(!Version::from("v 1").is_url_safe());
    }

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(
            ArtifactFormat::from_url("https://x/kitcli_v0.0.9_darwin_amd64.zip"),
            ArtifactFormat::Zip
        );
        assert_eq!(
            ArtifactFormat::from_url("https://x/tool.tar.gz?raw=1"),
            ArtifactFormat::TarGz
        );
        assert_eq!(ArtifactFormat::from_url("tool.tar.zst"), ArtifactFormat::TarZst);
        assert_eq!(ArtifactFormat::from_url("https://x/tool"), ArtifactFormat::Binary);
    }
}
