use std::io::Read;

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Reasons a string is not an acceptable SHA-256 digest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The hex portion is not exactly 64 characters long.
    #[error("Invalid SHA256 digest: expected 64 hex characters, got {len} in '{input}'")]
    Length {
        /// Number of characters found after stripping any `sha256:` prefix.
        len: usize,
        /// The rejected input.
        input: String,
    },

    /// The hex portion contains characters outside `[0-9a-fA-F]`.
    #[error("Invalid SHA256 digest: contains non-hex characters in '{0}'")]
    NonHex(String),
}

/// A validated SHA256 digest (64 hex characters)
///
/// Validation happens at deserialization time, so a descriptor carrying a
/// truncated or padded checksum never loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new `Sha256Digest`, validating the input.
    ///
    /// Accepts strings with or without a `sha256:` prefix. The stored form is
    /// lowercase without the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] if the hex portion is not exactly 64 ASCII hex
    /// characters.
    pub fn new(s: impl Into<String>) -> Result<Self, DigestError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(DigestError::Length {
                len: hex.len(),
                input: s.clone(),
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NonHex(s.clone()));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Digest of an in-memory buffer.
    pub fn compute(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Digest of everything `reader` yields, read in 64 KiB blocks.
    ///
    /// # Errors
    ///
    /// Propagates any read error.
    pub fn compute_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 65536];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Digest of a file on disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or read.
    pub fn compute_file(path: &std::path::Path) -> std::io::Result<Self> {
        Self::compute_reader(std::fs::File::open(path)?)
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for Sha256Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Sha256Digest {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KITCLI: &str = "228e9423813950beb149b8890f8bb9911424a1dd49664686948b340b50dc3a22";

    #[test]
    fn accepts_standard_digest() {
        let d = Sha256Digest::new(KITCLI).unwrap();
        assert_eq!(d.as_str(), KITCLI);
    }

    #[test]
    fn strips_prefix_and_lowercases() {
        let d = Sha256Digest::new(format!("sha256:{}", KITCLI.to_uppercase())).unwrap();
        assert_eq!(d.as_str(), KITCLI);
    }

    #[test]
    fn rejects_overlong_digest() {
        let err = Sha256Digest::new(format!("{KITCLI}ab")).unwrap_err();
        assert!(matches!(err, DigestError::Length { len: 66, .. }));
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "z".repeat(64);
        assert!(matches!(
            Sha256Digest::new(bad),
            Err(DigestError::NonHex(_))
        ));
    }

    #[test]
    fn compute_matches_known_vector() {
        // sha256("hello world")
        let d = Sha256Digest::compute(b"hello world");
        assert_eq!(
            d.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        let streamed = Sha256Digest::compute_reader(&b"hello world"[..]).unwrap();
        assert_eq!(d, streamed);
    }
}
