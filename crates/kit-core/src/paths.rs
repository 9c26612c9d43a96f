use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Environment variable overriding the kit home directory.
pub const KIT_HOME_ENV: &str = "KIT_HOME";

/// Environment variable overriding the installation binary directory.
pub const KIT_BIN_DIR_ENV: &str = "KIT_BIN_DIR";

/// Environment variable overriding the detected host architecture.
pub const KIT_ARCH_ENV: &str = "KIT_ARCH";

/// Returns the kit home directory (`$KIT_HOME`, else `~/.kit`), or None if
/// the user's home cannot be resolved.
pub fn try_kit_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(KIT_HOME_ENV) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".kit"))
}

/// Binary installation target: <home>/bin
pub fn bin_path(home: &Path) -> PathBuf {
    home.join("bin")
}

/// Downloaded archives, keyed by checksum: <home>/cache
pub fn cache_path(home: &Path) -> PathBuf {
    home.join("cache")
}

/// Extraction staging area: <home>/tmp (same volume as bin, so renames stay atomic)
pub fn tmp_path(home: &Path) -> PathBuf {
    home.join("tmp")
}

/// Extract the filename from a URL.
///
/// # Example
///
/// ```
/// use kit_core::filename_from_url;
///
/// assert_eq!(filename_from_url("https://example.com/path/to/file.tar.gz"), "file.tar.gz");
/// assert_eq!(filename_from_url("https://example.com/a.zip?x=1"), "a.zip");
/// assert_eq!(filename_from_url(""), "");
/// ```
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/').next_back().unwrap_or("")
}
