//! Archive extraction module
//!
//! Handles zip, tar, tar.gz and tar.zst archives as well as bare executables.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;
use zstd::stream::Decoder as ZstdDecoder;

use kit_schema::ArtifactFormat;

/// Errors raised while unpacking an artifact.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem failure while reading the archive or writing its contents.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive is corrupt or contains an entry that escapes the destination.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// Whether this is an executable
    pub is_executable: bool,
}

/// Unpack `archive_path` into `dest_dir` according to `format`.
///
/// A [`ArtifactFormat::Binary`] artifact is copied to `dest_dir/<binary_name>`.
///
/// # Errors
///
/// Returns `ExtractError::Archive` for corrupt archives or entries whose path
/// would land outside `dest_dir`, and `ExtractError::Io` otherwise.
pub fn extract(
    archive_path: &Path,
    format: ArtifactFormat,
    dest_dir: &Path,
    binary_name: &str,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    debug!("Extracting {} ({format}) into {}", archive_path.display(), dest_dir.display());

    match format {
        ArtifactFormat::Zip => extract_zip(archive_path, dest_dir),
        ArtifactFormat::TarGz => {
            let reader = BufReader::new(File::open(archive_path)?);
            extract_tar(flate2::read::GzDecoder::new(reader), dest_dir)
        }
        ArtifactFormat::TarZst => {
            let reader = BufReader::new(File::open(archive_path)?);
            extract_tar(ZstdDecoder::new(reader)?, dest_dir)
        }
        ArtifactFormat::Tar => extract_tar(BufReader::new(File::open(archive_path)?), dest_dir),
        ArtifactFormat::Binary => {
            fs::create_dir_all(dest_dir)?;
            let dest_path = dest_dir.join(binary_name);
            fs::copy(archive_path, &dest_path)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&dest_path, fs::Permissions::from_mode(0o755))?;
            }

            Ok(vec![ExtractedFile {
                relative_path: PathBuf::from(binary_name),
                absolute_path: dest_path,
                is_executable: true,
            }])
        }
    }
}

/// Reject absolute paths and `..` components (Zip Slip).
fn sanitize(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ExtractError::Archive(format!(
                    "Invalid path in archive: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(clean)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();

        // Links are never followed or recreated; kit only installs regular files.
        if entry_type.is_dir() || !(entry_type.is_file() || entry_type.is_contiguous()) {
            continue;
        }

        let relative_path = sanitize(&entry.path()?)?;
        if relative_path.as_os_str().is_empty() {
            continue;
        }
        let absolute_path = dest_dir.join(&relative_path);

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        entry.unpack(&absolute_path)?;

        let is_executable = entry
            .header()
            .mode()
            .is_ok_and(|m| m & 0o111 != 0);

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

/// Extract a zip archive
fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        let is_executable = if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o7777))?;
            mode & 0o111 != 0
        } else {
            false
        };
        #[cfg(not(unix))]
        let is_executable = false;

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}
