//! kit - install prebuilt CLI tools from checksummed descriptors
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! A descriptor (`formulae/*.toml`) names one release artifact, the SHA-256
//! it must hash to, the platforms it runs on and the files copied out of it.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.kit/
//! ├── bin/     # Installed executables (override with KIT_BIN_DIR)
//! ├── cache/   # Verified downloads, keyed by sha256
//! └── tmp/     # Per-install staging directories
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "kit")]
#[command(author, version, about = "kit - install prebuilt CLI tools from checksummed descriptors")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install the package described by a formula
    Install {
        /// Path to the formula TOML
        formula: PathBuf,
        /// Directory to place executables in
        #[arg(long, env = "KIT_BIN_DIR")]
        bin_dir: Option<PathBuf>,
    },
    /// Validate a formula
    Check {
        /// Path to the formula TOML
        formula: PathBuf,
    },
    /// Print the download URL and checksum a formula resolves to
    Resolve {
        /// Path to the formula TOML
        formula: PathBuf,
    },
    /// Compute SHA256 hash of a file (for formula authoring)
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Move a formula to a new release
    Bump {
        /// Path to the formula TOML
        formula: PathBuf,
        /// New version, e.g. v0.1.0
        #[arg(long)]
        version: String,
        /// SHA256 of the new release artifact
        #[arg(long)]
        sha256: String,
    },
}
