//! Core library for kit.
//!
//! A [`PackageDescriptor`] declares one prebuilt artifact, the checksum it
//! must match and the platform it may be installed on. The install flow in
//! [`flow`] drives it against a [`PlatformRuntime`], which owns every side
//! effect: downloading, verifying, extracting and knowing where binaries go.

pub mod descriptor;
pub mod flow;
pub mod host;
pub mod io;
pub mod paths;
pub mod reporter;
pub mod runtime;

pub use descriptor::{DescriptorError, InstallError, PackageDescriptor, ResolvedArtifact};
pub use flow::{FlowError, InstallOutcome, install_formula};
pub use host::{ConfigError, HostConfig, HostRuntime};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};
pub use runtime::PlatformRuntime;

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("kit-core/", env!("CARGO_PKG_VERSION"));
