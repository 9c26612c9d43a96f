//! Plain data types shared by the descriptor loader, the installer and the CLI.
//!
//! Nothing in this crate performs I/O beyond hashing a caller-supplied reader.

pub mod arch;
pub mod hash;
pub mod template;
pub mod types;

// Re-exports
pub use arch::*;
pub use hash::*;
pub use template::{TemplateError, UrlTemplate};
pub use types::*;
