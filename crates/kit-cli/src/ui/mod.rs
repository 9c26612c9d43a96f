//! Terminal output for the `kit` binary.
//!
//! - [`theme`] - Colors, icons and size formatting
//! - [`output`] - The [`Output`] handle commands print through; it also
//!   implements [`kit_core::Reporter`] so the install flow can report progress

pub mod output;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
