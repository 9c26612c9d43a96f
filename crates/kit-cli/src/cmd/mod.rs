//! Subcommand implementations

pub mod bump;
pub mod check;
pub mod hash;
pub mod install;
pub mod resolve;
