//! kit - install prebuilt CLI tools

use std::process::ExitCode;

use clap::Parser;
use kit_core::FlowError;
use tracing_subscriber::EnvFilter;

use kit_cli::cmd;
use kit_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Install { formula, bin_dir } => {
            cmd::install::install(&formula, bin_dir, dry_run, quiet).await
        }
        Commands::Check { formula } => cmd::check::check(&formula, quiet),
        Commands::Resolve { formula } => cmd::resolve::resolve(&formula),
        Commands::Hash { files } => cmd::hash::hash(&files),
        Commands::Bump {
            formula,
            version,
            sha256,
        } => cmd::bump::bump(&formula, &version, &sha256, dry_run, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(FlowError::UnsupportedPlatform { .. }) = e.downcast_ref::<FlowError>() {
                eprintln!("Hardware not supported");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
