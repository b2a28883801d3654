//! protounify build step
//!
//! Loads `protounify.toml` from the working directory (or a parent), then
//! rewrites, compiles and aggregates the configured upstream schema trees.
//! Takes no arguments; log verbosity follows `RUST_LOG`.

use anyhow::Result;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

fn main() -> ExitCode {
    init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let project_dir = std::env::current_dir()?;
    commands::build::run(commands::build::BuildArgs {
        project_dir: Some(project_dir),
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
