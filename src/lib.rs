pub mod app;
pub mod browser;
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod logging;
pub mod notification;
pub mod state;
pub mod storage;
pub use error::{AppError, AppResult};

use std::process::ExitCode;

use clap::Parser;

/// Entrypoint used by the `folio` binary.
pub fn run() -> ExitCode {
    logging::init();
    let args = cli::CliArgs::parse();
    tracing::debug!(?args, "starting folio");
    cli::run(args)
}
