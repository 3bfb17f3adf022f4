//! Core library for the `quill` CLI: requirement-driven generation and
//! incremental update of multi-file projects.

pub mod adapters;
pub mod blocks;
pub mod cassette;
pub mod chunk;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod relevance;
pub mod snapshot;
pub mod store;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
/// Help and version requests are printed and count as success.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return err.print().map_err(|e| format!("Failed to print help: {e}"));
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command)
}
