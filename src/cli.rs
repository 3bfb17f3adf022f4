//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for `quill`.
#[derive(Debug, Parser)]
#[command(name = "quill", version, about = "Generate and evolve multi-file projects from requirements")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a project from a requirement, or update it with a change request.
    Invoke(InvokeArgs),
    /// Print a project's stored snapshot.
    Show {
        /// Project identifier.
        #[arg(long)]
        project: String,
        /// Object store directory (overrides `QUILL_STORE_DIR`).
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

/// Arguments of `quill invoke`.
#[derive(Debug, Args)]
pub struct InvokeArgs {
    /// Project identifier.
    #[arg(long)]
    pub project: String,
    /// Target language (defaults to the project's, or python for new projects).
    #[arg(long)]
    pub language: Option<String>,
    /// Target framework.
    #[arg(long)]
    pub framework: Option<String>,
    /// Requirement or change request text.
    #[arg(long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    pub prompt: Option<String>,
    /// File holding the requirement or change request.
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,
    /// Object store directory (overrides `QUILL_STORE_DIR`).
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Serve generation, ids and time from a recorded cassette.
    #[arg(long)]
    pub replay: Option<PathBuf>,
}
