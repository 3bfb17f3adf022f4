//! Command dispatch and handlers.

pub mod invoke;
pub mod show;

use std::env;
use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;

use crate::adapters::live::FsObjectStore;
use crate::cli::Command;
use crate::config::Settings;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// When `QUILL_RECORD` is set to a file path, generation, id and clock
/// interactions are recorded to a cassette at that path.
///
/// # Errors
///
/// Returns an error string if settings are invalid or the handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let mut settings = Settings::from_env()?;
    let (store, replay) = match command {
        Command::Invoke(args) => (args.store.as_deref(), args.replay.as_deref()),
        Command::Show { store, .. } => (store.as_deref(), None),
    };
    if let Some(store) = store {
        settings.store_root = store.to_path_buf();
    }

    let ctx = build_context(&settings, replay)?;
    let result = match command {
        Command::Invoke(args) => invoke::run(&ctx, &settings, args),
        Command::Show { project, .. } => show::run(&ctx, &settings, project),
    };

    // Finish recording after the command completes, even on error.
    if let Some(path) = ctx.finish_recording()? {
        eprintln!("Recording saved to: {}", path.display());
    }

    result
}

fn build_context(settings: &Settings, replay: Option<&Path>) -> Result<ServiceContext, String> {
    if let Some(cassette) = replay {
        let objects = Box::new(FsObjectStore::new(&settings.store_root));
        return ServiceContext::replaying(cassette, objects);
    }
    match env::var("QUILL_RECORD") {
        Ok(path) if !path.trim().is_empty() => {
            Ok(ServiceContext::recording(settings, &PathBuf::from(path)))
        }
        _ => Ok(ServiceContext::live(settings)),
    }
}

/// Builds the runtime that drives one command.
pub(crate) fn runtime() -> Result<Runtime, String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))
}
