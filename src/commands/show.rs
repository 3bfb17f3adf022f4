//! `quill show` command.

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::store::{check_project_id, ProjectStore};

/// Execute the `show` command: pretty-prints the project's snapshot.
///
/// # Errors
///
/// Returns an error string if the project has no snapshot or it cannot be
/// read.
pub fn run(ctx: &ServiceContext, settings: &Settings, project_id: &str) -> Result<(), String> {
    check_project_id(project_id).map_err(|e| e.to_string())?;
    let store =
        ProjectStore::new(ctx.objects.as_ref(), &settings.key_prefix, settings.store_timeout);
    let snapshot = super::runtime()?
        .block_on(store.load_snapshot(project_id))
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("No snapshot found for project {project_id}"))?;

    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| format!("Failed to serialize snapshot: {e}"))?;
    println!("{json}");
    Ok(())
}
