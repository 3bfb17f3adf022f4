//! Change impact: which known files a change request touches and which
//! new files it introduces.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::planner::PlannedFile;
use super::{relative_path, Model, Stack};
use crate::fallback::{parse_or_fallback, strip_code_fences, Parsed};
use crate::ports::GenerationError;
use crate::relevance::relevant_files;
use crate::snapshot::ProjectSnapshot;

/// Role given to a declared new file that came without one.
pub const NEW_FILE_ROLE: &str = "New file introduced by a change request";

const CHANGE_SYSTEM: &str = "You are a senior software engineer maintaining an existing \
project. You analyse change requests and decide precisely which files they affect. Answer with \
JSON only.";

/// Outcome of impact resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactResolution {
    /// Known files to regenerate, in resolution order.
    pub impacted: Vec<String>,
    /// Files to create.
    pub new_files: Vec<PlannedFile>,
    /// Impacted paths named by the change spec that the project does not have.
    pub dropped: Vec<String>,
    /// Kind of change, as classified by the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_type: Option<String>,
    /// Free-form notes from the change spec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Whether relevance scoring picked `impacted`.
    pub used_fallback: bool,
    /// Why the structured change spec was not used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeSpecDoc {
    #[serde(default)]
    change_type: Option<String>,
    #[serde(default, alias = "files_to_update")]
    impacted_files: Vec<String>,
    #[serde(default, alias = "new_files")]
    new_files: Vec<NewFileEntry>,
    #[serde(default)]
    notes: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NewFileEntry {
    Path(String),
    Described {
        path: String,
        #[serde(default)]
        role: Option<String>,
    },
}

/// Asks the model for a change specification of `change_request`
/// against the project's known files.
///
/// # Errors
///
/// Returns the generation failure.
pub async fn build_change_spec(
    model: &Model<'_>,
    change_request: &str,
    snapshot: &ProjectSnapshot,
    stack: &Stack,
) -> Result<String, GenerationError> {
    let known = snapshot
        .summaries_in_order()
        .into_iter()
        .map(|(path, summary)| format!("- {path} [{}]: {summary}", snapshot.role_of(path)))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "{constraints}\n\n\
         GLOBAL SPECIFICATION:\n{global_spec}\n\n\
         KNOWN FILES:\n{known}\n\n\
         CHANGE REQUEST:\n{change_request}\n\n\
         Answer with a JSON object:\n\
         {{\"changeType\": \"feature|fix|refactor|other\",\n \
         \"impactedFiles\": [\"existing paths that must change\"],\n \
         \"newFiles\": [{{\"path\": \"new/path.ext\", \"role\": \"one-line purpose\"}}],\n \
         \"notes\": \"what changes in each file\"}}\n\
         Only list existing files from KNOWN FILES under impactedFiles.",
        constraints = stack.constraints(),
        global_spec = snapshot.global_spec,
    );

    let text =
        model.ask("change_spec", CHANGE_SYSTEM, prompt, model.settings().tokens.change_spec).await?;
    Ok(strip_code_fences(&text).to_string())
}

/// Resolves a change spec into impacted and new files.
///
/// Impacted paths are restricted to the snapshot's files. Relevance
/// scoring over the change spec text takes over when the text does not
/// parse, or when it names no known file and declares no new file.
#[must_use]
pub fn resolve_impact(
    change_spec: &str,
    snapshot: &ProjectSnapshot,
    max_count: usize,
) -> ImpactResolution {
    let parsed = parse_or_fallback(
        change_spec,
        |doc: ChangeSpecDoc| resolve_document(doc, snapshot),
        |_| ImpactResolution {
            impacted: relevant_files(change_spec, &snapshot.summaries_in_order(), max_count),
            used_fallback: true,
            ..ImpactResolution::default()
        },
    );

    let resolution = match parsed {
        Parsed::Structured(resolution) => resolution,
        Parsed::Fallback { mut value, reason } => {
            warn!(reason = %reason, picked = ?value.impacted, "Change spec unusable, scoring by relevance");
            value.fallback_reason = Some(reason);
            value
        }
    };
    info!(
        impacted = resolution.impacted.len(),
        new_files = resolution.new_files.len(),
        dropped = resolution.dropped.len(),
        "Impact resolved"
    );
    resolution
}

fn resolve_document(
    doc: ChangeSpecDoc,
    snapshot: &ProjectSnapshot,
) -> Result<ImpactResolution, String> {
    let mut new_files: Vec<PlannedFile> = Vec::new();
    let mut declared = HashSet::new();
    for entry in doc.new_files {
        let (raw, role) = match entry {
            NewFileEntry::Path(path) => (path, None),
            NewFileEntry::Described { path, role } => (path, role),
        };
        if raw.trim().is_empty() {
            continue;
        }
        let Some(path) = relative_path(&raw) else {
            warn!(path = %raw, "New file escapes the project, ignoring it");
            continue;
        };
        if snapshot.contains(&path) || !declared.insert(path.clone()) {
            continue;
        }
        let role = role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| NEW_FILE_ROLE.to_string());
        new_files.push(PlannedFile { path, role });
    }

    // A declared new file may also appear among the impacted paths; it is
    // created, not reported as dropped.
    let mut seen = HashSet::new();
    let mut impacted = Vec::new();
    let mut dropped = Vec::new();
    for raw in doc.impacted_files {
        let path = relative_path(&raw).unwrap_or_else(|| raw.trim().to_string());
        if path.is_empty() || declared.contains(&path) || !seen.insert(path.clone()) {
            continue;
        }
        if snapshot.contains(&path) {
            impacted.push(path);
        } else {
            dropped.push(path);
        }
    }

    // Declared new files alone are a usable answer: relevance scoring only
    // stands in when the spec yields neither impacted nor new files.
    if impacted.is_empty() && new_files.is_empty() {
        return Err(if dropped.is_empty() {
            "change spec names no files".to_string()
        } else {
            format!("change spec names only unknown files: {}", dropped.join(", "))
        });
    }

    let notes = doc.notes.and_then(|notes| match notes {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    });

    Ok(ImpactResolution {
        impacted,
        new_files,
        dropped,
        change_type: doc.change_type,
        notes,
        used_fallback: false,
        fallback_reason: None,
    })
}
