//! File planning: global spec to an ordered list of files to generate.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{relative_path, Model, Stack};
use crate::fallback::{parse_or_fallback, Parsed};
use crate::snapshot::DEFAULT_ROLE;

const PLAN_SYSTEM: &str = "You are a senior software architect. You design the file layout of \
a project for a fixed technology stack. Answer with JSON only.";

/// Default file layouts per `(language, framework)`.
const SKELETONS: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "typescript",
        "nestjs",
        &[
            ("src/main.ts", "Application bootstrap"),
            ("src/app.module.ts", "Root module wiring controllers and providers"),
            ("src/app.controller.ts", "HTTP controller exposing the API endpoints"),
            ("src/app.service.ts", "Service implementing the business logic"),
        ],
    ),
    (
        "typescript",
        "express",
        &[
            ("package.json", "Package manifest and scripts"),
            ("tsconfig.json", "TypeScript compiler configuration"),
            ("src/index.ts", "Server entry point"),
            ("src/app.ts", "Express application setup"),
            ("src/routes/index.ts", "Route handlers"),
        ],
    ),
    (
        "javascript",
        "express",
        &[
            ("package.json", "Package manifest and scripts"),
            ("src/index.js", "Server entry point"),
            ("src/app.js", "Express application setup"),
            ("src/routes/index.js", "Route handlers"),
        ],
    ),
    (
        "python",
        "fastapi",
        &[
            ("requirements.txt", "Python dependencies"),
            ("app/main.py", "FastAPI application and startup"),
            ("app/models.py", "Data models and schemas"),
            ("app/routes.py", "API route handlers"),
        ],
    ),
    (
        "python",
        "flask",
        &[
            ("requirements.txt", "Python dependencies"),
            ("app.py", "Flask application entry point"),
            ("models.py", "Data models"),
            ("routes.py", "Route handlers"),
        ],
    ),
    (
        "rust",
        "axum",
        &[
            ("Cargo.toml", "Crate manifest"),
            ("src/main.rs", "Server entry point and router"),
            ("src/routes.rs", "Route handlers"),
            ("src/models.rs", "Data models"),
        ],
    ),
];

/// One file to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFile {
    /// Project-relative path.
    pub path: String,
    /// What the file is for.
    pub role: String,
}

impl PlannedFile {
    /// Creates a planned file.
    #[must_use]
    pub fn new(path: &str, role: &str) -> Self {
        Self { path: path.to_string(), role: role.to_string() }
    }
}

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    /// Parsed from the model's answer.
    Model,
    /// The model's answer was unusable; the stack skeleton was used.
    Skeleton,
    /// The model's answer was unusable and no skeleton is registered.
    Empty,
}

/// An ordered file plan.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePlan {
    /// Files in generation order.
    pub files: Vec<PlannedFile>,
    /// Origin of `files`.
    pub source: PlanSource,
    /// The model's planning answer, kept for diagnostics.
    pub raw_response: String,
}

/// Plan entries as models write them: bare paths or `{path, role}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Path(String),
    Described {
        path: String,
        #[serde(default)]
        role: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlan {
    List(Vec<RawEntry>),
    Wrapped { files: Vec<RawEntry> },
}

/// Asks the model for a plan, falling back to the stack skeleton.
///
/// A failed planning call is handled like an unusable answer.
pub async fn plan_files(model: &Model<'_>, global_spec: &str, stack: &Stack) -> FilePlan {
    let prompt = plan_prompt(global_spec, stack);
    let raw_response = match model.ask("plan", PLAN_SYSTEM, prompt, model.settings().tokens.plan).await
    {
        Ok(text) => text,
        Err(error) => {
            warn!(error = %error, "Planning call failed, using skeleton plan");
            String::new()
        }
    };
    let plan = parse_plan(&raw_response, stack);
    info!(source = ?plan.source, files = plan.files.len(), stack = %stack, "File plan ready");
    plan
}

/// Parses a planning answer; unusable answers fall back to the skeleton.
#[must_use]
pub fn parse_plan(raw_response: &str, stack: &Stack) -> FilePlan {
    let parsed = parse_or_fallback(raw_response, validate_plan, |_| skeleton_plan(stack));

    let source = match &parsed {
        Parsed::Structured(_) => PlanSource::Model,
        Parsed::Fallback { value, reason } => {
            warn!(reason = %reason, stack = %stack, "Plan unusable, falling back to skeleton");
            if value.is_empty() {
                PlanSource::Empty
            } else {
                PlanSource::Skeleton
            }
        }
    };

    FilePlan { files: parsed.into_value(), source, raw_response: raw_response.to_string() }
}

/// The registered skeleton for `stack`, or an empty list.
#[must_use]
pub fn skeleton_plan(stack: &Stack) -> Vec<PlannedFile> {
    SKELETONS
        .iter()
        .find(|(language, framework, _)| *language == stack.language && *framework == stack.framework)
        .map(|(_, _, files)| files.iter().map(|(path, role)| PlannedFile::new(path, role)).collect())
        .unwrap_or_default()
}

fn validate_plan(raw: RawPlan) -> Result<Vec<PlannedFile>, String> {
    let entries = match raw {
        RawPlan::List(entries) | RawPlan::Wrapped { files: entries } => entries,
    };

    let mut seen = HashSet::new();
    let files: Vec<PlannedFile> = entries
        .into_iter()
        .filter_map(|entry| {
            let (path, role) = match entry {
                RawEntry::Path(path) => (path, String::new()),
                RawEntry::Described { path, role } => (path, role),
            };
            if path.trim().is_empty() {
                return None;
            }
            let Some(path) = relative_path(&path) else {
                warn!(path = %path, "Plan entry escapes the project, dropping it");
                return None;
            };
            if !seen.insert(path.clone()) {
                return None;
            }
            let role = match role.trim() {
                "" => DEFAULT_ROLE.to_string(),
                r => r.to_string(),
            };
            Some(PlannedFile { path, role })
        })
        .collect();

    if files.is_empty() {
        return Err("plan names no files".to_string());
    }
    Ok(files)
}

fn plan_prompt(global_spec: &str, stack: &Stack) -> String {
    format!(
        "{constraints}\n\n\
         Design the complete file list for this project. Answer with a JSON array of objects \
         {{\"path\": \"relative/path.ext\", \"role\": \"one-line purpose\"}} in the order the files \
         should be written. Include configuration and entry-point files the stack requires. \
         No prose, no markdown.\n\n\
         GLOBAL SPECIFICATION:\n{global_spec}",
        constraints = stack.constraints(),
    )
}
