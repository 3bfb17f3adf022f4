//! Project snapshot: the persisted metadata of one project.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role recorded for a path that reached the snapshot without one.
pub const DEFAULT_ROLE: &str = "Project source file";

const SUMMARY_MAX_LINES: usize = 10;
const SUMMARY_MAX_CHARS: usize = 350;

/// Metadata describing a project's files and global specification.
///
/// File contents are never embedded; they live under per-path keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    /// Stable project identifier.
    pub project_id: String,
    /// Target language, lowercase.
    pub language: String,
    /// Target framework, lowercase (may be empty).
    #[serde(default)]
    pub framework: String,
    /// Merged global specification.
    #[serde(default)]
    pub global_spec: String,
    /// Known file paths, unique, in insertion order.
    #[serde(default)]
    pub files: Vec<String>,
    /// Path to purpose.
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
    /// Path to a short excerpt of the current content.
    #[serde(default)]
    pub summaries: BTreeMap<String, String>,
    /// Key of the audit record of the last triggering request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_requirement_key: Option<String>,
    /// Change specification of the last update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_spec: Option<String>,
    /// Time of the last commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProjectSnapshot {
    /// Creates an empty snapshot for a new project.
    #[must_use]
    pub fn new(project_id: &str, language: &str, framework: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            language: language.to_string(),
            framework: framework.to_string(),
            ..Self::default()
        }
    }

    /// Whether the project has no files yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether `path` is a known file.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }

    /// Role of `path`, or the default role.
    #[must_use]
    pub fn role_of(&self, path: &str) -> &str {
        self.roles.get(path).map_or(DEFAULT_ROLE, String::as_str)
    }

    /// Records a file, keeping `files` unique and in insertion order.
    pub fn upsert_file(&mut self, path: &str, role: &str, summary: String) {
        if !self.contains(path) {
            self.files.push(path.to_string());
        }
        self.roles.insert(path.to_string(), role.to_string());
        self.summaries.insert(path.to_string(), summary);
    }

    /// `(path, summary)` pairs in file order.
    #[must_use]
    pub fn summaries_in_order(&self) -> Vec<(&str, &str)> {
        self.files
            .iter()
            .map(|p| (p.as_str(), self.summaries.get(p).map_or("", String::as_str)))
            .collect()
    }

    /// Brings `roles` and `summaries` in line with `files`.
    ///
    /// Every known path gets a role and a summary; entries for unknown
    /// paths are dropped. Called before every save.
    pub fn reconcile(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.files.retain(|f| seen.insert(f.clone()));

        let files = &self.files;
        self.roles.retain(|path, _| files.contains(path));
        self.summaries.retain(|path, _| files.contains(path));
        for path in files {
            self.roles.entry(path.clone()).or_insert_with(|| DEFAULT_ROLE.to_string());
            self.summaries.entry(path.clone()).or_default();
        }
    }
}

/// Derives a short summary: the first ten non-blank lines, cut at 350
/// characters with `...` appended when cut.
#[must_use]
pub fn summarize_content(content: &str) -> String {
    let snippet = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SUMMARY_MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    match snippet.char_indices().nth(SUMMARY_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &snippet[..cut]),
        None => snippet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_keeps_first_ten_non_blank_lines() {
        let content = (1..=15).map(|i| format!("line {i}\n\n")).collect::<String>();
        let summary = summarize_content(&content);
        assert_eq!(summary.lines().count(), 10);
        assert!(summary.starts_with("line 1\nline 2"));
        assert!(summary.ends_with("line 10"));
    }

    #[test]
    fn long_summary_is_cut_with_ellipsis() {
        let summary = summarize_content(&"é".repeat(500));
        assert_eq!(summary.chars().count(), 353);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn reconcile_fills_gaps_and_drops_strays() {
        let mut snapshot = ProjectSnapshot::new("p", "typescript", "nestjs");
        snapshot.files = vec!["a.ts".into(), "b.ts".into(), "a.ts".into()];
        snapshot.roles.insert("a.ts".into(), "entry".into());
        snapshot.roles.insert("gone.ts".into(), "stale".into());
        snapshot.summaries.insert("b.ts".into(), "b".into());

        snapshot.reconcile();

        assert_eq!(snapshot.files, vec!["a.ts", "b.ts"]);
        assert_eq!(snapshot.role_of("a.ts"), "entry");
        assert_eq!(snapshot.role_of("b.ts"), DEFAULT_ROLE);
        assert!(!snapshot.roles.contains_key("gone.ts"));
        assert_eq!(snapshot.summaries.get("a.ts").map(String::as_str), Some(""));
    }

    #[test]
    fn upsert_keeps_insertion_order() {
        let mut snapshot = ProjectSnapshot::new("p", "python", "");
        snapshot.upsert_file("b.py", "b", "sb".into());
        snapshot.upsert_file("a.py", "a", "sa".into());
        snapshot.upsert_file("b.py", "b2", "sb2".into());
        assert_eq!(snapshot.files, vec!["b.py", "a.py"]);
        assert_eq!(snapshot.summaries_in_order(), vec![("b.py", "sb2"), ("a.py", "sa")]);
    }

    #[test]
    fn serializes_as_camel_case() {
        let mut snapshot = ProjectSnapshot::new("p1", "typescript", "nestjs");
        snapshot.global_spec = "{}".into();
        snapshot.last_requirement_key = Some("projects/p1/requirements/r.txt".into());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["projectId"], "p1");
        assert_eq!(json["globalSpec"], "{}");
        assert_eq!(json["lastRequirementKey"], "projects/p1/requirements/r.txt");
        assert!(json.get("lastChangeSpec").is_none());
    }
}
