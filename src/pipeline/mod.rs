//! Generation pipeline stages.
//!
//! Each stage asks the text-generation service for one kind of artifact
//! and, where the answer is structured, owns the fallback for an unusable
//! answer. Persistence belongs to the orchestrator, not to the stages.

pub mod generator;
pub mod impact;
pub mod model;
pub mod planner;
pub mod synth;

use std::fmt;

pub use model::Model;

/// Language and framework a project is generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    /// Target language, lowercase.
    pub language: String,
    /// Target framework, lowercase; empty when none was requested.
    pub framework: String,
}

impl Stack {
    /// Creates a stack, normalizing both parts to trimmed lowercase.
    #[must_use]
    pub fn new(language: &str, framework: &str) -> Self {
        Self {
            language: language.trim().to_lowercase(),
            framework: framework.trim().to_lowercase(),
        }
    }

    /// Constraint paragraph embedded in every generation prompt.
    #[must_use]
    pub fn constraints(&self) -> String {
        let framework = if self.framework.is_empty() {
            "no particular framework (use the language's standard library and conventions)"
                .to_string()
        } else {
            self.framework.clone()
        };
        format!(
            "STACK CONSTRAINTS (mandatory):\n\
             - Language: {language}\n\
             - Framework: {framework}\n\
             - Use ONLY this language and framework, with their standard directory layout and file extensions.\n\
             - Do NOT switch to, mix in, or suggest any other language or framework.",
            language = self.language,
        )
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.framework.is_empty() {
            write!(f, "{}", self.language)
        } else {
            write!(f, "{}/{}", self.language, self.framework)
        }
    }
}

/// Normalizes a model-supplied file path into a project-relative one.
///
/// A leading `/` is stripped. Paths with backslashes, empty segments or
/// `.`/`..` segments cannot name a file inside the project and yield `None`.
#[must_use]
pub fn relative_path(raw: &str) -> Option<String> {
    let path = raw.trim().trim_start_matches('/');
    let valid = !path.is_empty()
        && !path.contains('\\')
        && path.split('/').all(|segment| !matches!(segment, "" | "." | ".."));
    valid.then(|| path.to_string())
}
