//! Pipeline error taxonomy.
//!
//! Missing objects and unparseable model output are not errors here: the
//! store reports absence as `None` and `fallback` supplies a defined value.
//! What remains either fails validation up front or has no fallback.

use thiserror::Error;

use crate::pipeline::planner::PlannedFile;
use crate::ports::{GenerationError, StoreError};

/// One file whose generation failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileFailure {
    /// Target path.
    pub path: String,
    /// What went wrong.
    pub error: GenerationError,
}

/// Errors that end an invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request carried no requirement or change text.
    #[error("Missing 'prompt', 'requirement' or 'changeRequest' in request")]
    MissingRequirement,

    /// The project identifier cannot name a store namespace.
    #[error("Invalid project id '{project_id}': {reason}")]
    InvalidProjectId {
        /// Identifier as requested.
        project_id: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// An update asked for a different stack than the project was created with.
    #[error(
        "Project {project_id} is {existing}; refusing to switch it to {requested} without a migration"
    )]
    StackMismatch {
        /// Project identifier.
        project_id: String,
        /// Stack recorded in the snapshot.
        existing: String,
        /// Stack named by the request.
        requested: String,
    },

    /// A generation call with no fallback failed.
    #[error("Text generation failed during {stage}: {source}")]
    Generation {
        /// Pipeline stage label.
        stage: String,
        /// Underlying failure.
        #[source]
        source: GenerationError,
    },

    /// The object store failed.
    #[error("Object store failure: {0}")]
    Store(#[from] StoreError),

    /// The stored snapshot exists but does not deserialize.
    #[error("Snapshot for project {project_id} is unreadable: {reason}")]
    CorruptSnapshot {
        /// Project identifier.
        project_id: String,
        /// Deserialization error.
        reason: String,
    },

    /// Neither the model nor the skeleton registry produced a plan.
    #[error("No files were planned for {stack}")]
    EmptyPlan {
        /// `language/framework`.
        stack: String,
        /// Unparsed planning response.
        raw_response: String,
    },

    /// At least one planned file could not be generated; nothing was committed.
    #[error("{} of {total} files failed to generate", failures.len())]
    PartialGeneration {
        /// Files that failed.
        failures: Vec<FileFailure>,
        /// Files that were attempted.
        total: usize,
        /// The plan being executed.
        plan: Vec<PlannedFile>,
    },

    /// The change request resolved to no file that could be updated or created.
    #[error("Change request did not update any file")]
    NothingUpdated {
        /// Change specification text.
        change_spec: String,
    },
}

impl PipelineError {
    /// Wraps a generation failure with the stage it happened in.
    pub fn generation(stage: impl Into<String>, source: GenerationError) -> Self {
        Self::Generation { stage: stage.into(), source }
    }

    /// Whether the request itself was at fault.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingRequirement | Self::InvalidProjectId { .. } | Self::StackMismatch { .. }
        )
    }
}
