//! Project orchestration: one invocation, one flow, one snapshot commit.
//!
//! An invocation whose project has no snapshot (or a snapshot without
//! files) runs the create flow; anything else runs the update flow. Both
//! flows write the snapshot last, so a failure anywhere before that leaves
//! the previously committed state untouched.

mod create;
mod update;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::error::PipelineError;
use crate::pipeline::impact::ImpactResolution;
use crate::pipeline::planner::PlannedFile;
use crate::pipeline::Model;
use crate::store::{check_project_id, ProjectStore};

/// Project used when a request names none.
pub const DEFAULT_PROJECT_ID: &str = "default-project";

/// Language of a new project when a request names none.
pub const DEFAULT_LANGUAGE: &str = "python";

/// An invocation as received from the outside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    /// Target project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Requested language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Requested framework.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    /// Requirement or change text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Alternative name for `prompt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
    /// Alternative name for `prompt`, usual for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_request: Option<String>,
}

impl InvocationRequest {
    /// The target project, defaulting to [`DEFAULT_PROJECT_ID`].
    #[must_use]
    pub fn project_id(&self) -> &str {
        non_blank(self.project_id.as_deref()).unwrap_or(DEFAULT_PROJECT_ID)
    }

    /// The first non-blank of `prompt`, `requirement` and `changeRequest`.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        [&self.prompt, &self.requirement, &self.change_request]
            .into_iter()
            .find_map(|field| non_blank(field.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Result of a create flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProject {
    /// Project identifier.
    pub project_id: String,
    /// Always `true`.
    pub created: bool,
    /// Number of generated files.
    pub file_count: usize,
    /// Key of the requirement's audit record.
    pub requirement_key: String,
    /// Every generated file as delimited blocks.
    pub response: String,
}

/// Result of an update flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedProject {
    /// Project identifier.
    pub project_id: String,
    /// Always `false`.
    pub created: bool,
    /// Regenerated paths.
    pub updated_files: Vec<String>,
    /// Newly created paths.
    pub new_files: Vec<String>,
    /// Every written file as delimited blocks.
    pub response: String,
    /// How the impacted set was chosen.
    pub impact_info: ImpactResolution,
}

/// A file that failed to generate, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    /// Target path.
    pub path: String,
    /// Failure description.
    pub error: String,
}

/// A failed invocation with whatever context helps diagnose it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    /// Human-readable error.
    pub error: String,
    /// Project identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Unusable model answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    /// Plan being executed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlannedFile>>,
    /// Files that failed to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_files: Option<Vec<FailedFile>>,
    /// Change specification that led nowhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_spec: Option<String>,
}

impl Failure {
    /// Converts a pipeline error, keeping its diagnostic payload.
    #[must_use]
    pub fn from_error(project_id: &str, err: &PipelineError) -> Self {
        let mut failure = Self {
            error: err.to_string(),
            project_id: Some(project_id.to_string()),
            raw_response: None,
            plan: None,
            failed_files: None,
            change_spec: None,
        };
        match err {
            PipelineError::EmptyPlan { raw_response, .. } => {
                failure.raw_response = Some(raw_response.clone());
            }
            PipelineError::PartialGeneration { failures, plan, .. } => {
                failure.plan = Some(plan.clone());
                failure.failed_files = Some(
                    failures
                        .iter()
                        .map(|f| FailedFile { path: f.path.clone(), error: f.error.to_string() })
                        .collect(),
                );
            }
            PipelineError::NothingUpdated { change_spec } => {
                failure.change_spec = Some(change_spec.clone());
            }
            _ => {}
        }
        failure
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InvocationResponse {
    /// A new project was generated.
    Created(CreatedProject),
    /// An existing project was changed.
    Updated(UpdatedProject),
    /// Nothing was committed.
    Failed(Failure),
}

impl InvocationResponse {
    /// Whether the invocation failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Runs create and update flows against one service context.
pub struct ProjectOrchestrator<'a> {
    ctx: &'a ServiceContext,
    settings: &'a Settings,
}

impl<'a> ProjectOrchestrator<'a> {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, settings: &'a Settings) -> Self {
        Self { ctx, settings }
    }

    /// Runs one invocation. Never fails: errors become [`Failure`] responses.
    pub async fn invoke(&self, request: &InvocationRequest) -> InvocationResponse {
        let project_id = request.project_id();
        match self.run(request, project_id).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_validation() {
                    warn!(project_id, error = %err, "Invocation rejected");
                } else {
                    error!(project_id, error = %err, "Invocation failed");
                }
                InvocationResponse::Failed(Failure::from_error(project_id, &err))
            }
        }
    }

    async fn run(
        &self,
        request: &InvocationRequest,
        project_id: &str,
    ) -> Result<InvocationResponse, PipelineError> {
        check_project_id(project_id)?;
        let text = request.text().ok_or(PipelineError::MissingRequirement)?;
        let snapshot = self.store().load_snapshot(project_id).await?;

        match snapshot {
            Some(snapshot) if !snapshot.is_empty() => {
                info!(project_id, files = snapshot.files.len(), "Snapshot found, running update");
                update::run(self, request, project_id, text, snapshot)
                    .await
                    .map(InvocationResponse::Updated)
            }
            existing => {
                info!(project_id, "No usable snapshot, running create");
                let stack = create::requested_stack(request, existing.as_ref());
                create::run(self, project_id, text, &stack).await.map(InvocationResponse::Created)
            }
        }
    }

    fn store(&self) -> ProjectStore<'a> {
        ProjectStore::new(
            self.ctx.objects.as_ref(),
            &self.settings.key_prefix,
            self.settings.store_timeout,
        )
    }

    fn model(&self) -> Model<'a> {
        Model::new(self.ctx.llm.as_ref(), self.settings)
    }
}
