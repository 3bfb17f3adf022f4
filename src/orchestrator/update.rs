//! Update flow: change request against an existing project.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::{InvocationRequest, ProjectOrchestrator, UpdatedProject};
use crate::blocks::format_file_blocks;
use crate::error::{FileFailure, PipelineError};
use crate::pipeline::generator::{self, Regeneration};
use crate::pipeline::impact::{self, ImpactResolution};
use crate::pipeline::planner::PlannedFile;
use crate::pipeline::Stack;
use crate::ports::GenerationError;
use crate::snapshot::{summarize_content, ProjectSnapshot};

/// Regeneration outcome for one impacted path; `None` content means
/// nothing was stored for it.
type Regenerated = (usize, String, Option<Result<String, GenerationError>>);

/// Rejects a request that names a different stack than the project's.
///
/// Omitted or blank fields inherit the project's; comparison ignores case.
pub(super) fn guard_stack(
    snapshot: &ProjectSnapshot,
    request: &InvocationRequest,
) -> Result<Stack, PipelineError> {
    let existing = Stack::new(&snapshot.language, &snapshot.framework);
    let language = super::non_blank(request.language.as_deref()).unwrap_or(&existing.language);
    let framework = super::non_blank(request.framework.as_deref()).unwrap_or(&existing.framework);
    let requested = Stack::new(language, framework);

    if requested == existing {
        Ok(existing)
    } else {
        Err(PipelineError::StackMismatch {
            project_id: snapshot.project_id.clone(),
            existing: existing.to_string(),
            requested: requested.to_string(),
        })
    }
}

pub(super) async fn run(
    orchestrator: &ProjectOrchestrator<'_>,
    request: &InvocationRequest,
    project_id: &str,
    change_request: &str,
    mut snapshot: ProjectSnapshot,
) -> Result<UpdatedProject, PipelineError> {
    let stack = guard_stack(&snapshot, request)?;
    let settings = orchestrator.settings;
    let store = orchestrator.store();
    let model = orchestrator.model();
    info!(project_id, stack = %stack, files = snapshot.files.len(), "Updating project");

    let record_id = orchestrator.ctx.id_gen.generate_id();
    let requirement_key = store.save_requirement(project_id, &record_id, change_request).await?;

    let change_spec =
        match impact::build_change_spec(&model, change_request, &snapshot, &stack).await {
            Ok(text) => text,
            Err(error) => {
                warn!(project_id, error = %error, "Change spec unavailable, using the request text");
                change_request.to_string()
            }
        };
    let resolution = impact::resolve_impact(&change_spec, &snapshot, settings.relevance_max_count);

    let (model, store, stack_ref, snapshot_ref) = (&model, &store, &stack, &snapshot);
    let change_spec_ref = change_spec.as_str();
    let mut regenerated: Vec<Regenerated> = stream::iter(resolution.impacted.iter().enumerate())
        .map(|(index, path)| async move {
            let Some(old_content) = store.load_file(project_id, path).await? else {
                warn!(project_id, path = %path, "No stored content for impacted file, skipping");
                return Ok((index, path.clone(), None));
            };
            let input = Regeneration {
                path,
                role: snapshot_ref.role_of(path),
                old_content: &old_content,
                change_spec: change_spec_ref,
                global_spec: &snapshot_ref.global_spec,
            };
            let result = generator::regenerate_file(model, input, stack_ref).await;
            Ok::<_, PipelineError>((index, path.clone(), Some(result)))
        })
        .buffer_unordered(settings.max_concurrency)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;
    regenerated.sort_by_key(|(index, _, _)| *index);

    let mut updated = Vec::new();
    let mut failures = Vec::new();
    for (_, path, outcome) in regenerated {
        match outcome {
            Some(Ok(content)) => updated.push((path, content)),
            Some(Err(error)) => failures.push(FileFailure { path, error }),
            None => {}
        }
    }
    check_failures(failures, &resolution, snapshot_ref)?;
    store.save_files(project_id, &updated).await?;

    let new_file_spec = format!(
        "{}\n\nCHANGE SPECIFICATION:\n{change_spec}",
        snapshot_ref.global_spec
    );
    let new_file_spec = new_file_spec.as_str();
    let mut generated = stream::iter(resolution.new_files.iter().enumerate())
        .map(|(index, file)| async move {
            (index, generator::generate_file(model, new_file_spec, file, stack_ref).await)
        })
        .buffer_unordered(settings.max_concurrency)
        .collect::<Vec<_>>()
        .await;
    generated.sort_by_key(|(index, _)| *index);

    let mut created = Vec::new();
    let mut failures = Vec::new();
    for (index, result) in generated {
        let file = &resolution.new_files[index];
        match result {
            Ok(content) => created.push((file.clone(), content)),
            Err(error) => failures.push(FileFailure { path: file.path.clone(), error }),
        }
    }
    check_failures(failures, &resolution, snapshot_ref)?;
    let created_contents: Vec<(String, String)> =
        created.iter().map(|(file, content)| (file.path.clone(), content.clone())).collect();
    store.save_files(project_id, &created_contents).await?;

    if updated.is_empty() && created.is_empty() {
        return Err(PipelineError::NothingUpdated { change_spec });
    }

    for (path, content) in &updated {
        let role = snapshot.role_of(path).to_string();
        snapshot.upsert_file(path, &role, summarize_content(content));
    }
    for (file, content) in &created {
        snapshot.upsert_file(&file.path, &file.role, summarize_content(content));
    }
    snapshot.last_change_spec = Some(change_spec);
    snapshot.last_requirement_key = Some(requirement_key);
    snapshot.updated_at = Some(orchestrator.ctx.clock.now());
    store.save_snapshot(&snapshot).await?;
    info!(
        project_id,
        updated = updated.len(),
        created = created.len(),
        "Project updated, snapshot committed"
    );

    let response = format_file_blocks(
        updated.iter().chain(&created_contents).map(|(p, c)| (p.as_str(), c.as_str())),
    );
    Ok(UpdatedProject {
        project_id: project_id.to_string(),
        created: false,
        updated_files: updated.into_iter().map(|(path, _)| path).collect(),
        new_files: created_contents.into_iter().map(|(path, _)| path).collect(),
        response,
        impact_info: resolution,
    })
}

/// Aborts the update when any file failed, reporting the full change plan.
fn check_failures(
    failures: Vec<FileFailure>,
    resolution: &ImpactResolution,
    snapshot: &ProjectSnapshot,
) -> Result<(), PipelineError> {
    if failures.is_empty() {
        return Ok(());
    }
    let plan: Vec<PlannedFile> = resolution
        .impacted
        .iter()
        .map(|path| PlannedFile::new(path, snapshot.role_of(path)))
        .chain(resolution.new_files.iter().cloned())
        .collect();
    Err(PipelineError::PartialGeneration { failures, total: plan.len(), plan })
}
