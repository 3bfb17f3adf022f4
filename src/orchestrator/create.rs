//! Create flow: requirement to a brand new project.

use futures::stream::{self, StreamExt};
use tracing::info;

use super::{CreatedProject, InvocationRequest, ProjectOrchestrator, DEFAULT_LANGUAGE};
use crate::blocks::format_file_blocks;
use crate::chunk::chunk_text;
use crate::error::{FileFailure, PipelineError};
use crate::pipeline::{generator, planner, synth, Stack};
use crate::snapshot::{summarize_content, ProjectSnapshot};

/// Stack for a new project: the request's, else a leftover empty
/// snapshot's, else the default language with no framework.
pub(super) fn requested_stack(
    request: &InvocationRequest,
    existing: Option<&ProjectSnapshot>,
) -> Stack {
    let language = pick(
        request.language.as_deref(),
        existing.map(|s| s.language.as_str()),
        DEFAULT_LANGUAGE,
    );
    let framework =
        pick(request.framework.as_deref(), existing.map(|s| s.framework.as_str()), "");
    Stack::new(&language, &framework)
}

fn pick(requested: Option<&str>, stored: Option<&str>, default: &str) -> String {
    [requested, stored]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

pub(super) async fn run(
    orchestrator: &ProjectOrchestrator<'_>,
    project_id: &str,
    requirement: &str,
    stack: &Stack,
) -> Result<CreatedProject, PipelineError> {
    let settings = orchestrator.settings;
    let store = orchestrator.store();
    let model = orchestrator.model();
    info!(project_id, stack = %stack, "Creating project");

    let record_id = orchestrator.ctx.id_gen.generate_id();
    let requirement_key = store.save_requirement(project_id, &record_id, requirement).await?;

    let chunks = chunk_text(requirement, settings.max_chunk_chars);
    info!(project_id, chunks = chunks.len(), chars = requirement.chars().count(), "Requirement chunked");

    let global_spec = synth::synthesize(&model, &chunks, stack).await?;

    let plan = planner::plan_files(&model, &global_spec, stack).await;
    if plan.files.is_empty() {
        return Err(PipelineError::EmptyPlan {
            stack: stack.to_string(),
            raw_response: plan.raw_response,
        });
    }

    let model = &model;
    let spec = global_spec.as_str();
    let mut results = stream::iter(plan.files.iter().enumerate())
        .map(|(index, file)| async move {
            (index, generator::generate_file(model, spec, file, stack).await)
        })
        .buffer_unordered(settings.max_concurrency)
        .collect::<Vec<_>>()
        .await;
    results.sort_by_key(|(index, _)| *index);

    let mut files = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (index, result) in results {
        let path = plan.files[index].path.clone();
        match result {
            Ok(content) => files.push((path, content)),
            Err(error) => failures.push(FileFailure { path, error }),
        }
    }
    if !failures.is_empty() {
        return Err(PipelineError::PartialGeneration {
            failures,
            total: plan.files.len(),
            plan: plan.files,
        });
    }

    let mut snapshot = ProjectSnapshot::new(project_id, &stack.language, &stack.framework);
    snapshot.global_spec = global_spec;
    for (planned, (_, content)) in plan.files.iter().zip(&files) {
        snapshot.upsert_file(&planned.path, &planned.role, summarize_content(content));
    }
    snapshot.last_requirement_key = Some(requirement_key.clone());
    snapshot.updated_at = Some(orchestrator.ctx.clock.now());

    store.save_files(project_id, &files).await?;
    store.save_snapshot(&snapshot).await?;
    info!(project_id, files = files.len(), "Project created, snapshot committed");

    Ok(CreatedProject {
        project_id: project_id.to_string(),
        created: true,
        file_count: files.len(),
        requirement_key,
        response: format_file_blocks(files.iter().map(|(p, c)| (p.as_str(), c.as_str()))),
    })
}
