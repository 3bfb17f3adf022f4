//! `quill invoke` command.

use std::fs;

use crate::cli::InvokeArgs;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::orchestrator::{InvocationRequest, InvocationResponse, ProjectOrchestrator};

/// Execute the `invoke` command.
///
/// Prints the invocation response as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error string if the prompt file cannot be read, or the
/// invocation failed (after its response has been printed).
pub fn run(ctx: &ServiceContext, settings: &Settings, args: &InvokeArgs) -> Result<(), String> {
    let request = build_request(args)?;
    let orchestrator = ProjectOrchestrator::new(ctx, settings);
    let response = super::runtime()?.block_on(orchestrator.invoke(&request));

    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| format!("Failed to serialize response: {e}"))?;
    println!("{json}");

    match response {
        InvocationResponse::Failed(failure) => Err(failure.error),
        InvocationResponse::Created(_) | InvocationResponse::Updated(_) => Ok(()),
    }
}

fn build_request(args: &InvokeArgs) -> Result<InvocationRequest, String> {
    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(prompt), _) => Some(prompt.clone()),
        (None, Some(path)) => Some(
            fs::read_to_string(path)
                .map_err(|e| format!("Failed to read prompt file {}: {e}", path.display()))?,
        ),
        (None, None) => None,
    };

    Ok(InvocationRequest {
        project_id: Some(args.project.clone()),
        language: args.language.clone(),
        framework: args.framework.clone(),
        prompt,
        ..InvocationRequest::default()
    })
}
