//! Whole-file generation and regeneration.

use tracing::debug;

use super::planner::PlannedFile;
use super::{Model, Stack};
use crate::blocks::{marker, normalize_content, parse_file_blocks};
use crate::fallback::strip_code_fences;
use crate::ports::GenerationError;

const FILE_SYSTEM: &str = "You are a senior software engineer. You write complete, production \
quality source files. You never answer with a diff or a partial file.";

/// Inputs for regenerating one existing file.
#[derive(Debug, Clone, Copy)]
pub struct Regeneration<'a> {
    /// Project-relative path.
    pub path: &'a str,
    /// What the file is for.
    pub role: &'a str,
    /// Current full content.
    pub old_content: &'a str,
    /// Change specification of the update.
    pub change_spec: &'a str,
    /// Project global specification.
    pub global_spec: &'a str,
}

/// Generates the full content of a planned file.
///
/// # Errors
///
/// Returns the generation failure, or `EmptyResponse` when no content
/// could be extracted.
pub async fn generate_file(
    model: &Model<'_>,
    global_spec: &str,
    file: &PlannedFile,
    stack: &Stack,
) -> Result<String, GenerationError> {
    let label = format!("generate:{}", file.path);
    let prompt = format!(
        "{constraints}\n\n\
         GLOBAL SPECIFICATION:\n{global_spec}\n\n\
         Write the complete content of `{path}` (role: {role}).\n\
         Answer with exactly one block, starting with the line\n{marker}\n\
         followed by the full file content. No explanations.",
        constraints = stack.constraints(),
        path = file.path,
        role = file.role,
        marker = marker(&file.path),
    );

    let text = model.ask(&label, FILE_SYSTEM, prompt, model.settings().tokens.file).await?;
    let content = extract_file_content(&text, &file.path)?;
    debug!(path = %file.path, bytes = content.len(), "Generated file");
    Ok(content)
}

/// Regenerates an existing file under a change specification.
///
/// The answer is always a complete file.
///
/// # Errors
///
/// Returns the generation failure, or `EmptyResponse` when no content
/// could be extracted.
pub async fn regenerate_file(
    model: &Model<'_>,
    input: Regeneration<'_>,
    stack: &Stack,
) -> Result<String, GenerationError> {
    let label = format!("regenerate:{}", input.path);
    let prompt = format!(
        "{constraints}\n\n\
         GLOBAL SPECIFICATION:\n{global_spec}\n\n\
         CHANGE SPECIFICATION:\n{change_spec}\n\n\
         CURRENT CONTENT OF `{path}` (role: {role}):\n{old_content}\n\n\
         Apply the change to this file. Answer with the COMPLETE updated file, never a diff, \
         in exactly one block starting with the line\n{marker}",
        constraints = stack.constraints(),
        global_spec = input.global_spec,
        change_spec = input.change_spec,
        path = input.path,
        role = input.role,
        old_content = input.old_content,
        marker = marker(input.path),
    );

    let text = model.ask(&label, FILE_SYSTEM, prompt, model.settings().tokens.file).await?;
    let content = extract_file_content(&text, input.path)?;
    debug!(path = input.path, bytes = content.len(), "Regenerated file");
    Ok(content)
}

/// Picks a file's content out of a generation answer.
///
/// Uses the block for `path` if present, else the only block, else the
/// raw text without code fences. The result ends in exactly one newline.
///
/// # Errors
///
/// Returns `EmptyResponse` when the extracted content is blank.
pub fn extract_file_content(text: &str, path: &str) -> Result<String, GenerationError> {
    let mut blocks = parse_file_blocks(text);

    let content = if let Some(i) = blocks.iter().position(|(p, _)| p == path) {
        blocks.swap_remove(i).1
    } else if blocks.len() == 1 {
        blocks.swap_remove(0).1
    } else {
        normalize_content(strip_code_fences(text))
    };

    if content.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(content)
}
