//! Requirement synthesis: per-chunk summaries merged into one global spec.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::info;

use super::{Model, Stack};
use crate::error::PipelineError;
use crate::fallback::strip_code_fences;

const SUMMARY_SYSTEM: &str = "You are a senior software architect. You read product requirements \
and extract a precise technical summary. Answer with JSON only.";

const MERGE_SYSTEM: &str = "You are a senior software architect. You merge partial requirement \
summaries into one consistent technical specification. Answer with JSON only.";

/// Summarizes every chunk, then merges the summaries into a global spec.
///
/// The merge call always runs, even for a single chunk.
///
/// # Errors
///
/// Returns the first generation failure, labelled with its stage.
pub async fn synthesize(
    model: &Model<'_>,
    chunks: &[&str],
    stack: &Stack,
) -> Result<String, PipelineError> {
    let summaries = summarize_chunks(model, chunks, stack).await?;
    merge_summaries(model, &summaries, stack).await
}

/// Summarizes each chunk with bounded concurrency, keeping chunk order.
///
/// # Errors
///
/// Returns the first generation failure as `summarize:<index>`.
pub async fn summarize_chunks(
    model: &Model<'_>,
    chunks: &[&str],
    stack: &Stack,
) -> Result<Vec<String>, PipelineError> {
    let limit = model.settings().max_concurrency;
    let budget = model.settings().tokens.summary;
    let total = chunks.len();

    let summaries = stream::iter(chunks.iter().enumerate())
        .map(|(index, chunk)| async move {
            let label = format!("summarize:{index}");
            let prompt = summary_prompt(chunk, index, total, stack);
            model
                .ask(&label, SUMMARY_SYSTEM, prompt, budget)
                .await
                .map(|text| strip_code_fences(&text).to_string())
                .map_err(|e| PipelineError::generation(label, e))
        })
        .buffered(limit)
        .try_collect::<Vec<_>>()
        .await?;

    info!(chunks = total, "Summarized requirement chunks");
    Ok(summaries)
}

/// Merges chunk summaries into the global spec.
///
/// # Errors
///
/// Returns the generation failure as stage `merge`.
pub async fn merge_summaries(
    model: &Model<'_>,
    summaries: &[String],
    stack: &Stack,
) -> Result<String, PipelineError> {
    let prompt = merge_prompt(summaries, stack);
    let text = model
        .ask("merge", MERGE_SYSTEM, prompt, model.settings().tokens.merge)
        .await
        .map_err(|e| PipelineError::generation("merge", e))?;
    Ok(strip_code_fences(&text).to_string())
}

fn summary_prompt(chunk: &str, index: usize, total: usize, stack: &Stack) -> String {
    format!(
        "{constraints}\n\n\
         This is part {part} of {total} of a product requirement.\n\
         Summarize it as a JSON object with exactly these keys:\n\
         - \"modules\": functional areas or components\n\
         - \"entities\": data entities with their fields\n\
         - \"endpoints\": externally visible operations (method, path, purpose)\n\
         - \"rules\": business rules and constraints\n\
         Keep every detail that affects the implementation. Do not invent features.\n\n\
         REQUIREMENT PART:\n{chunk}",
        constraints = stack.constraints(),
        part = index + 1,
    )
}

fn merge_prompt(summaries: &[String], stack: &Stack) -> String {
    let fragments = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Fragment {}:\n{s}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{constraints}\n\n\
         Merge the following requirement fragments into ONE JSON specification with the keys \
         \"modules\", \"entities\", \"endpoints\" and \"rules\". Preserve every module, entity, \
         endpoint and rule; merge duplicates; resolve naming conflicts consistently.\n\n\
         {fragments}",
        constraints = stack.constraints(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::pipeline::test_support::ScriptedGenerator;
    use crate::ports::GenerationError;

    fn stack() -> Stack {
        Stack::new("typescript", "nestjs")
    }

    #[tokio::test]
    async fn summaries_keep_chunk_order_and_merge_runs_once() {
        let settings = Settings::default();
        let llm = ScriptedGenerator::new()
            .answer("summarize:0", "{\"modules\":[\"users\"]}")
            .answer("summarize:1", "```json\n{\"modules\":[\"orders\"]}\n```")
            .answer("merge", "```json\n{\"modules\":[\"users\",\"orders\"]}\n```");
        let model = Model::new(&llm, &settings);

        let summaries = summarize_chunks(&model, &["users...", "orders..."], &stack()).await.unwrap();
        assert_eq!(summaries, vec!["{\"modules\":[\"users\"]}", "{\"modules\":[\"orders\"]}"]);

        let spec = merge_summaries(&model, &summaries, &stack()).await.unwrap();
        assert_eq!(spec, "{\"modules\":[\"users\",\"orders\"]}");
        let mut labels = llm.labels();
        assert_eq!(labels.pop().as_deref(), Some("merge"));
        labels.sort();
        assert_eq!(labels, vec!["summarize:0", "summarize:1"]);
    }

    #[tokio::test]
    async fn single_chunk_still_merges() {
        let settings = Settings::default();
        let llm = ScriptedGenerator::new().answer("summarize:0", "{}").answer("merge", "{\"a\":1}");
        let spec = synthesize(&Model::new(&llm, &settings), &["only"], &stack()).await.unwrap();
        assert_eq!(spec, "{\"a\":1}");
        assert!(llm.labels().contains(&"merge".to_string()));
    }

    #[tokio::test]
    async fn prompts_carry_stack_constraints() {
        let settings = Settings::default();
        let llm = ScriptedGenerator::new().answer("summarize:0", "{}").answer("merge", "{}");
        synthesize(&Model::new(&llm, &settings), &["x"], &stack()).await.unwrap();
        for request in llm.requests() {
            assert!(request.prompt.contains("Framework: nestjs"), "{}", request.label);
        }
    }

    #[tokio::test]
    async fn failed_chunk_names_its_stage() {
        let settings = Settings { max_retries: 0, ..Settings::default() };
        let llm = ScriptedGenerator::new()
            .answer("summarize:0", "{}")
            .fail("summarize:1", GenerationError::Rejected("quota".into()));
        let err = synthesize(&Model::new(&llm, &settings), &["a", "b"], &stack()).await.unwrap_err();
        match err {
            PipelineError::Generation { stage, .. } => assert_eq!(stage, "summarize:1"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
