//! Keyword relevance scoring over file summaries.
//!
//! This is the fallback whenever a structured impact response cannot be
//! used: it always yields some file set as long as the project has files.

use std::sync::LazyLock;

use regex::Regex;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("word pattern is valid"));

/// Number of candidates returned when nothing scores.
const DEGRADED_COUNT: usize = 2;

/// Splits a query into lowercase words longer than two characters.
#[must_use]
pub fn tokenize(query: &str) -> Vec<String> {
    WORD.find_iter(query)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| w.chars().count() > 2)
        .collect()
}

/// Scores one candidate: total substring occurrences of every token in
/// the lowercase `path + " " + summary`.
#[must_use]
pub fn score(tokens: &[String], path: &str, summary: &str) -> usize {
    let haystack = format!("{path} {summary}").to_lowercase();
    tokens.iter().map(|t| haystack.matches(t.as_str()).count()).sum()
}

/// Ranks `candidates` (path, summary) against `query`.
///
/// Returns up to `max_count` paths with a positive score, best first and
/// stable on ties. When nothing scores, returns the first two candidates
/// in their original order; with no candidates, returns nothing.
#[must_use]
pub fn relevant_files(query: &str, candidates: &[(&str, &str)], max_count: usize) -> Vec<String> {
    let tokens = tokenize(query);

    let mut scored: Vec<(&str, usize)> =
        candidates.iter().map(|(path, summary)| (*path, score(&tokens, path, summary))).collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let hits: Vec<String> = scored
        .iter()
        .filter(|(_, s)| *s > 0)
        .take(max_count)
        .map(|(p, _)| (*p).to_string())
        .collect();

    if hits.is_empty() {
        candidates.iter().take(DEGRADED_COUNT).map(|(p, _)| (*p).to_string()).collect()
    } else {
        hits
    }
}
