//! Parse-or-fallback handling for structured model output.
//!
//! Planning, change-spec parsing and impact resolution all ask the model
//! for JSON and all need a defined answer when the JSON is unusable. They
//! share [`parse_or_fallback`] so the fallback contract lives in one place.

use serde::de::DeserializeOwned;

/// Outcome of [`parse_or_fallback`].
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// The text parsed and passed validation.
    Structured(T),
    /// The fallback produced the value.
    Fallback {
        /// Fallback value.
        value: T,
        /// Why the structured path was abandoned.
        reason: String,
    },
}

impl<T> Parsed<T> {
    /// Borrows the value regardless of origin.
    pub fn value(&self) -> &T {
        match self {
            Self::Structured(value) | Self::Fallback { value, .. } => value,
        }
    }

    /// Takes the value regardless of origin.
    pub fn into_value(self) -> T {
        match self {
            Self::Structured(value) | Self::Fallback { value, .. } => value,
        }
    }

    /// Whether the fallback produced the value.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// The reason the fallback ran, if it did.
    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Self::Structured(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Parses `text` as JSON into `T`, then runs `validate`; if either step
/// fails, calls `fallback` with the reason.
///
/// `validate` turns a syntactically valid but unusable value (say, an empty
/// plan) into a fallback as well.
pub fn parse_or_fallback<T, U, V, F>(text: &str, validate: V, fallback: F) -> Parsed<U>
where
    T: DeserializeOwned,
    V: FnOnce(T) -> Result<U, String>,
    F: FnOnce(&str) -> U,
{
    let outcome = serde_json::from_str::<T>(extract_json(text))
        .map_err(|e| format!("malformed JSON: {e}"))
        .and_then(validate);

    match outcome {
        Ok(value) => Parsed::Structured(value),
        Err(reason) => Parsed::Fallback { value: fallback(&reason), reason },
    }
}

/// Removes one surrounding markdown code fence (with optional info string).
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim_end()
}

/// Narrows model output to the JSON document it most likely contains.
///
/// Strips code fences, then, if prose surrounds the document, keeps the
/// span from the first `{`/`[` to the last `}`/`]`.
#[must_use]
pub fn extract_json(text: &str) -> &str {
    let inner = strip_code_fences(text);
    if inner.starts_with('{') || inner.starts_with('[') {
        return inner;
    }
    let start = inner.find(|c: char| c == '{' || c == '[');
    let end = inner.rfind(|c: char| c == '}' || c == ']');
    match (start, end) {
        (Some(start), Some(end)) if start < end => &inner[start..=end],
        _ => inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_empty(v: Vec<String>) -> Result<Vec<String>, String> {
        if v.is_empty() {
            Err("empty list".into())
        } else {
            Ok(v)
        }
    }

    #[test]
    fn structured_when_json_parses_and_validates() {
        let parsed = parse_or_fallback(r#"["a","b"]"#, non_empty, |_| vec!["fallback".into()]);
        assert_eq!(parsed, Parsed::Structured(vec!["a".to_string(), "b".to_string()]));
        assert!(!parsed.is_fallback());
    }

    #[test]
    fn malformed_json_uses_fallback_with_reason() {
        let parsed = parse_or_fallback("not json", non_empty, |_| vec!["fallback".to_string()]);
        assert!(parsed.is_fallback());
        assert!(parsed.fallback_reason().unwrap().starts_with("malformed JSON"));
        assert_eq!(parsed.into_value(), vec!["fallback".to_string()]);
    }

    #[test]
    fn validation_failure_uses_fallback() {
        let parsed = parse_or_fallback("[]", non_empty, |reason| vec![reason.to_string()]);
        assert_eq!(parsed.value(), &vec!["empty list".to_string()]);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text), "{\"a\": 1}");
    }

    #[test]
    fn prose_around_json_is_ignored() {
        let text = "Sure! Here is the plan:\n[{\"path\": \"a\"}]\nLet me know.";
        assert_eq!(extract_json(text), "[{\"path\": \"a\"}]");
    }

    #[test]
    fn strip_code_fences_keeps_unfenced_text() {
        assert_eq!(strip_code_fences("  plain text \n"), "plain text");
        assert_eq!(strip_code_fences("```ts\nconst a = 1;\n```\n"), "const a = 1;");
        assert_eq!(strip_code_fences("```\nunterminated"), "unterminated");
    }
}
