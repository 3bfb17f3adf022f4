//! Delimited file blocks.
//!
//! Generated text carries whole files as blocks introduced by a marker line:
//!
//! ```text
//! <<<FILE:src/main.ts>>>
//! ...file content...
//! <<<FILE:src/app.module.ts>>>
//! ...
//! ```

/// Opening half of a block marker.
pub const MARKER_PREFIX: &str = "<<<FILE:";
/// Closing half of a block marker.
pub const MARKER_SUFFIX: &str = ">>>";

/// Returns the marker line for `path`.
#[must_use]
pub fn marker(path: &str) -> String {
    format!("{MARKER_PREFIX}{path}{MARKER_SUFFIX}")
}

/// Extracts the path from a marker line, if `line` is one.
fn marker_path(line: &str) -> Option<&str> {
    let path = line.trim().strip_prefix(MARKER_PREFIX)?.strip_suffix(MARKER_SUFFIX)?.trim();
    (!path.is_empty()).then_some(path)
}

/// Trims trailing whitespace and terminates with exactly one newline.
#[must_use]
pub fn normalize_content(content: &str) -> String {
    let mut normalized = content.trim_end().to_string();
    normalized.push('\n');
    normalized
}

/// Parses every file block in `text`, in order of first appearance.
///
/// Lines before the first marker are discarded. A path that appears twice
/// keeps the content of its last block. An empty result means the text
/// contained no markers at all.
#[must_use]
pub fn parse_file_blocks(text: &str) -> Vec<(String, String)> {
    let mut files: Vec<(String, String)> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(path) = marker_path(line) {
            if let Some((path, buffer)) = current.take() {
                upsert(&mut files, path, &buffer);
            }
            current = Some((path.to_string(), Vec::new()));
        } else if let Some((_, buffer)) = current.as_mut() {
            buffer.push(line);
        }
    }
    if let Some((path, buffer)) = current {
        upsert(&mut files, path, &buffer);
    }

    files
}

fn upsert(files: &mut Vec<(String, String)>, path: String, lines: &[&str]) {
    let content = normalize_content(&lines.join("\n"));
    match files.iter_mut().find(|(existing, _)| *existing == path) {
        Some(entry) => entry.1 = content,
        None => files.push((path, content)),
    }
}

/// Formats files as delimited blocks separated by a blank line.
pub fn format_file_blocks<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    files
        .into_iter()
        .map(|(path, content)| format!("{}\n{}", marker(path), normalize_content(content)))
        .collect::<Vec<_>>()
        .join("\n")
}
