//! Marker recognition.
//!
//! A marker is a comment token, optional whitespace, then `tag:#key` or
//! `goto:#key`. Keyword and comment token match case-insensitively; the key is
//! kept verbatim and compared case-sensitively everywhere else.

use crate::index::model::MarkerKind;
use crate::index::model::MarkerOccurrence;
use once_cell::sync::Lazy;
use regex::Captures;
use regex::Regex;
use std::path::Path;

fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid regex literal {pattern}: {err}"))
}

static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    compile_regex(
        r"(?i://|/\*|<!--|--|#|;|'|\brem\b)\s*(?P<keyword>(?i:tag|goto)):#(?P<key>[A-Za-z][A-Za-z0-9_]*)",
    )
});

/// Scan a sequence of lines; `line` in each occurrence is the index within
/// `lines`.
pub fn scan_lines<'a, I>(path: &Path, lines: I) -> Vec<MarkerOccurrence>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut occurrences = Vec::new();
    for (line_idx, line) in lines.into_iter().enumerate() {
        if !might_contain_marker(line) {
            continue;
        }
        for caps in MARKER_REGEX.captures_iter(line) {
            if let Some(occurrence) = occurrence_from_captures(path, line_idx, line, &caps) {
                occurrences.push(occurrence);
            }
        }
    }
    occurrences
}

pub fn scan_text(path: &Path, content: &str) -> Vec<MarkerOccurrence> {
    scan_lines(path, content.lines())
}

/// First definition of exactly `key` in scan order.
pub fn find_definition(path: &Path, content: &str, key: &str) -> Option<MarkerOccurrence> {
    scan_text(path, content)
        .into_iter()
        .find(|occurrence| occurrence.kind == MarkerKind::Definition && occurrence.key == key)
}

/// Key of the `goto` marker under `column` (0-based, in characters). When the
/// caret is outside every reference on the line, the first reference wins.
pub fn reference_at(line: &str, column: usize) -> Option<String> {
    let mut first = None;
    for caps in MARKER_REGEX.captures_iter(line) {
        let (Some(whole), Some(keyword), Some(key)) =
            (caps.get(0), caps.name("keyword"), caps.name("key"))
        else {
            continue;
        };
        if MarkerKind::from_keyword(keyword.as_str()) != Some(MarkerKind::Reference) {
            continue;
        }
        let start = char_offset(line, whole.start());
        let end = char_offset(line, whole.end());
        if (start..end).contains(&column) {
            return Some(key.as_str().to_string());
        }
        if first.is_none() {
            first = Some(key.as_str().to_string());
        }
    }
    first
}

fn occurrence_from_captures(
    path: &Path,
    line_idx: usize,
    line: &str,
    caps: &Captures<'_>,
) -> Option<MarkerOccurrence> {
    let keyword = caps.name("keyword")?;
    let key = caps.name("key")?;
    let kind = MarkerKind::from_keyword(keyword.as_str())?;
    Some(MarkerOccurrence {
        kind,
        key: key.as_str().to_string(),
        file_path: path.to_path_buf(),
        line: line_idx,
        column: char_offset(line, keyword.start()),
    })
}

// Cheap pre-filter; every marker contains ":#".
fn might_contain_marker(line: &str) -> bool {
    line.contains(":#")
}

fn char_offset(line: &str, byte_idx: usize) -> usize {
    line.get(..byte_idx)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(byte_idx)
}
