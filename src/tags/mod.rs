//! Tag parsing.
//!
//! Free-text tag input is a comma separated list. Parsing produces the canonical
//! tag set stored on a node: trimmed, non-empty, case-sensitive, de-duplicated
//! with first-seen order preserved.

use std::collections::HashSet;

use serde::Deserialize;

/// Parse comma separated tag input into a canonical tag list.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(*tag))
        .map(str::to_string)
        .collect()
}

/// Normalize an already split tag list (e.g. a JSON array) through the parser.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let joined = tags.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
    parse_tags(&joined)
}

/// Tag input as accepted by the API: either the raw text field or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagInput {
    Text(String),
    List(Vec<String>),
}

impl TagInput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagInput::Text(text) => parse_tags(&text),
            TagInput::List(list) => normalize_tags(&list),
        }
    }
}

impl Default for TagInput {
    fn default() -> Self {
        TagInput::List(Vec::new())
    }
}
