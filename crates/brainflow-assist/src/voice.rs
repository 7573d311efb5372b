//! Voice capture: transcripts and leveled items.

use std::sync::OnceLock;

use async_trait::async_trait;
use brainflow_shared::template::{nest_by_level, TemplateNode};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AssistError, Result};

/// Audio shorter than this cannot be real speech and transcribes to "".
pub const MIN_AUDIO_BYTES: usize = 100;

/// Deepest level the indentation reader assigns.
pub const MAX_IMPROVE_LEVEL: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub confidence: f32,
    pub language: String,
    /// Rough estimate in seconds derived from the payload size.
    pub duration: f32,
}

impl Transcript {
    pub fn new(text: impl Into<String>, audio_len: usize) -> Self {
        Self {
            text: text.into(),
            confidence: 0.95,
            language: "en".to_string(),
            duration: audio_len as f32 / 1000.0,
        }
    }
}

/// One line of structured text; `level` 0 is a top-level topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredItem {
    pub content: String,
    pub level: usize,
}

impl StructuredItem {
    pub fn new(content: impl Into<String>, level: usize) -> Self {
        Self {
            content: content.into(),
            level,
        }
    }
}

/// Speech-to-text backend.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String>;
}

fn clause_splitter() -> &'static Regex {
    static SPLITTER: OnceLock<Regex> = OnceLock::new();
    SPLITTER.get_or_init(|| Regex::new(r"[,;.]|\band\b").expect("static regex"))
}

/// Split text into clauses: the first becomes the topic (level 0), the rest
/// its points (level 1).
pub fn rule_based_structure(text: &str) -> Vec<StructuredItem> {
    let parts: Vec<&str> = clause_splitter()
        .split(text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.len() <= 1 {
        return vec![StructuredItem::new(text.trim(), 0)];
    }

    parts
        .iter()
        .enumerate()
        .map(|(i, part)| StructuredItem::new(*part, usize::from(i > 0)))
        .collect()
}

/// Read existing outline text: two leading spaces per level, and a `- ` or
/// `* ` bullet adds one more. Falls back to clause splitting when no line
/// has content.
pub fn improve_by_indentation(text: &str) -> Vec<StructuredItem> {
    let mut items = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.trim().is_empty() {
            continue;
        }
        let indent = (line.len() - trimmed.len()) / 2;
        let (content, bullet) = match trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            Some(rest) => (rest, 1),
            None => (trimmed, 0),
        };
        items.push(StructuredItem::new(
            content.trim(),
            (indent + bullet).min(MAX_IMPROVE_LEVEL),
        ));
    }

    if items.is_empty() {
        return rule_based_structure(text);
    }
    items
}

pub fn structure_suggestions(items: &[StructuredItem]) -> Vec<String> {
    let mut suggestions = Vec::new();
    if items.len() > 5 {
        suggestions.push("Consider grouping related items into categories".to_string());
    }
    if items.iter().any(|item| item.level > 2) {
        suggestions.push("Deep nesting detected - consider flattening some levels".to_string());
    }
    if suggestions.is_empty() {
        suggestions.push("Structure looks good! You can add more detail to any item".to_string());
    }
    suggestions
}

pub fn improve_suggestions() -> Vec<String> {
    [
        "Structure has been optimized",
        "Related items have been grouped",
        "Hierarchy has been clarified",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Decode generator output: a bare array, or an object wrapping one under
/// `items` or `structured`.
pub fn parse_structured(value: serde_json::Value) -> Result<Vec<StructuredItem>> {
    let list = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(mut map) => map
            .remove("items")
            .or_else(|| map.remove("structured"))
            .ok_or_else(|| AssistError::Malformed("no item array in object".into()))?,
        other => {
            return Err(AssistError::Malformed(format!(
                "expected an array, got {other}"
            )))
        }
    };
    serde_json::from_value(list).map_err(|e| AssistError::Malformed(e.to_string()))
}

/// Nest leveled items for template expansion.
pub fn to_template(items: &[StructuredItem]) -> Vec<TemplateNode> {
    nest_by_level(
        items
            .iter()
            .map(|item| (item.content.clone(), item.level)),
    )
}
