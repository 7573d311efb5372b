//! Request and result shapes of LLM actions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Edit,
    Research,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Edit => "edit",
            ActionType::Research => "research",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmActionRequest {
    #[serde(rename = "type")]
    pub kind: ActionType,
    pub user_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_content: Option<String>,
}

/// A drafted item with nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub text: String,
    #[serde(default)]
    pub children: Vec<GeneratedItem>,
}

impl GeneratedItem {
    pub fn leaf(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(text: impl Into<String>, children: Vec<GeneratedItem>) -> Self {
        Self {
            text: text.into(),
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Where drafted content belongs in the outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSection {
    pub section: String,
    /// Id of the matching outline item, when the outline has that section.
    #[serde(default)]
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResult {
    pub items: Vec<GeneratedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_section: Option<TargetSection>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditResult {
    pub content: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionResult {
    Create(CreateResult),
    Research(ResearchResult),
    Edit(EditResult),
}

impl ActionResult {
    /// Decode generator output for the given action type.
    pub fn from_value(kind: ActionType, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ActionType::Create => ActionResult::Create(serde_json::from_value(value)?),
            ActionType::Edit => ActionResult::Edit(serde_json::from_value(value)?),
            ActionType::Research => ActionResult::Research(serde_json::from_value(value)?),
        })
    }

    pub fn with_target(mut self, target: Option<TargetSection>) -> Self {
        if let ActionResult::Create(create) = &mut self {
            if create.target_section.is_none() {
                create.target_section = target;
            }
        }
        self
    }
}

/// Response body: the request echoed back plus the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmActionResponse {
    pub action: LlmActionRequest,
    pub result: ActionResult,
}
