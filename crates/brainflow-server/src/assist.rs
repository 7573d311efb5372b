//! Generator-backed endpoints: LLM actions and voice capture.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use brainflow_assist::command::VoiceCommand;
use brainflow_assist::sections::{default_brainlift, suggestions_for};
use brainflow_assist::voice::{improve_suggestions, structure_suggestions, to_template};
use brainflow_assist::{LlmActionRequest, LlmActionResponse, StructuredItem, Transcript};
use brainflow_shared::Item;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ServerError;

fn validate_action(request: &LlmActionRequest) -> Result<(), ServerError> {
    if request.user_prompt.trim().is_empty() {
        return Err(ServerError::BadRequest("userPrompt cannot be empty".into()));
    }
    Ok(())
}

pub async fn llm_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path(outline_id): Path<String>,
    Json(request): Json<LlmActionRequest>,
) -> Result<Json<LlmActionResponse>, ServerError> {
    validate_action(&request)?;
    let snapshot = state.outlines.snapshot(user.id(), &outline_id).await?;
    let result = state.assist.run_action(&request, &snapshot).await?;
    Ok(Json(LlmActionResponse {
        action: request,
        result,
    }))
}

#[derive(Deserialize)]
pub struct SuggestionQuery {
    section: Option<String>,
}

pub async fn llm_suggestions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(outline_id): Path<String>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    // Only to 404 on outlines the caller cannot see
    state.outlines.summary(user.id(), &outline_id).await?;
    let suggestions = suggestions_for(query.section.as_deref().map(str::trim));
    Ok(Json(serde_json::json!({ "suggestions": suggestions })))
}

/// Unauthenticated variant that runs against the blank Brainlift outline.
pub async fn public_llm_action(
    State(state): State<AppState>,
    Json(request): Json<LlmActionRequest>,
) -> Result<Json<LlmActionResponse>, ServerError> {
    validate_action(&request)?;
    let snapshot = default_brainlift(Utc::now());
    let result = state.assist.run_action(&request, &snapshot).await?;
    Ok(Json(LlmActionResponse {
        action: request,
        result,
    }))
}

// ─── Voice ───

pub async fn transcribe(
    State(state): State<AppState>,
    _user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Transcript>, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "audio" {
            let filename = field.file_name().unwrap_or("audio.webm").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;

            let transcript = state.assist.transcribe(data.to_vec(), &filename).await?;
            return Ok(Json(transcript));
        }
    }

    Err(ServerError::BadRequest(
        "Missing 'audio' field in multipart form".to_string(),
    ))
}

#[derive(Deserialize)]
pub struct TextRequest {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StructureResponse {
    pub original: String,
    pub structured: Vec<StructuredItem>,
    pub suggestions: Vec<String>,
}

pub async fn structure(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<TextRequest>,
) -> Result<Json<StructureResponse>, ServerError> {
    let structured = state.assist.structure(&req.text).await?;
    let suggestions = structure_suggestions(&structured);
    Ok(Json(StructureResponse {
        original: req.text,
        structured,
        suggestions,
    }))
}

pub async fn improve(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<TextRequest>,
) -> Result<Json<StructureResponse>, ServerError> {
    let structured = state.assist.improve(&req.text).await?;
    Ok(Json(StructureResponse {
        original: req.text,
        structured,
        suggestions: improve_suggestions(),
    }))
}

#[derive(Deserialize)]
pub struct CommandRequest {
    command: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub message: String,
    pub command: String,
    pub items_modified: usize,
}

pub async fn voice_command(
    State(state): State<AppState>,
    user: AuthUser,
    Path(outline_id): Path<String>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ServerError> {
    let command = VoiceCommand::parse(&req.command);
    let items_modified = state
        .outlines
        .voice_command(user.id(), &outline_id, &command)
        .await?;
    Ok(Json(CommandResponse {
        message: "Outline updated successfully".to_string(),
        command: req.command,
        items_modified,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemsRequest {
    text: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default = "default_true")]
    structure_first: bool,
}

fn default_true() -> bool {
    true
}

pub async fn add_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(outline_id): Path<String>,
    Json(req): Json<AddItemsRequest>,
) -> Result<Json<Vec<Item>>, ServerError> {
    // Check ownership before spending a generator call
    state.outlines.summary(user.id(), &outline_id).await?;

    let structured = if req.structure_first {
        state.assist.structure(&req.text).await?
    } else {
        if req.text.trim().is_empty() {
            return Err(ServerError::BadRequest("Text cannot be empty".into()));
        }
        vec![StructuredItem::new(req.text.trim(), 0)]
    };

    let parent_id = req.parent_id.as_deref().filter(|p| !p.is_empty());
    let added = state
        .outlines
        .add_nodes(user.id(), &outline_id, &to_template(&structured), parent_id)
        .await?;
    info!(outline = %outline_id, added = added.len(), "voice items added");
    Ok(Json(added))
}
