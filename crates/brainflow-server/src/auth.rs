//! Accounts and bearer sessions.

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    Json,
};
use brainflow_shared::ids::new_user_id;
use brainflow_shared::password::{hash_password, verify_password};
use brainflow_shared::session::{TokenKind, TokenPair};
use brainflow_shared::{User, UserProfile, UserSettings};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::AppState;
use crate::error::ServerError;

/// The authenticated caller, resolved from an access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ServerError::Unauthorized("Not authenticated".into()))?;
        let claims = state.tokens.verify(token, TokenKind::Access, Utc::now())?;
        let user = state
            .store
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| ServerError::Unauthorized("User not found".into()))?;
        Ok(AuthUser(user))
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    #[serde(alias = "displayName")]
    name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

fn issue(state: &AppState, user: &User) -> Json<AuthResponse> {
    Json(AuthResponse {
        user: user.profile(),
        tokens: state.tokens.issue_pair(&user.id, Utc::now()),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim();
    if !email.contains('@') {
        return Err(ServerError::BadRequest("Invalid email address".into()));
    }
    if req.password.is_empty() {
        return Err(ServerError::BadRequest("Password cannot be empty".into()));
    }
    if name.is_empty() {
        return Err(ServerError::BadRequest("Name cannot be empty".into()));
    }

    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(ServerError::BadRequest("User already exists".into()));
    }

    let now = Utc::now();
    let user = User {
        id: new_user_id(),
        email,
        name: name.to_string(),
        hashed_password: hash_password(&req.password),
        settings: UserSettings::default(),
        created_at: now,
        updated_at: now,
    };
    // A concurrent registration can still win the race; the store reports it
    // as a conflict.
    state.store.create_user(&user).await.map_err(|e| match e {
        brainflow_store::StoreError::Conflict(_) => {
            ServerError::BadRequest("User already exists".into())
        }
        other => other.into(),
    })?;

    info!(user = %user.id, "user registered");
    Ok(issue(&state, &user))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let invalid = || ServerError::Unauthorized("Invalid credentials".into());

    let email = req.email.trim().to_lowercase();
    let user = state.store.get_user_by_email(&email).await?.ok_or_else(invalid)?;

    match verify_password(&req.password, &user.hashed_password) {
        Ok(true) => {}
        Ok(false) => return Err(invalid()),
        Err(e) => {
            warn!(user = %user.id, error = %e, "stored password hash unreadable");
            return Err(invalid());
        }
    }

    info!(user = %user.id, "user logged in");
    Ok(issue(&state, &user))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let claims = state
        .tokens
        .verify(&req.refresh_token, TokenKind::Refresh, Utc::now())?;
    let user = state
        .store
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("User not found".into()))?;
    Ok(issue(&state, &user))
}

pub async fn me(user: AuthUser) -> Json<UserProfile> {
    Json(user.0.profile())
}

/// Tokens are stateless; the client just forgets them.
pub async fn logout(user: AuthUser) -> Json<serde_json::Value> {
    info!(user = %user.id(), "user logged out");
    Json(serde_json::json!({ "message": "Successfully logged out" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert("authorization", HeaderValue::from_static("bearer  xyz"));
        assert_eq!(bearer_token(&headers), Some("xyz"));

        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
