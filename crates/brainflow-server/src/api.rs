use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use brainflow_assist::AssistService;
use brainflow_shared::batch::BatchOperation;
use brainflow_shared::constants::{API_PREFIX, APP_NAME};
use brainflow_shared::session::TokenSigner;
use brainflow_shared::template::TemplateRequest;
use brainflow_shared::{Item, ItemNode, ItemUpdate, OutlineSummary};
use brainflow_store::DocumentStore;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::assist;
use crate::auth::{self, AuthUser};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::outlines::{BatchOutcome, NewItem, OutlineService};
use crate::rate_limit::{rate_limit_middleware, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub outlines: OutlineService,
    pub assist: AssistService,
    pub tokens: Arc<TokenSigner>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        assist: AssistService,
        tokens: TokenSigner,
        config: ServerConfig,
    ) -> Self {
        Self {
            outlines: OutlineService::new(store.clone()),
            store,
            assist,
            tokens: Arc::new(tokens),
            rate_limiter: RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst),
            config: Arc::new(config),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/outlines", get(list_outlines).post(create_outline))
        .route(
            "/outlines/:id",
            get(get_outline).put(rename_outline).delete(delete_outline),
        )
        .route("/outlines/:id/items", get(list_items).post(create_item))
        .route(
            "/outlines/:id/items/:item_id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/outlines/:id/items/:item_id/indent", post(indent_item))
        .route("/outlines/:id/items/:item_id/outdent", post(outdent_item))
        .route("/outlines/:id/batch", post(batch_operations))
        .route("/outlines/:id/template", post(apply_template))
        .route("/outlines/:id/llm-action", post(assist::llm_action))
        .route(
            "/outlines/:id/llm-action/suggestions",
            get(assist::llm_suggestions),
        )
        .route("/public/llm-action", post(assist::public_llm_action))
        .route("/voice/transcribe", post(assist::transcribe))
        .route("/voice/structure", post(assist::structure))
        .route("/voice/improve", post(assist::improve))
        .route("/voice/:outline_id/voice", put(assist::voice_command))
        .route("/voice/:outline_id/voice/add-items", post(assist::add_items));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest(API_PREFIX, api)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct RootResponse {
    message: String,
    version: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: &'static str,
    store_healthy: bool,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{APP_NAME} API"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_healthy = match state.store.health().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "store health check failed");
            false
        }
    };
    let (code, status) = if store_healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store: state.store.backend(),
            store_healthy,
        }),
    )
}

// ─── Outlines ───

#[derive(Deserialize)]
struct TitleRequest {
    title: String,
}

async fn list_outlines(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<OutlineSummary>>, ServerError> {
    Ok(Json(state.outlines.list(user.id()).await?))
}

async fn create_outline(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<TitleRequest>,
) -> Result<(StatusCode, Json<OutlineSummary>), ServerError> {
    let outline = state.outlines.create(user.id(), &req.title).await?;
    Ok((StatusCode::CREATED, Json(outline)))
}

async fn get_outline(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OutlineSummary>, ServerError> {
    Ok(Json(state.outlines.summary(user.id(), &id).await?))
}

async fn rename_outline(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<TitleRequest>,
) -> Result<Json<OutlineSummary>, ServerError> {
    Ok(Json(state.outlines.rename(user.id(), &id, &req.title).await?))
}

async fn delete_outline(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.outlines.delete(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Items ───

async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ItemNode>>, ServerError> {
    Ok(Json(state.outlines.hierarchy(user.id(), &id).await?))
}

async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>), ServerError> {
    let item = state.outlines.create_item(user.id(), &id, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<Item>, ServerError> {
    Ok(Json(state.outlines.item(user.id(), &id, &item_id).await?))
}

async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(String, String)>,
    Json(update): Json<ItemUpdate>,
) -> Result<Json<Item>, ServerError> {
    let item = state
        .outlines
        .update_item(user.id(), &id, &item_id, &update)
        .await?;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    state.outlines.delete_item(user.id(), &id, &item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn indent_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<Item>, ServerError> {
    Ok(Json(state.outlines.indent(user.id(), &id, &item_id).await?))
}

async fn outdent_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<Item>, ServerError> {
    Ok(Json(state.outlines.outdent(user.id(), &id, &item_id).await?))
}

#[derive(Deserialize)]
struct BatchRequest {
    operations: Vec<BatchOperation>,
}

async fn batch_operations(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchOutcome>, ServerError> {
    Ok(Json(
        state.outlines.batch(user.id(), &id, &req.operations).await?,
    ))
}

async fn apply_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<TemplateRequest>,
) -> Result<Json<Vec<ItemNode>>, ServerError> {
    Ok(Json(state.outlines.template(user.id(), &id, &req).await?))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
