//! Preview lifecycle routes.
//!
//! POST /preview builds and stores a preview and hands back a signed token;
//! GET /preview/{id} serves the sandboxed HTML document for it.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::warn;

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::preview::{CreatePreviewRequest, PreviewCreateResponse, PreviewPayload};
use crate::services::preview_service::PreviewService;
use crate::services::render_service::RenderService;

/// Create the preview router
pub fn preview_router() -> Router<AppState> {
    Router::new()
        .route("/preview", post(create_preview))
        .route("/preview/{id}", get(render_preview))
}

/// POST /preview - Build, store, and sign a preview
#[utoipa::path(
    post,
    path = "/preview",
    tag = "Preview",
    request_body = CreatePreviewRequest,
    responses(
        (status = 200, description = "Preview created", body = PreviewCreateResponse),
        (status = 400, description = "No renderable content, or a scripted controller was supplied"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_preview(
    State(state): State<AppState>,
    Json(request): Json<CreatePreviewRequest>,
) -> Result<Json<PreviewCreateResponse>, ApiError> {
    let payload = PreviewService::build_payload(&request)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let entry = state.preview_store.create(payload).await;
    let token = state.token_service.create_token(&entry).map_err(|err| {
        warn!("Failed to sign preview token: {}", err);
        ApiError::internal("Failed to create preview")
    })?;

    Ok(Json(PreviewCreateResponse {
        preview_url: format!(
            "/api/v1/preview/{}?token={}",
            entry.id,
            urlencoding::encode(&token)
        ),
        preview_id: entry.id,
        preview_token: token,
        created_at: entry.created_at,
    }))
}

#[derive(Deserialize)]
pub struct RenderPreviewQuery {
    token: Option<String>,
}

/// GET /preview/{id} - Serve the sandbox HTML document
///
/// Resolution tries the store first and falls back to the query token, so a
/// bookmarked preview URL keeps working after the store entry expires.
#[utoipa::path(
    get,
    path = "/preview/{id}",
    tag = "Preview",
    params(
        ("id" = String, Path, description = "Preview id (or any value when a valid token is supplied)"),
        ("token" = Option<String>, Query, description = "Signed preview token fallback")
    ),
    responses(
        (status = 200, description = "Sandbox HTML document", content_type = "text/html"),
        (status = 404, description = "Preview not found or expired", content_type = "text/plain")
    )
)]
pub async fn render_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RenderPreviewQuery>,
) -> Response {
    let preview: Option<PreviewPayload> = match state.preview_store.get(&id).await {
        Some(entry) => Some(entry.into()),
        None => query
            .token
            .as_deref()
            .and_then(|token| state.token_service.parse_token(token))
            .map(PreviewPayload::from),
    };

    let Some(preview) = preview else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Preview not found or expired",
        )
            .into_response();
    };

    let html = RenderService::build_preview_html(&id, &preview);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        html,
    )
        .into_response()
}
