//! Prompt-to-field-mapping route.

use axum::{extract::State, middleware, response::Json, routing::post, Router};

use super::app_state::AppState;
use super::error::ApiError;
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimiterState};
use crate::models::preview::{MapFieldsMeta, MapFieldsRequest, MapFieldsResponse};

/// Create the map-fields router. The limiter guards only this route; the
/// rest of the API stays unthrottled.
pub fn map_fields_router(limiter: RateLimiterState) -> Router<AppState> {
    Router::new()
        .route("/map-fields", post(map_fields))
        .route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
}

/// POST /map-fields - Turn a report prompt into SAP field mappings
#[utoipa::path(
    post,
    path = "/map-fields",
    tag = "Mapping",
    request_body = MapFieldsRequest,
    responses(
        (status = 200, description = "Field mappings with provenance metadata", body = MapFieldsResponse),
        (status = 400, description = "Blank or missing prompt"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn map_fields(
    State(state): State<AppState>,
    Json(request): Json<MapFieldsRequest>,
) -> Result<Json<MapFieldsResponse>, ApiError> {
    let prompt = request.prompt.as_deref().map(str::trim).unwrap_or_default();
    if prompt.is_empty() {
        return Err(ApiError::bad_request("Invalid prompt provided"));
    }

    let result = state
        .mapping_service
        .generate_field_mappings(prompt, request.force_mock)
        .await;

    Ok(Json(MapFieldsResponse {
        fields: result.payload.fields,
        meta: MapFieldsMeta {
            source: result.source,
            reason: result.reason,
        },
    }))
}
