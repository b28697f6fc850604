//! Standalone mock-data generation route.

use axum::{response::Json, routing::post, Router};

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::preview::{MockDataRequest, MockDataResponse};
use crate::services::mock_data_service::{MockDataService, DEFAULT_ROW_COUNT};

/// Create the mock-data router
pub fn mock_data_router() -> Router<AppState> {
    Router::new().route("/mock-data", post(generate_mock_data))
}

/// POST /mock-data - Generate deterministic mock rows for field mappings
#[utoipa::path(
    post,
    path = "/mock-data",
    tag = "Mapping",
    request_body = MockDataRequest,
    responses(
        (status = 200, description = "Generated rows keyed by display name", body = MockDataResponse),
        (status = 400, description = "Empty fields array")
    )
)]
pub async fn generate_mock_data(
    Json(request): Json<MockDataRequest>,
) -> Result<Json<MockDataResponse>, ApiError> {
    if request.fields.is_empty() {
        return Err(ApiError::bad_request("Provide a non-empty fields array"));
    }

    let rows = MockDataService::generate_rows(
        &request.fields,
        request.row_count.unwrap_or(DEFAULT_ROW_COUNT),
    );
    Ok(Json(MockDataResponse { rows }))
}
