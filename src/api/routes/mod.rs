//! API routes module - organizes all route handlers.

pub mod app_state;
pub mod error;
pub mod map_fields;
pub mod mock_data;
pub mod odata;
pub mod openapi;
pub mod preview;

use axum::Router;
// Re-export AppState so callers do not need to reach into app_state
pub use app_state::AppState;

/// Create the main API router combining all route modules
pub fn create_api_router(app_state: AppState) -> Router<AppState> {
    Router::new()
        .merge(preview::preview_router())
        .merge(odata::odata_router())
        .merge(map_fields::map_fields_router(
            app_state.map_fields_limiter.clone(),
        ))
        .merge(mock_data::mock_data_router())
        // OpenAPI documentation endpoints
        .merge(openapi::openapi_router())
    // Note: State is applied by callers who need it (e.g., TestServer)
    // For production use, call .with_state(app_state) after creating the router
}

/// Create the application state from environment configuration.
pub fn create_app_state() -> AppState {
    AppState::new()
}
