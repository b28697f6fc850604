//! Application state management.
//!
//! Defines the AppState struct holding the shared preview store, token
//! codec, field-mapping service, and the map-fields rate limiter.

use axum::extract::FromRef;
use std::sync::Arc;

use crate::middleware::rate_limit::{create_rate_limiter_with_quota, RateLimiterState};
use crate::services::mapping_service::MappingService;
use crate::services::token_service::{PreviewTokenService, SharedPreviewTokenService};
use crate::storage::preview_store::{PreviewStore, SharedPreviewStore};

/// Quota for POST /map-fields; the one endpoint that can fan out to an LLM.
const MAP_FIELDS_REQUESTS_PER_MINUTE: u32 = 60;

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// In-memory TTL store of active previews
    pub preview_store: SharedPreviewStore,
    /// Signs and verifies stateless preview tokens
    pub token_service: SharedPreviewTokenService,
    /// Prompt-to-field mapping (LLM with deterministic fallback)
    pub mapping_service: Arc<MappingService>,
    /// Shared limiter applied to the map-fields route
    pub map_fields_limiter: RateLimiterState,
}

impl AppState {
    /// Create application state from environment configuration.
    pub fn new() -> Self {
        Self {
            preview_store: Arc::new(PreviewStore::new()),
            token_service: Arc::new(PreviewTokenService::from_env()),
            mapping_service: Arc::new(MappingService::from_env()),
            map_fields_limiter: create_rate_limiter_with_quota(MAP_FIELDS_REQUESTS_PER_MINUTE),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// Allow sub-state to be extracted from references (for Axum)
impl FromRef<AppState> for SharedPreviewStore {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.preview_store.clone()
    }
}

impl FromRef<AppState> for SharedPreviewTokenService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.token_service.clone()
    }
}
