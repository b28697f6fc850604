//! CORS middleware configuration.

use tower_http::cors::CorsLayer;

/// Create a CORS layer with permissive settings.
///
/// The preview document runs in a sandboxed iframe and calls back into the
/// API from an opaque origin, so every origin must be allowed.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
