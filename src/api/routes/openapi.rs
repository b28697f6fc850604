//! OpenAPI specification endpoints.

use axum::{
    response::{Html, Json},
    routing::get,
    Router,
};
use utoipa::OpenApi;

use super::super::openapi::ApiDoc;
use super::app_state::AppState;

/// Create the OpenAPI router
pub fn openapi_router() -> Router<AppState> {
    Router::new()
        .route("/openapi.json", get(serve_openapi_json))
        .route("/swagger", get(serve_swagger_html))
}

/// GET /openapi.json - Serve the OpenAPI specification as JSON
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "OpenAPI",
    responses(
        (status = 200, description = "OpenAPI specification", body = Object)
    )
)]
pub async fn serve_openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// GET /swagger - Landing page pointing at the JSON spec
pub async fn serve_swagger_html() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <title>AI Report Preview API</title>
    <style>
        body { font-family: "72", Arial, sans-serif; max-width: 640px; margin: 60px auto; color: #222; }
        code { background: #f0f0f0; padding: 2px 5px; border-radius: 3px; }
        a.spec { display: inline-block; margin-top: 12px; padding: 8px 16px; background: #0a6ed1;
                 color: #fff; text-decoration: none; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>AI Report Preview API</h1>
    <p>
        Prompt-to-report field mapping with a mock OData V2 preview backend.
        The machine-readable contract lives at <code>/api/v1/openapi.json</code>
        and can be loaded into Swagger UI, the Swagger Editor, or Postman.
    </p>
    <a class="spec" href="/api/v1/openapi.json">Open openapi.json</a>
</body>
</html>
"#,
    )
}
