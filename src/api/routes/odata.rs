//! Mock OData V2 routes backing the preview SmartTable.
//!
//! Everything lives under GET /preview/{id}/odata. The sub-path addresses
//! the service document (empty), `$metadata`, the `PreviewSet` collection,
//! or `PreviewSet/$count`; a leading `token/<value>` pair lets the sandboxed
//! iframe authenticate when the preview id alone no longer resolves.

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tracing::warn;

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::preview::PreviewPayload;
use crate::odata::{
    apply_filter, apply_order_by, apply_paging, apply_select, attach_entity_metadata,
    build_metadata_xml, normalize_columns, normalize_rows, ODataQueryOptions,
};

const ODATA_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-store"),
    ("DataServiceVersion", "2.0"),
    ("OData-Version", "2.0"),
];

static PREVIEW_SET_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PreviewSet.*$").expect("Invalid PreviewSet tail regex"));

/// Create the OData router
pub fn odata_router() -> Router<AppState> {
    // The wildcard route does not match an empty tail, so the bare service
    // root is registered with and without a trailing slash.
    Router::new()
        .route(
            "/preview/{id}/odata",
            get(query_service_root)
                .head(probe_preview_data)
                .options(preview_data_options),
        )
        .route(
            "/preview/{id}/odata/",
            get(query_service_root)
                .head(probe_preview_data)
                .options(preview_data_options),
        )
        .route(
            "/preview/{id}/odata/{*rest}",
            get(query_preview_data)
                .head(probe_preview_data)
                .options(preview_data_options),
        )
}

/// GET /preview/{id}/odata - Service document (or 404 when unresolved)
#[utoipa::path(
    get,
    path = "/preview/{id}/odata",
    tag = "OData",
    params(
        ("id" = String, Path, description = "Preview id (or any value when a token resolves the preview)"),
        ("token" = Option<String>, Query, description = "Signed preview token fallback")
    ),
    responses(
        (status = 200, description = "OData V2 service document"),
        (status = 404, description = "Preview not found or expired")
    )
)]
pub async fn query_service_root(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(original_uri): OriginalUri,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    serve_resource(
        state,
        &id,
        "",
        original_uri.path(),
        raw_query.as_deref().unwrap_or_default(),
        &headers,
    )
    .await
}

/// GET /preview/{id}/odata/{rest} - $metadata, PreviewSet, PreviewSet/$count
pub async fn query_preview_data(
    State(state): State<AppState>,
    Path((id, rest)): Path<(String, String)>,
    OriginalUri(original_uri): OriginalUri,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    serve_resource(
        state,
        &id,
        &rest,
        original_uri.path(),
        raw_query.as_deref().unwrap_or_default(),
        &headers,
    )
    .await
}

/// HEAD probe. Answers 200 without resolving the preview; SmartTable uses
/// this as a liveness ping before loading the model.
pub async fn probe_preview_data() -> impl IntoResponse {
    (StatusCode::OK, ODATA_HEADERS)
}

/// OPTIONS preflight for the sandboxed iframe.
pub async fn preview_data_options() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [("Allow", "GET,HEAD,OPTIONS"), ("Cache-Control", "no-store")],
    )
}

async fn serve_resource(
    state: AppState,
    preview_id: &str,
    rest: &str,
    request_path: &str,
    raw_query: &str,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let options = ODataQueryOptions::from_query(raw_query);

    let segments: Vec<&str> = rest
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    // A leading token/<value> pair carries auth in the path; it is stripped
    // before resource dispatch either way.
    let (path_token, resource) = match segments.as_slice() {
        ["token", token, resource @ ..] => (Some(*token), resource),
        resource => (None, resource),
    };

    let preview = resolve_preview(&state, preview_id, path_token, &options, headers).await;
    let Some(preview) = preview else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Preview not found or expired"})),
        )
            .into_response());
    };

    let Some(first) = resource.first() else {
        let body = json!({"d": {"EntitySets": ["PreviewSet"]}});
        return Ok((StatusCode::OK, ODATA_HEADERS, Json(body)).into_response());
    };

    if *first == "$metadata" {
        let columns = normalize_columns(&preview.model_data);
        let xml = build_metadata_xml(&columns).map_err(|err| {
            warn!("Failed to build metadata document: {}", err);
            ApiError::internal("Failed to build metadata document")
        })?;
        return Ok((
            StatusCode::OK,
            [
                ("Content-Type", "application/xml; charset=utf-8"),
                ("Cache-Control", "no-store"),
                ("DataServiceVersion", "2.0"),
                ("OData-Version", "2.0"),
            ],
            xml,
        )
            .into_response());
    }

    if !first.starts_with("PreviewSet") {
        return Ok((
            StatusCode::NOT_FOUND,
            ODATA_HEADERS,
            Json(json!({"error": "Entity set not found"})),
        )
            .into_response());
    }

    let rows = normalize_rows(&preview.model_data);
    let filtered = apply_filter(rows, options.filter.as_deref());

    if resource
        .get(1)
        .is_some_and(|segment| segment.eq_ignore_ascii_case("$count"))
    {
        return Ok((
            StatusCode::OK,
            [
                ("Content-Type", "text/plain; charset=utf-8"),
                ("Cache-Control", "no-store"),
                ("DataServiceVersion", "2.0"),
                ("OData-Version", "2.0"),
            ],
            filtered.len().to_string(),
        )
            .into_response());
    }

    let filtered_count = filtered.len();
    let ordered = apply_order_by(filtered, options.orderby.as_deref());
    let paged = apply_paging(ordered, options.skip_value(), options.top_value());
    let selected = apply_select(paged, options.select.as_deref());

    let service_root = build_service_root(headers, request_path);
    let results = attach_entity_metadata(selected, &service_root);

    let body = json!({
        "d": {
            "results": results,
            "__count": filtered_count.to_string(),
        }
    });
    Ok((StatusCode::OK, ODATA_HEADERS, Json(body)).into_response())
}

/// Store hit wins; otherwise each token source is tried in order (path, then
/// query, then the Referer's query string) and the first token that parses
/// resolves the preview. An invalid token in one source never masks a valid
/// one further down the chain.
async fn resolve_preview(
    state: &AppState,
    preview_id: &str,
    path_token: Option<&str>,
    options: &ODataQueryOptions,
    headers: &HeaderMap,
) -> Option<PreviewPayload> {
    if let Some(entry) = state.preview_store.get(preview_id).await {
        return Some(entry.into());
    }
    let candidates = [
        path_token.map(str::to_string),
        options.token.clone(),
        referer_token(headers),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|token| state.token_service.parse_token(&token))
        .map(PreviewPayload::from)
}

fn referer_token(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let url = url::Url::parse(referer).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}

/// Everything before the `PreviewSet` segment, absolutized with the Host
/// header when one arrived. Entity uris in `__metadata` hang off this root.
fn build_service_root(headers: &HeaderMap, request_path: &str) -> String {
    let base_path = PREVIEW_SET_TAIL.replace(request_path, "").into_owned();
    match headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
    {
        Some(host) => format!("http://{}{}", host, base_path),
        None => base_path,
    }
}
