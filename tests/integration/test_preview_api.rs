//! End-to-end tests for the preview API: creation, sandbox rendering, token
//! fallback, and the mock OData V2 backend.

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use report_preview_api::routes::{create_api_router, create_app_state};
use report_preview_api::services::token_service::PreviewTokenService;
use serde_json::{json, Value};
use serial_test::serial;

fn create_test_server() -> TestServer {
    let app_state = create_app_state();
    let router = axum::Router::new()
        .nest("/api/v1", create_api_router(app_state.clone()))
        .with_state(app_state);
    TestServer::new(router).unwrap()
}

fn sample_preview_body() -> Value {
    json!({
        "name": "Sales Report",
        "fields": [
            {"displayName": "ProductName", "cdsField": "ProductName", "cdsView": "I_Product", "type": "string"},
            {"displayName": "Quantity", "cdsField": "Quantity", "cdsView": "I_SalesOrderItem", "type": "number"},
        ],
        "mockData": [
            {"ProductName": "Laptop", "Quantity": 5},
            {"ProductName": "Mouse", "Quantity": 20},
            {"ProductName": "Keyboard", "Quantity": 1},
            {"ProductName": "Monitor", "Quantity": 15},
        ]
    })
}

async fn create_preview(server: &TestServer) -> Value {
    let response = server.post("/api/v1/preview").json(&sample_preview_body()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json()
}

#[tokio::test]
async fn test_create_preview_contract() {
    let server = create_test_server();
    let body = create_preview(&server).await;

    let id = body["previewId"].as_str().unwrap();
    assert!(!id.is_empty());
    assert!(body["previewToken"].as_str().unwrap().contains('.'));
    assert!(body["previewUrl"]
        .as_str()
        .unwrap()
        .starts_with(&format!("/api/v1/preview/{}?token=", id)));
    assert!(body["createdAt"].as_str().is_some());
}

#[tokio::test]
async fn test_create_preview_without_content_is_400() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/preview")
        .json(&json!({"fields": [], "name": "Empty"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("fields"));
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_create_preview_with_controller_script_is_400() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/preview")
        .json(&json!({
            "fields": [{"displayName": "Order"}],
            "controllerJs": "alert(1)"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("disabled"));
}

#[tokio::test]
async fn test_render_preview_html() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let id = created["previewId"].as_str().unwrap();

    let response = server.get(&format!("/api/v1/preview/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = response.text();
    assert!(html.contains("<title>Sales Report</title>"));
    assert!(html.contains("previewPayload"));
    // Payload markup is unicode-escaped, never raw, inside the inline script.
    assert!(html.contains("\\u003cmvc:View"));
}

#[tokio::test]
async fn test_render_unknown_preview_is_404_text() {
    let server = create_test_server();
    let response = server.get("/api/v1/preview/no-such-preview").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Preview not found or expired");
}

#[tokio::test]
async fn test_token_resolves_preview_after_store_miss() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let token = created["previewToken"].as_str().unwrap();

    // The id does not exist; only the token carries the preview state.
    let response = server
        .get(&format!("/api/v1/preview/ghost?token={}", token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("<title>Sales Report</title>"));

    let response = server.get("/api/v1/preview/ghost?token=not-a-token").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_odata_service_document() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let id = created["previewId"].as_str().unwrap();

    let response = server.get(&format!("/api/v1/preview/{}/odata", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("DataServiceVersion")
            .unwrap()
            .to_str()
            .unwrap(),
        "2.0"
    );
    let body: Value = response.json();
    assert_eq!(body["d"]["EntitySets"], json!(["PreviewSet"]));
}

#[tokio::test]
async fn test_odata_metadata_document() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let id = created["previewId"].as_str().unwrap();

    let response = server
        .get(&format!("/api/v1/preview/{}/odata/$metadata", id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/xml"));

    let xml = response.text();
    assert!(xml.contains("<EntityType Name=\"PreviewType\">"));
    assert!(xml.contains("<PropertyRef Name=\"__row_id\"/>"));
    assert!(xml.contains("<Property Name=\"ProductName\" Type=\"Edm.String\""));
    assert!(xml.contains("<Property Name=\"Quantity\" Type=\"Edm.Decimal\""));
}

#[tokio::test]
async fn test_odata_collection_query_pipeline() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let id = created["previewId"].as_str().unwrap();

    let response = server
        .get(&format!(
            "/api/v1/preview/{}/odata/PreviewSet?$filter=Quantity%20gt%202&$orderby=Quantity%20desc&$top=2&$select=ProductName",
            id
        ))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    // Three rows pass the filter; the page holds the top two by quantity.
    assert_eq!(body["d"]["__count"], "3");
    let results = body["d"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["ProductName"], "Mouse");
    assert_eq!(results[1]["ProductName"], "Monitor");
    // Projection keeps the synthetic key and the V2 metadata block.
    assert!(results[0].get("__row_id").is_some());
    assert!(results[0].get("Quantity").is_none());
    let uri = results[0]["__metadata"]["uri"].as_str().unwrap();
    assert!(uri.contains(&format!("/api/v1/preview/{}/odata/PreviewSet(", id)));
}

#[tokio::test]
async fn test_odata_count_is_plain_text() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let id = created["previewId"].as_str().unwrap();

    let response = server
        .get(&format!(
            "/api/v1/preview/{}/odata/PreviewSet/$count?$filter=substringof('lap',%20ProductName)",
            id
        ))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(response.text(), "1");
}

#[tokio::test]
async fn test_odata_unknown_entity_set_is_404() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let id = created["previewId"].as_str().unwrap();

    let response = server
        .get(&format!("/api/v1/preview/{}/odata/OrderSet", id))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Entity set not found");
}

#[tokio::test]
async fn test_odata_unknown_preview_is_404() {
    let server = create_test_server();
    let response = server.get("/api/v1/preview/ghost/odata/PreviewSet").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Preview not found or expired");
}

#[tokio::test]
async fn test_odata_token_in_path_segment() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let token = created["previewToken"].as_str().unwrap();

    let response = server
        .get(&format!("/api/v1/preview/ghost/odata/token/{}/PreviewSet", token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["d"]["results"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_odata_token_from_referer() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let token = created["previewToken"].as_str().unwrap();

    let referer = format!("http://localhost:8081/api/v1/preview/ghost?token={}", token);
    let response = server
        .get("/api/v1/preview/ghost/odata/PreviewSet")
        .add_header(header::REFERER, HeaderValue::from_str(&referer).unwrap())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

/// An unparsable token in one source must not mask a valid token further
/// down the chain (path, then query, then Referer).
#[tokio::test]
async fn test_odata_invalid_token_falls_through_to_next_source() {
    let server = create_test_server();
    let created = create_preview(&server).await;
    let token = created["previewToken"].as_str().unwrap();

    // Bad path token, valid query token.
    let response = server
        .get(&format!(
            "/api/v1/preview/ghost/odata/token/not-a-valid-token/PreviewSet?token={}",
            token
        ))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["d"]["results"].as_array().unwrap().len(), 4);

    // Bad query token, valid Referer token.
    let referer = format!("http://localhost:8081/api/v1/preview/ghost?token={}", token);
    let response = server
        .get("/api/v1/preview/ghost/odata/PreviewSet?token=garbage.garbage")
        .add_header(header::REFERER, HeaderValue::from_str(&referer).unwrap())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // Every source invalid still 404s.
    let response = server
        .get("/api/v1/preview/ghost/odata/token/bad/PreviewSet?token=also-bad")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_odata_head_and_options() {
    let server = create_test_server();

    let response = server.method(Method::HEAD, "/api/v1/preview/anything/odata").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .method(Method::OPTIONS, "/api/v1/preview/anything/odata/PreviewSet")
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers().get("Allow").unwrap().to_str().unwrap(),
        "GET,HEAD,OPTIONS"
    );
}

#[tokio::test]
async fn test_map_fields_blank_prompt_is_400() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/map-fields")
        .json(&json!({"prompt": "   "}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid prompt provided");
}

#[tokio::test]
async fn test_map_fields_force_mock() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/map-fields")
        .json(&json!({
            "prompt": "report with customer and net amount",
            "forceMock": true
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["_meta"]["source"], "mock");
    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0]["cdsField"], "CustomerName");
    assert_eq!(fields[1]["cdsField"], "NetAmount");
    assert_eq!(fields[1]["type"], "number");
}

#[tokio::test]
async fn test_mock_data_endpoint() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/mock-data")
        .json(&json!({
            "fields": [
                {"displayName": "Order", "cdsField": "OrderID", "cdsView": "I_SalesOrder", "type": "string"}
            ],
            "rowCount": 3
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["Order"], "SO-001000");

    let response = server.post("/api/v1/mock-data").json(&json!({"fields": []})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let server = create_test_server();
    let response = server.get("/api/v1/openapi.json").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["paths"].get("/preview").is_some());
    assert!(body["paths"].get("/map-fields").is_some());
}

/// The signing secret comes from the environment; two processes sharing the
/// secret accept each other's tokens.
#[tokio::test]
#[serial]
async fn test_token_secret_from_environment() {
    unsafe { std::env::set_var("PREVIEW_TOKEN_SECRET", "integration-secret") };
    let server = create_test_server();
    let created = create_preview(&server).await;
    let token = created["previewToken"].as_str().unwrap();

    let verifier = PreviewTokenService::new("integration-secret");
    assert!(verifier.parse_token(token).is_some());

    let stranger = PreviewTokenService::new("some-other-secret");
    assert!(stranger.parse_token(token).is_none());
    unsafe { std::env::remove_var("PREVIEW_TOKEN_SECRET") };
}
