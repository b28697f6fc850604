//! OpenAPI specification definition.
//!
//! Aggregates all route handlers and schemas for OpenAPI documentation generation.

use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Preview
        crate::routes::preview::create_preview,
        crate::routes::preview::render_preview,
        // OData
        crate::routes::odata::query_service_root,
        // Mapping
        crate::routes::map_fields::map_fields,
        crate::routes::mock_data::generate_mock_data,
        // OpenAPI
        crate::routes::openapi::serve_openapi_json,
    ),
    components(schemas(
        crate::models::FieldType,
        crate::models::FieldMapping,
        crate::models::PreviewColumnMeta,
        crate::models::SortDirection,
        crate::models::PreviewInitialFilter,
        crate::models::PreviewDefaultSort,
        crate::models::PreviewControllerConfig,
        crate::models::CreatePreviewRequest,
        crate::models::PreviewCreateResponse,
        crate::models::MappingSource,
        crate::models::MapFieldsMeta,
        crate::models::MapFieldsRequest,
        crate::models::MapFieldsResponse,
        crate::models::MockDataRequest,
        crate::models::MockDataResponse,
    )),
    modifiers(&VersionAddon),
    tags(
        (name = "Preview", description = "Preview creation and sandbox rendering"),
        (name = "OData", description = "Mock OData V2 backend for preview data"),
        (name = "Mapping", description = "Prompt-to-field mapping and mock data generation"),
        (name = "OpenAPI", description = "OpenAPI specification"),
    ),
    info(
        title = "AI Report Preview API",
        description = "Prompt-to-report field mapping with a mock OData V2 preview backend",
        version = "1.0.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8081/api/v1", description = "Local development server")
    )
)]
pub struct ApiDoc;

struct VersionAddon;

impl Modify for VersionAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // Keep the served version in lockstep with Cargo.toml
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    }
}
