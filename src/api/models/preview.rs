use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::controller::PreviewControllerConfig;
use crate::models::field::FieldMapping;

/// Body of `POST /api/v1/preview`. Everything is optional on the wire; the
/// builder decides what is missing vs merely absent.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePreviewRequest {
    pub name: Option<String>,
    pub view_xml: Option<String>,
    /// Free-form controller scripts are rejected; present for the 400 path only.
    pub controller_js: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub controller: Option<Value>,
    /// Loosely-shaped field mappings; malformed entries are skipped, not errors.
    #[schema(value_type = Option<Vec<Object>>)]
    pub fields: Option<Vec<Value>>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub filter_fields: Option<Vec<Value>>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub mock_data: Option<Vec<Value>>,
    #[schema(value_type = Option<Object>)]
    pub model_data: Option<Map<String, Value>>,
}

/// A fully-resolved preview: what the store keeps (plus id/createdAt) and
/// what the renderer and the OData engine consume. Also the payload a token
/// reconstructs when the store has already forgotten the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPayload {
    pub name: String,
    pub view_xml: String,
    pub controller: PreviewControllerConfig,
    pub model_data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub id: String,
    pub name: String,
    pub view_xml: String,
    pub controller: PreviewControllerConfig,
    pub model_data: Map<String, Value>,
    /// RFC 3339. Kept as a string so an unparsable value can be treated as
    /// expired instead of failing the whole store.
    pub created_at: String,
}

impl From<PreviewEntry> for PreviewPayload {
    fn from(entry: PreviewEntry) -> Self {
        Self {
            name: entry.name,
            view_xml: entry.view_xml,
            controller: entry.controller,
            model_data: entry.model_data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewCreateResponse {
    pub preview_id: String,
    pub preview_url: String,
    pub preview_token: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MapFieldsRequest {
    pub prompt: Option<String>,
    pub force_mock: bool,
}

/// Where a mapping response came from. `external` is a validated LLM answer;
/// `mock` is the deliberate heuristic path; `mock-fallback` means the LLM was
/// tried and failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MappingSource {
    External,
    Mock,
    MockFallback,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MapFieldsMeta {
    pub source: MappingSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MapFieldsResponse {
    pub fields: Vec<FieldMapping>,
    #[serde(rename = "_meta")]
    pub meta: MapFieldsMeta,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MockDataRequest {
    pub fields: Vec<FieldMapping>,
    pub row_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MockDataResponse {
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Map<String, Value>>,
}
