//! Preview payload builder.
//!
//! Turns a loosely-validated create request into a renderable preview:
//! resolves field mappings (explicit fields, else inference from the first
//! mock row, else placeholders), normalizes mock rows onto sanitized binding
//! keys, synthesizes the default table view markup when the caller did not
//! supply markup, and attaches column metadata for the runtime's table and
//! filter bars.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::models::controller::normalize_controller_config;
use crate::models::field::{normalize_lookup_key, sanitize_binding_key, FieldMapping, FieldType, PreviewColumnMeta};
use crate::models::preview::{CreatePreviewRequest, PreviewPayload};

const DEFAULT_CDS_VIEW: &str = "I_AdhocPreview";
const DEFAULT_PREVIEW_NAME: &str = "Generated Report Preview";
const SYNTHETIC_ROW_COUNT: usize = 8;

/// Build failures the route layer maps to 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewBuildError {
    /// Neither custom markup nor any field configuration was supplied
    #[error("Provide either (viewXml) or a non-empty fields array")]
    MissingContent,
    /// Free-form controller scripts are rejected outright
    #[error("controllerJs is disabled for security reasons. Use the declarative controller object instead.")]
    ScriptingDisabled,
}

pub struct PreviewService;

impl PreviewService {
    /// Builds the stored payload from a create request. Validation order
    /// matters: missing content is reported before the script rejection.
    pub fn build_payload(request: &CreatePreviewRequest) -> Result<PreviewPayload, PreviewBuildError> {
        let has_direct_ui5_content = request.view_xml.as_deref().is_some_and(|xml| !xml.is_empty());
        let has_field_config = request.fields.as_deref().is_some_and(|fields| !fields.is_empty());

        if !has_direct_ui5_content && !has_field_config {
            return Err(PreviewBuildError::MissingContent);
        }
        if request
            .controller_js
            .as_deref()
            .is_some_and(|script| !script.trim().is_empty())
        {
            return Err(PreviewBuildError::ScriptingDisabled);
        }

        let mock_data = request.mock_data.as_deref();
        let fields = Self::resolve_fields(request.fields.as_deref(), mock_data);
        let filter_fields = match request.filter_fields.as_deref() {
            Some(list) if !list.is_empty() => Self::resolve_fields(Some(list), mock_data),
            _ => fields.clone(),
        };
        let data_fields = Self::merge_unique_fields(&fields, &filter_fields);

        let view_xml = if has_direct_ui5_content {
            request.view_xml.clone().unwrap_or_default()
        } else {
            Self::build_default_view_xml(&fields)
        };

        let mut model_data = match &request.model_data {
            Some(data) => data.clone(),
            None => {
                let mut data = Map::new();
                data.insert(
                    "items".to_string(),
                    Value::Array(Self::normalize_rows(&data_fields, mock_data)),
                );
                data
            }
        };
        if !has_direct_ui5_content {
            // Column metadata the runtime needs to assemble its table and
            // filter bar; only meaningful next to generated markup.
            model_data.insert(
                "__previewColumns".to_string(),
                columns_to_value(&Self::build_preview_columns(&fields)),
            );
            model_data.insert(
                "__previewFilters".to_string(),
                columns_to_value(&Self::build_preview_columns(&filter_fields)),
            );
        }

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PREVIEW_NAME)
            .to_string();

        Ok(PreviewPayload {
            name,
            view_xml,
            controller: normalize_controller_config(request.controller.as_ref()),
            model_data,
        })
    }

    /// Resolution chain: explicit field entries, else inference from the
    /// first object row of the mock data, else three placeholders.
    pub fn resolve_fields(
        fields_input: Option<&[Value]>,
        mock_data: Option<&[Value]>,
    ) -> Vec<FieldMapping> {
        if let Some(entries) = fields_input {
            let fields: Vec<FieldMapping> = entries.iter().filter_map(parse_field_entry).collect();
            if !fields.is_empty() {
                return fields;
            }
        }

        let first_row = mock_data.and_then(|rows| rows.iter().find_map(Value::as_object));
        if let Some(row) = first_row {
            let inferred: Vec<FieldMapping> = row
                .iter()
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, sample)| FieldMapping {
                    display_name: key.clone(),
                    cds_field: sanitize_binding_key(key),
                    cds_view: DEFAULT_CDS_VIEW.to_string(),
                    field_type: FieldType::infer_from_value(sample),
                    enum_values: None,
                })
                .collect();
            if !inferred.is_empty() {
                return inferred;
            }
        }

        default_fallback_fields()
    }

    /// Projects every mock row onto the resolved fields, keyed by sanitized
    /// binding key. Without mock data, emits 8 synthetic rows so the preview
    /// table is never empty.
    pub fn normalize_rows(fields: &[FieldMapping], mock_data: Option<&[Value]>) -> Vec<Value> {
        let rows = match mock_data {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                return (0..SYNTHETIC_ROW_COUNT)
                    .map(|index| {
                        let mut row = Map::new();
                        for field in fields {
                            row.insert(field.binding_key(), fallback_value(field, index));
                        }
                        Value::Object(row)
                    })
                    .collect();
            }
        };

        rows.iter()
            .enumerate()
            .map(|(row_index, source)| {
                let mut row = Map::new();
                for field in fields {
                    let value = source
                        .as_object()
                        .and_then(|record| find_value_in_row(record, field))
                        .unwrap_or_else(|| fallback_value(field, row_index));
                    row.insert(field.binding_key(), value);
                }
                Value::Object(row)
            })
            .collect()
    }

    /// Minimal table view used when the caller supplies no markup.
    pub fn build_default_view_xml(fields: &[FieldMapping]) -> String {
        let columns = fields
            .iter()
            .map(|field| {
                format!(
                    "            <Column><header><Label text=\"{}\" /></header></Column>",
                    quick_xml::escape::escape(field.display_name.as_str())
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let cells = fields
            .iter()
            .map(|field| format!("                <Text text=\"{{{}}}\" />", field.binding_key()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "<mvc:View\n  xmlns:mvc=\"sap.ui.core.mvc\"\n  xmlns=\"sap.m\">\n  <Page title=\"AI Report Preview\">\n    <content>\n      <Table items=\"{{/items}}\" width=\"auto\" sticky=\"ColumnHeaders\">\n        <columns>\n{}\n        </columns>\n        <items>\n          <ColumnListItem>\n            <cells>\n{}\n            </cells>\n          </ColumnListItem>\n        </items>\n      </Table>\n    </content>\n  </Page>\n</mvc:View>",
            columns, cells
        )
    }

    pub fn build_preview_columns(fields: &[FieldMapping]) -> Vec<PreviewColumnMeta> {
        fields
            .iter()
            .map(|field| PreviewColumnMeta {
                key: field.binding_key(),
                label: field.display_name.clone(),
                column_type: field.field_type,
                enum_values: field.enum_values.clone(),
            })
            .collect()
    }

    /// Union of table and filter fields, first occurrence per binding key wins.
    pub fn merge_unique_fields(fields: &[FieldMapping], filter_fields: &[FieldMapping]) -> Vec<FieldMapping> {
        let mut seen = std::collections::HashSet::new();
        let mut merged = Vec::new();
        for field in fields.iter().chain(filter_fields.iter()) {
            if seen.insert(field.binding_key()) {
                merged.push(field.clone());
            }
        }
        merged
    }
}

fn default_fallback_fields() -> Vec<FieldMapping> {
    (1..=3)
        .map(|n| {
            FieldMapping::new(
                &format!("Field {}", n),
                &format!("Field{}", n),
                DEFAULT_CDS_VIEW,
                FieldType::String,
            )
        })
        .collect()
}

/// A field entry survives only if it is an object with a non-blank
/// `displayName`. Technical name and view fall back to the sanitized display
/// name and the ad-hoc view; unknown types collapse to string.
fn parse_field_entry(entry: &Value) -> Option<FieldMapping> {
    let record = entry.as_object()?;
    let display_name = record.get("displayName")?.as_str()?.trim();
    if display_name.is_empty() {
        return None;
    }

    let cds_field = record
        .get("cdsField")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    let cds_view = record
        .get("cdsView")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    let field_type = record
        .get("type")
        .and_then(Value::as_str)
        .and_then(FieldType::parse)
        .unwrap_or_default();
    let enum_values = record.get("enumValues").and_then(Value::as_array).map(|values| {
        values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    });

    Some(FieldMapping {
        display_name: display_name.to_string(),
        cds_field: if cds_field.is_empty() {
            sanitize_binding_key(display_name)
        } else {
            cds_field.to_string()
        },
        cds_view: if cds_view.is_empty() {
            DEFAULT_CDS_VIEW.to_string()
        } else {
            cds_view.to_string()
        },
        field_type,
        enum_values,
    })
}

/// Index-derived placeholder when a row has no usable value for a field.
fn fallback_value(field: &FieldMapping, index: usize) -> Value {
    match field.field_type {
        FieldType::Number => json!((index as i64 + 1) * 10),
        FieldType::Date => {
            let day = Utc::now() - Duration::days(index as i64);
            json!(day.format("%Y-%m-%d").to_string())
        }
        FieldType::Boolean => json!(index % 2 == 0),
        FieldType::Enum => match field.enum_values.as_deref() {
            Some(values) if !values.is_empty() => json!(values[index % values.len()].clone()),
            _ => json!("N/A"),
        },
        FieldType::String => json!(format!("{} {}", field.display_name, index + 1)),
    }
}

/// Tolerant row lookup: display name, technical name, and binding key first,
/// then a diacritics-insensitive scan over the row's keys. Null values are
/// skipped the same as missing keys.
fn find_value_in_row(source_row: &Map<String, Value>, field: &FieldMapping) -> Option<Value> {
    let binding_key = field.binding_key();
    let direct = [
        field.display_name.as_str(),
        field.cds_field.as_str(),
        binding_key.as_str(),
    ]
    .iter()
    .find_map(|key| source_row.get(*key).filter(|value| !value.is_null()));
    if let Some(value) = direct {
        return Some(value.clone());
    }

    let targets = [
        normalize_lookup_key(&field.display_name),
        normalize_lookup_key(&field.cds_field),
        normalize_lookup_key(&binding_key),
    ];
    for (key, value) in source_row {
        if targets.contains(&normalize_lookup_key(key)) && !value.is_null() {
            return Some(value.clone());
        }
    }
    None
}

fn columns_to_value(columns: &[PreviewColumnMeta]) -> Value {
    serde_json::to_value(columns).unwrap_or_else(|_| json!([]))
}
