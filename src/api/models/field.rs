use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

static ISO_DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("Invalid ISO date regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Date,
    Boolean,
    Enum,
}

impl FieldType {
    /// Parses a loosely-typed wire value; anything unrecognized is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "date" => Some(Self::Date),
            "boolean" => Some(Self::Boolean),
            "enum" => Some(Self::Enum),
            _ => None,
        }
    }

    pub fn infer_from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(_) => Self::Number,
            serde_json::Value::Bool(_) => Self::Boolean,
            serde_json::Value::String(text) => {
                if ISO_DATE_PREFIX.is_match(text) {
                    Self::Date
                } else {
                    Self::String
                }
            }
            _ => Self::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub display_name: String,
    pub cds_field: String,
    pub cds_view: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl FieldMapping {
    pub fn new(display_name: &str, cds_field: &str, cds_view: &str, field_type: FieldType) -> Self {
        Self {
            display_name: display_name.to_string(),
            cds_field: cds_field.to_string(),
            cds_view: cds_view.to_string(),
            field_type,
            enum_values: None,
        }
    }

    pub fn with_enum_values(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// The identifier used for row lookups, generated bindings, and column keys.
    pub fn binding_key(&self) -> String {
        if self.cds_field.is_empty() {
            sanitize_binding_key(&self.display_name)
        } else {
            sanitize_binding_key(&self.cds_field)
        }
    }
}

/// Column descriptor shipped to the preview runtime alongside the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewColumnMeta {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

/// Maps an arbitrary display or CDS name onto `[A-Za-z_][A-Za-z0-9_]*`.
/// Every non-identifier character becomes an underscore; a leading digit
/// gets a `field_` prefix; empty input becomes `field`.
pub fn sanitize_binding_key(raw: &str) -> String {
    let sanitized: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        return "field".to_string();
    }
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("field_{}", sanitized);
    }
    sanitized
}

/// Folds a field name for tolerant row lookups: NFD-decompose (so accented
/// letters split from their marks), keep ASCII alphanumerics only, lowercase.
/// "Preço Médio" and "PrecoMedio" collapse to the same key.
pub fn normalize_lookup_key(raw: &str) -> String {
    raw.nfd()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
