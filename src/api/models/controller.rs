use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONTROLLER_CONFIG_VERSION: u32 = 1;
pub const MAX_INITIAL_FILTERS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PreviewInitialFilter {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PreviewDefaultSort {
    pub field: String,
    pub direction: SortDirection,
}

/// Declarative controller configuration attached to a preview. The only
/// sanctioned replacement for free-form controller scripts, which the
/// preview API rejects outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewControllerConfig {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_filters: Option<Vec<PreviewInitialFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<PreviewDefaultSort>,
}

impl Default for PreviewControllerConfig {
    fn default() -> Self {
        Self {
            version: CONTROLLER_CONFIG_VERSION,
            initial_filters: None,
            default_sort: None,
        }
    }
}

/// Collapses internal whitespace runs to single spaces and trims the ends.
pub fn normalize_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes untrusted controller input into a well-formed config.
/// Anything that is not an object tagged `version: 1` collapses to the
/// bare default; malformed filters and sorts are dropped one by one.
/// Never fails.
pub fn normalize_controller_config(input: Option<&Value>) -> PreviewControllerConfig {
    let Some(Value::Object(raw)) = input else {
        return PreviewControllerConfig::default();
    };
    let version_ok = raw
        .get("version")
        .and_then(Value::as_f64)
        .is_some_and(|v| v == 1.0);
    if !version_ok {
        return PreviewControllerConfig::default();
    }

    let mut config = PreviewControllerConfig::default();

    if let Some(Value::Array(entries)) = raw.get("initialFilters") {
        let filters: Vec<PreviewInitialFilter> = entries
            .iter()
            .filter_map(|entry| {
                let item = entry.as_object()?;
                let field = item
                    .get("field")
                    .and_then(Value::as_str)
                    .map(normalize_text)
                    .unwrap_or_default();
                let value = item
                    .get("value")
                    .and_then(Value::as_str)
                    .map(normalize_text)
                    .unwrap_or_default();
                if field.is_empty() || value.is_empty() {
                    return None;
                }
                Some(PreviewInitialFilter { field, value })
            })
            .take(MAX_INITIAL_FILTERS)
            .collect();
        if !filters.is_empty() {
            config.initial_filters = Some(filters);
        }
    }

    if let Some(Value::Object(sort)) = raw.get("defaultSort") {
        let field = sort
            .get("field")
            .and_then(Value::as_str)
            .map(normalize_text)
            .unwrap_or_default();
        if !field.is_empty() {
            let direction = match sort.get("direction").and_then(Value::as_str) {
                Some("desc") => SortDirection::Desc,
                _ => SortDirection::Asc,
            };
            config.default_sort = Some(PreviewDefaultSort { field, direction });
        }
    }

    config
}
