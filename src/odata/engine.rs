//! Turns a preview's `modelData` into an OData V2 entity set.
//!
//! Rows are whatever objects `modelData.items` holds, keyed by a synthetic
//! `__row_id`. Columns come from the injected `__previewColumns` metadata
//! when present, otherwise from the keys of the first data row.

use serde_json::{json, Map, Value};
use std::cmp::Ordering;

use super::filter::{value_to_lower_string, value_to_number};
use crate::models::field::FieldType;

/// One property of the generated entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityColumn {
    pub key: String,
    pub label: String,
    pub kind: FieldType,
}

/// Columns advertised in `$metadata`. `__previewColumns` entries win; rows
/// only contribute their keys when no usable column metadata exists.
pub fn normalize_columns(model_data: &Map<String, Value>) -> Vec<EntityColumn> {
    if let Some(raw_columns) = model_data.get("__previewColumns").and_then(Value::as_array) {
        let columns: Vec<EntityColumn> = raw_columns.iter().filter_map(parse_column).collect();
        if !columns.is_empty() {
            return columns;
        }
    }
    let first_row = model_data
        .get("items")
        .and_then(Value::as_array)
        .and_then(|items| items.iter().find_map(Value::as_object));
    let Some(first_row) = first_row else {
        return Vec::new();
    };
    first_row
        .keys()
        .map(|key| EntityColumn {
            key: key.clone(),
            label: key.clone(),
            kind: FieldType::String,
        })
        .collect()
}

fn parse_column(raw: &Value) -> Option<EntityColumn> {
    let record = raw.as_object()?;
    let key = record
        .get("key")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|key| !key.is_empty())?;
    let label = record
        .get("label")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(key);
    // Enum columns render as plain strings on the wire.
    let kind = match record
        .get("type")
        .and_then(Value::as_str)
        .and_then(FieldType::parse)
    {
        Some(kind @ (FieldType::Number | FieldType::Date | FieldType::Boolean)) => kind,
        _ => FieldType::String,
    };
    Some(EntityColumn {
        key: key.to_string(),
        label: label.to_string(),
        kind,
    })
}

/// Object entries of `modelData.items` with a stable `__row_id` key
/// prepended. Non-object entries are dropped; ids count the kept rows.
pub fn normalize_rows(model_data: &Map<String, Value>) -> Vec<Map<String, Value>> {
    let Some(items) = model_data.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(index, row)| {
            let mut normalized = Map::new();
            normalized.insert("__row_id".to_string(), Value::String((index + 1).to_string()));
            normalized.extend(row.iter().map(|(key, value)| (key.clone(), value.clone())));
            normalized
        })
        .collect()
}

/// Stable multi-segment sort per `$orderby`. Numbers compare numerically
/// when both sides coerce, everything else falls back to case-insensitive
/// string order.
pub fn apply_order_by(
    mut rows: Vec<Map<String, Value>>,
    raw_order_by: Option<&str>,
) -> Vec<Map<String, Value>> {
    let Some(raw) = raw_order_by.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return rows;
    };
    let segments: Vec<(String, bool)> = raw
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let mut parts = segment.split_whitespace();
            let field = parts.next()?;
            let descending = parts
                .next()
                .is_some_and(|direction| direction.eq_ignore_ascii_case("desc"));
            Some((field.to_string(), descending))
        })
        .collect();
    if segments.is_empty() {
        return rows;
    }
    rows.sort_by(|a, b| {
        for (field, descending) in &segments {
            let ordering = compare_values(a.get(field), b.get(field));
            if ordering != Ordering::Equal {
                return if *descending { ordering.reverse() } else { ordering };
            }
        }
        Ordering::Equal
    });
    rows
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    if left == right {
        return Ordering::Equal;
    }
    if let (Some(left_num), Some(right_num)) = (value_to_number(left), value_to_number(right)) {
        return left_num.total_cmp(&right_num);
    }
    value_to_lower_string(left).cmp(&value_to_lower_string(right))
}

/// `$skip`/`$top` window over the filtered, ordered rows.
pub fn apply_paging(
    rows: Vec<Map<String, Value>>,
    skip: usize,
    top: Option<usize>,
) -> Vec<Map<String, Value>> {
    let remaining = rows.into_iter().skip(skip);
    match top {
        Some(limit) => remaining.take(limit).collect(),
        None => remaining.collect(),
    }
}

/// `$select` projection. Navigation-path segments keep their last component,
/// duplicates collapse, and `__row_id` is always carried so entity uris stay
/// resolvable.
pub fn apply_select(
    rows: Vec<Map<String, Value>>,
    raw_select: Option<&str>,
) -> Vec<Map<String, Value>> {
    let Some(raw) = raw_select.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return rows;
    };
    let mut fields: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let field = trimmed.rsplit('/').next().unwrap_or(trimmed);
        if field.is_empty() {
            continue;
        }
        if !fields.iter().any(|existing| existing == field) {
            fields.push(field.to_string());
        }
    }
    if fields.is_empty() {
        return rows;
    }
    if !fields.iter().any(|field| field == "__row_id") {
        fields.push("__row_id".to_string());
    }
    rows.into_iter()
        .map(|row| {
            let mut selected = Map::new();
            for field in &fields {
                if let Some(value) = row.get(field) {
                    selected.insert(field.clone(), value.clone());
                }
            }
            selected
        })
        .collect()
}

/// Prepends the V2 `__metadata` envelope to every row.
pub fn attach_entity_metadata(
    rows: Vec<Map<String, Value>>,
    service_root: &str,
) -> Vec<Map<String, Value>> {
    rows.into_iter()
        .map(|row| {
            let row_id = match row.get("__row_id") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
            };
            let mut with_metadata = Map::new();
            with_metadata.insert(
                "__metadata".to_string(),
                json!({
                    "uri": format!(
                        "{}PreviewSet('{}')",
                        service_root,
                        urlencoding::encode(&row_id)
                    ),
                    "type": "PreviewService.PreviewType",
                }),
            );
            with_metadata.extend(row);
            with_metadata
        })
        .collect()
}
