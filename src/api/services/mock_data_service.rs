//! Name-heuristic mock row generator.
//!
//! Rows are keyed by display name and filled from pools chosen by keyword
//! (order numbers, product names, customers, statuses, descriptions) or by
//! type (numeric ranges, rolling dates, alternating booleans, enum cycling).
//! All values derive from the row index, so identical requests produce
//! identical rows.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

use crate::models::field::{FieldMapping, FieldType};

pub const DEFAULT_ROW_COUNT: usize = 10;
pub const MAX_ROW_COUNT: usize = 200;

const PRODUCTS: [&str; 8] = [
    "Laptop",
    "Mouse",
    "Keyboard",
    "Monitor",
    "Headphones",
    "Webcam",
    "USB Cable",
    "Charger",
];
const CUSTOMERS: [&str; 5] = [
    "Acme Corp",
    "TechStart Inc",
    "Global Solutions",
    "Enterprise Ltd",
    "Innovation Co",
];
const STATUSES: [&str; 5] = ["Open", "In Progress", "Completed", "Cancelled", "On Hold"];
const DESCRIPTIONS: [&str; 5] = [
    "Standard delivery",
    "Express shipping required",
    "Customer requested gift wrap",
    "Bulk order discount applied",
    "Priority processing",
];
const ENUM_STATUSES: [&str; 4] = ["Open", "In Progress", "Completed", "Cancelled"];
const PRIORITIES: [&str; 4] = ["Low", "Medium", "High", "Critical"];
const CATEGORY_TYPES: [&str; 3] = ["Type A", "Type B", "Type C"];

pub struct MockDataService;

impl MockDataService {
    /// Generates `row_count` rows (capped at 200), one value per field.
    pub fn generate_rows(fields: &[FieldMapping], row_count: usize) -> Vec<Map<String, Value>> {
        let count = row_count.min(MAX_ROW_COUNT);
        (0..count)
            .map(|index| {
                let mut row = Map::new();
                for field in fields {
                    row.insert(field.display_name.clone(), mock_value(field, index));
                }
                row
            })
            .collect()
    }
}

fn mock_value(field: &FieldMapping, index: usize) -> Value {
    match field.field_type {
        FieldType::String => string_value(&field.display_name, index),
        FieldType::Number => number_value(&field.display_name, index),
        FieldType::Date => date_value(index),
        FieldType::Boolean => json!(index % 2 == 0),
        FieldType::Enum => match field.enum_values.as_deref() {
            Some(values) if !values.is_empty() => json!(values[index % values.len()].clone()),
            _ => enum_value(&field.display_name, index),
        },
    }
}

fn string_value(field_name: &str, index: usize) -> Value {
    let lower_name = field_name.to_lowercase();

    if lower_name.contains("order") {
        return json!(format!("SO-{:06}", 1000 + index));
    }
    if lower_name.contains("item") || lower_name.contains("product") {
        return json!(PRODUCTS[index % PRODUCTS.len()]);
    }
    if lower_name.contains("customer") || lower_name.contains("client") {
        return json!(CUSTOMERS[index % CUSTOMERS.len()]);
    }
    if lower_name.contains("status") {
        return json!(STATUSES[index % STATUSES.len()]);
    }
    if lower_name.contains("name") {
        return json!(format!("Item {}", index + 1));
    }
    if lower_name.contains("text")
        || lower_name.contains("description")
        || lower_name.contains("comment")
    {
        return json!(DESCRIPTIONS[index % DESCRIPTIONS.len()]);
    }

    json!(format!("{} {}", field_name, index + 1))
}

fn number_value(field_name: &str, index: usize) -> Value {
    let lower_name = field_name.to_lowercase();

    if lower_name.contains("quantity") || lower_name.contains("qty") {
        return json!(((index * 37) % 100 + 1) as i64);
    }
    if lower_name.contains("price") || lower_name.contains("amount") || lower_name.contains("total")
    {
        let raw = 100.0 + (index as f64 * 1234.56) % 10000.0;
        return json!((raw * 100.0).round() / 100.0);
    }
    if lower_name.contains("id") {
        return json!((1000 + index) as i64);
    }

    json!(((index * 97) % 1000 + 1) as i64)
}

/// A date within 45 days of today, rolling with the row index.
fn date_value(index: usize) -> Value {
    let offset_days = ((index * 11) % 91) as i64 - 45;
    let date = Utc::now() + Duration::days(offset_days);
    json!(date.format("%Y-%m-%d").to_string())
}

fn enum_value(field_name: &str, index: usize) -> Value {
    let lower_name = field_name.to_lowercase();

    if lower_name.contains("status") {
        return json!(ENUM_STATUSES[index % ENUM_STATUSES.len()]);
    }
    if lower_name.contains("priority") {
        return json!(PRIORITIES[index % PRIORITIES.len()]);
    }
    if lower_name.contains("type") || lower_name.contains("category") {
        return json!(CATEGORY_TYPES[index % CATEGORY_TYPES.len()]);
    }

    json!(format!("Option {}", index % 3 + 1))
}
