//! Unit tests for the preview payload builder.

use report_preview_api::models::field::FieldType;
use report_preview_api::models::preview::CreatePreviewRequest;
use report_preview_api::services::preview_service::{PreviewBuildError, PreviewService};
use serde_json::{json, Value};

fn request_from(value: Value) -> CreatePreviewRequest {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_missing_content_is_rejected() {
    for body in [
        json!({}),
        json!({"fields": []}),
        json!({"name": "Report", "viewXml": ""}),
    ] {
        let result = PreviewService::build_payload(&request_from(body));
        assert_eq!(result.unwrap_err(), PreviewBuildError::MissingContent);
    }
}

#[test]
fn test_controller_scripts_are_rejected() {
    let body = json!({
        "fields": [{"displayName": "Order"}],
        "controllerJs": "onInit: function() { alert(1); }"
    });
    let result = PreviewService::build_payload(&request_from(body));
    assert_eq!(result.unwrap_err(), PreviewBuildError::ScriptingDisabled);

    // Whitespace-only scripts do not trip the rejection.
    let body = json!({
        "fields": [{"displayName": "Order"}],
        "controllerJs": "   \n\t"
    });
    assert!(PreviewService::build_payload(&request_from(body)).is_ok());
}

#[test]
fn test_missing_content_reported_before_script_rejection() {
    let body = json!({"controllerJs": "alert(1)"});
    let result = PreviewService::build_payload(&request_from(body));
    assert_eq!(result.unwrap_err(), PreviewBuildError::MissingContent);
}

#[test]
fn test_explicit_fields_are_defaulted_entry_by_entry() {
    let fields = PreviewService::resolve_fields(
        Some(&[
            json!({"displayName": "Net Amount", "type": "number"}),
            json!({"displayName": "Status", "cdsField": "Status", "cdsView": "I_SalesOrder", "type": "uuid"}),
            json!({"displayName": "   "}),
            json!("junk"),
        ]),
        None,
    );

    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].cds_field, "Net_Amount");
    assert_eq!(fields[0].cds_view, "I_AdhocPreview");
    assert_eq!(fields[0].field_type, FieldType::Number);
    // Unknown type collapses to string.
    assert_eq!(fields[1].field_type, FieldType::String);
    assert_eq!(fields[1].cds_view, "I_SalesOrder");
}

#[test]
fn test_fields_inferred_from_first_mock_row() {
    let rows = [json!({
        "Qty": 5,
        "Active": true,
        "CreatedOn": "2026-01-02T00:00:00Z",
        "Note": "standard delivery"
    })];
    let fields = PreviewService::resolve_fields(None, Some(&rows));

    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0].display_name, "Qty");
    assert_eq!(fields[0].field_type, FieldType::Number);
    assert_eq!(fields[1].field_type, FieldType::Boolean);
    assert_eq!(fields[2].field_type, FieldType::Date);
    assert_eq!(fields[3].field_type, FieldType::String);
}

#[test]
fn test_fallback_is_three_placeholder_fields() {
    let fields = PreviewService::resolve_fields(None, None);
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0].display_name, "Field 1");
    assert_eq!(fields[0].cds_field, "Field1");
    assert!(fields.iter().all(|f| f.field_type == FieldType::String));

    // An all-invalid explicit list falls through the same chain.
    let fields = PreviewService::resolve_fields(Some(&[json!({"cdsField": "NoName"})]), None);
    assert_eq!(fields.len(), 3);
}

#[test]
fn test_synthetic_rows_without_mock_data() {
    let fields = PreviewService::resolve_fields(
        Some(&[
            json!({"displayName": "Product", "type": "string"}),
            json!({"displayName": "Quantity", "type": "number"}),
            json!({"displayName": "Active", "type": "boolean"}),
            json!({"displayName": "Status", "type": "enum", "enumValues": ["Open", "Closed"]}),
        ]),
        None,
    );
    let rows = PreviewService::normalize_rows(&fields, None);

    assert_eq!(rows.len(), 8);
    let first = rows[0].as_object().unwrap();
    let second = rows[1].as_object().unwrap();
    assert_eq!(first.get("Product"), Some(&json!("Product 1")));
    assert_eq!(second.get("Product"), Some(&json!("Product 2")));
    assert_eq!(first.get("Quantity"), Some(&json!(10)));
    assert_eq!(second.get("Quantity"), Some(&json!(20)));
    assert_eq!(first.get("Active"), Some(&json!(true)));
    assert_eq!(second.get("Active"), Some(&json!(false)));
    // Enum placeholders cycle through the declared values.
    assert_eq!(first.get("Status"), Some(&json!("Open")));
    assert_eq!(second.get("Status"), Some(&json!("Closed")));
    assert_eq!(rows[2].as_object().unwrap().get("Status"), Some(&json!("Open")));
}

#[test]
fn test_row_lookup_by_display_technical_and_normalized_keys() {
    let fields = PreviewService::resolve_fields(
        Some(&[
            json!({"displayName": "Quantity", "cdsField": "Qty", "type": "number"}),
            json!({"displayName": "Preço Médio", "type": "number"}),
        ]),
        None,
    );

    // Display name, technical name, and a diacritics-stripped match.
    let rows = PreviewService::normalize_rows(
        &fields,
        Some(&[
            json!({"Quantity": 7, "PrecoMedio": 12.5}),
            json!({"Qty": 8, "preco medio": 13.5}),
        ]),
    );
    assert_eq!(rows[0].as_object().unwrap().get("Qty"), Some(&json!(7)));
    assert_eq!(rows[1].as_object().unwrap().get("Qty"), Some(&json!(8)));

    let binding_key = fields[1].binding_key();
    assert_eq!(rows[0].as_object().unwrap().get(&binding_key), Some(&json!(12.5)));
    assert_eq!(rows[1].as_object().unwrap().get(&binding_key), Some(&json!(13.5)));
}

#[test]
fn test_unmatched_row_values_use_index_placeholders() {
    let fields = PreviewService::resolve_fields(
        Some(&[json!({"displayName": "Quantity", "type": "number"})]),
        None,
    );
    let rows = PreviewService::normalize_rows(
        &fields,
        Some(&[json!({"Unrelated": 1}), json!({"Quantity": null}), json!({"Quantity": 99})]),
    );
    // Rows 0 and 1 miss (null counts as missing); the placeholder is keyed to
    // the row position.
    assert_eq!(rows[0].as_object().unwrap().get("Quantity"), Some(&json!(10)));
    assert_eq!(rows[1].as_object().unwrap().get("Quantity"), Some(&json!(20)));
    assert_eq!(rows[2].as_object().unwrap().get("Quantity"), Some(&json!(99)));
}

#[test]
fn test_merge_unique_fields_dedupes_on_binding_key() {
    let table = PreviewService::resolve_fields(
        Some(&[json!({"displayName": "A"}), json!({"displayName": "B"})]),
        None,
    );
    let filters = PreviewService::resolve_fields(
        Some(&[json!({"displayName": "B"}), json!({"displayName": "C"})]),
        None,
    );
    let merged = PreviewService::merge_unique_fields(&table, &filters);
    let names: Vec<&str> = merged.iter().map(|f| f.display_name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn test_generated_markup_lists_columns_in_field_order() {
    let fields = PreviewService::resolve_fields(
        Some(&[
            json!({"displayName": "Order <1>", "cdsField": "OrderID"}),
            json!({"displayName": "Quantity"}),
        ]),
        None,
    );
    let xml = PreviewService::build_default_view_xml(&fields);

    assert!(xml.contains("Order &lt;1&gt;"));
    assert!(xml.contains("{OrderID}"));
    assert!(xml.contains("{Quantity}"));
    assert!(
        xml.find("{OrderID}").unwrap() < xml.find("{Quantity}").unwrap(),
        "cell bindings out of field order"
    );
}

#[test]
fn test_generated_view_attaches_column_metadata() {
    let body = json!({
        "fields": [{"displayName": "Order"}, {"displayName": "Quantity", "type": "number"}],
        "filterFields": [{"displayName": "Order"}]
    });
    let payload = PreviewService::build_payload(&request_from(body)).unwrap();

    let columns = payload.model_data.get("__previewColumns").unwrap().as_array().unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[1]["key"], "Quantity");
    assert_eq!(columns[1]["type"], "number");

    let filters = payload.model_data.get("__previewFilters").unwrap().as_array().unwrap();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0]["key"], "Order");
}

#[test]
fn test_explicit_markup_skips_generated_metadata() {
    let body = json!({
        "viewXml": "<mvc:View><Text text=\"custom\" /></mvc:View>",
        "mockData": [{"Order": "SO-1"}]
    });
    let payload = PreviewService::build_payload(&request_from(body)).unwrap();

    assert_eq!(payload.view_xml, "<mvc:View><Text text=\"custom\" /></mvc:View>");
    assert!(!payload.model_data.contains_key("__previewColumns"));
    assert!(!payload.model_data.contains_key("__previewFilters"));
    // Rows are still normalized from the mock data.
    assert_eq!(payload.model_data.get("items").unwrap().as_array().unwrap().len(), 1);
}

#[test]
fn test_filter_fields_default_to_table_fields() {
    let body = json!({"fields": [{"displayName": "Order"}, {"displayName": "Status"}]});
    let payload = PreviewService::build_payload(&request_from(body)).unwrap();

    let columns = payload.model_data.get("__previewColumns").unwrap();
    let filters = payload.model_data.get("__previewFilters").unwrap();
    assert_eq!(columns, filters);
}

#[test]
fn test_supplied_model_data_is_passed_through() {
    let body = json!({
        "fields": [{"displayName": "Order"}],
        "modelData": {
            "items": [{"Order": "SO-9"}],
            "__smartTableOData": {"entitySet": "PreviewSet"}
        }
    });
    let payload = PreviewService::build_payload(&request_from(body)).unwrap();

    assert_eq!(
        payload.model_data.get("items").unwrap().as_array().unwrap().len(),
        1
    );
    assert!(payload.model_data.contains_key("__smartTableOData"));
    // Generated metadata is still attached next to generated markup.
    assert!(payload.model_data.contains_key("__previewColumns"));
}

#[test]
fn test_blank_name_gets_placeholder() {
    let body = json!({"name": "   ", "fields": [{"displayName": "Order"}]});
    let payload = PreviewService::build_payload(&request_from(body)).unwrap();
    assert_eq!(payload.name, "Generated Report Preview");

    let body = json!({"name": " Quarterly Sales ", "fields": [{"displayName": "Order"}]});
    let payload = PreviewService::build_payload(&request_from(body)).unwrap();
    assert_eq!(payload.name, "Quarterly Sales");
}

#[test]
fn test_malformed_controller_collapses_to_default() {
    let body = json!({
        "fields": [{"displayName": "Order"}],
        "controller": {"version": 7, "defaultSort": {"field": "Order"}}
    });
    let payload = PreviewService::build_payload(&request_from(body)).unwrap();
    assert_eq!(payload.controller.version, 1);
    assert!(payload.controller.default_sort.is_none());
}
