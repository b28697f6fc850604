//! EDMX `$metadata` document for the preview entity set.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::engine::EntityColumn;
use crate::models::field::FieldType;

/// Builds the OData V2 metadata document describing `PreviewSet`.
///
/// Every preview exposes a single `PreviewType` keyed by `__row_id`. Number
/// columns map to `Edm.Decimal`; everything else, dates and booleans
/// included, stays `Edm.String` because mock cells are formatted text.
pub fn build_metadata_xml(columns: &[EntityColumn]) -> Result<String, Box<dyn std::error::Error>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut edmx_elem = BytesStart::new("edmx:Edmx");
    edmx_elem.push_attribute(("Version", "1.0"));
    edmx_elem.push_attribute(("xmlns:edmx", "http://schemas.microsoft.com/ado/2007/06/edmx"));
    writer.write_event(Event::Start(edmx_elem))?;

    let mut services_elem = BytesStart::new("edmx:DataServices");
    services_elem.push_attribute(("m:DataServiceVersion", "2.0"));
    services_elem.push_attribute((
        "xmlns:m",
        "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata",
    ));
    writer.write_event(Event::Start(services_elem))?;

    let mut schema_elem = BytesStart::new("Schema");
    schema_elem.push_attribute(("Namespace", "PreviewService"));
    schema_elem.push_attribute(("xmlns", "http://schemas.microsoft.com/ado/2008/09/edm"));
    schema_elem.push_attribute(("xmlns:sap", "http://www.sap.com/Protocols/SAPData"));
    writer.write_event(Event::Start(schema_elem))?;

    let mut entity_type_elem = BytesStart::new("EntityType");
    entity_type_elem.push_attribute(("Name", "PreviewType"));
    writer.write_event(Event::Start(entity_type_elem))?;

    writer.write_event(Event::Start(BytesStart::new("Key")))?;
    let mut key_ref = BytesStart::new("PropertyRef");
    key_ref.push_attribute(("Name", "__row_id"));
    writer.write_event(Event::Empty(key_ref))?;
    writer.write_event(Event::End(BytesEnd::new("Key")))?;

    let mut row_id_prop = BytesStart::new("Property");
    row_id_prop.push_attribute(("Name", "__row_id"));
    row_id_prop.push_attribute(("Type", "Edm.String"));
    row_id_prop.push_attribute(("Nullable", "false"));
    row_id_prop.push_attribute(("sap:label", "Row ID"));
    writer.write_event(Event::Empty(row_id_prop))?;

    for column in columns {
        let mut property = BytesStart::new("Property");
        property.push_attribute(("Name", column.key.as_str()));
        if column.kind == FieldType::Number {
            property.push_attribute(("Type", "Edm.Decimal"));
            property.push_attribute(("Precision", "16"));
            property.push_attribute(("Scale", "3"));
        } else {
            property.push_attribute(("Type", "Edm.String"));
        }
        property.push_attribute(("Nullable", "true"));
        property.push_attribute(("sap:label", column.label.as_str()));
        writer.write_event(Event::Empty(property))?;
    }

    writer.write_event(Event::End(BytesEnd::new("EntityType")))?;

    let mut container_elem = BytesStart::new("EntityContainer");
    container_elem.push_attribute(("Name", "PreviewService_Entities"));
    container_elem.push_attribute(("m:IsDefaultEntityContainer", "true"));
    writer.write_event(Event::Start(container_elem))?;

    let mut entity_set = BytesStart::new("EntitySet");
    entity_set.push_attribute(("Name", "PreviewSet"));
    entity_set.push_attribute(("EntityType", "PreviewService.PreviewType"));
    writer.write_event(Event::Empty(entity_set))?;

    writer.write_event(Event::End(BytesEnd::new("EntityContainer")))?;
    writer.write_event(Event::End(BytesEnd::new("Schema")))?;
    writer.write_event(Event::End(BytesEnd::new("edmx:DataServices")))?;
    writer.write_event(Event::End(BytesEnd::new("edmx:Edmx")))?;

    let result = writer.into_inner().into_inner();
    Ok(String::from_utf8(result)?)
}
