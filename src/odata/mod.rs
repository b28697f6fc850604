// Mock OData V2 query engine
// Feeds SmartTable-style consumers from a preview's modelData snapshot

pub mod engine;
pub mod filter;
pub mod metadata;
pub mod query;

pub use engine::{
    apply_order_by, apply_paging, apply_select, attach_entity_metadata, normalize_columns,
    normalize_rows, EntityColumn,
};
pub use filter::apply_filter;
pub use metadata::build_metadata_xml;
pub use query::ODataQueryOptions;
