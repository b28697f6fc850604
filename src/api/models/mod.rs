// Models module - field mappings, controller config, and preview wire types

pub mod controller;
pub mod field;
pub mod preview;

pub use controller::{
    normalize_controller_config, PreviewControllerConfig, PreviewDefaultSort, PreviewInitialFilter,
    SortDirection,
};
pub use field::{
    normalize_lookup_key, sanitize_binding_key, FieldMapping, FieldType, PreviewColumnMeta,
};
pub use preview::{
    CreatePreviewRequest, MapFieldsMeta, MapFieldsRequest, MapFieldsResponse, MappingSource,
    MockDataRequest, MockDataResponse, PreviewCreateResponse, PreviewEntry, PreviewPayload,
};
