// API module organization
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod storage;

// The OData engine is available via crate::odata (defined in lib.rs)
