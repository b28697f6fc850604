//! Storage module for the API.
//!
//! The only backing store is an in-memory TTL map; previews are ephemeral by
//! design and also travel inside their signed tokens.

pub mod preview_store;

pub use preview_store::{PreviewStore, SharedPreviewStore, PREVIEW_TTL_SECONDS};
