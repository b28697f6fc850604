//! In-memory preview store with a fixed one-hour TTL.
//!
//! Entries are purged lazily on every create/get; there is no background
//! eviction task. Preview state also travels inside the signed token, so
//! losing this map only removes the id-based lookup path.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::preview::{PreviewEntry, PreviewPayload};

pub const PREVIEW_TTL_SECONDS: i64 = 3600;

#[derive(Default)]
pub struct PreviewStore {
    entries: Mutex<HashMap<String, PreviewEntry>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a built payload under a fresh UUID and stamps `createdAt`.
    pub async fn create(&self, payload: PreviewPayload) -> PreviewEntry {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries);

        let entry = PreviewEntry {
            id: Uuid::new_v4().to_string(),
            name: payload.name,
            view_xml: payload.view_xml,
            controller: payload.controller,
            model_data: payload.model_data,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        entries.insert(entry.id.clone(), entry.clone());
        entry
    }

    pub async fn get(&self, id: &str) -> Option<PreviewEntry> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries);
        entries.get(id).cloned()
    }
}

/// Shared preview store for use across the application
pub type SharedPreviewStore = Arc<PreviewStore>;

fn purge_expired(entries: &mut HashMap<String, PreviewEntry>) {
    let now = Utc::now();
    entries.retain(|_, entry| !is_expired(entry, now));
}

/// An entry whose `createdAt` does not parse counts as expired; age strictly
/// greater than the TTL purges.
fn is_expired(entry: &PreviewEntry, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(&entry.created_at) {
        Ok(created) => {
            let age_ms = now
                .signed_duration_since(created.with_timezone(&Utc))
                .num_milliseconds();
            age_ms > PREVIEW_TTL_SECONDS * 1000
        }
        Err(_) => true,
    }
}
