//! Persisted ink format and its decoding.

use crate::ink::Stroke;
use crate::view::{ViewId, ViewMap};
use serde::Deserialize;

/// Prefix of every page key in the store.
pub const STORAGE_KEY_PREFIX: &str = "marginalia:";

/// Store key for the page at `page_path`.
pub fn storage_key(page_path: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{page_path}")
}

/// Shapes accepted when reading the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PersistedInk {
    /// Current format: view id → strokes.
    ByView(ViewMap),
    /// Older format: one flat list for the whole page.
    Legacy(Vec<Stroke>),
}

impl PersistedInk {
    /// Normalise into the per-view map. Legacy data belongs to `current`.
    pub fn into_views(self, current: &ViewId) -> ViewMap {
        match self {
            PersistedInk::ByView(map) => map,
            PersistedInk::Legacy(strokes) => {
                let mut map = ViewMap::new();
                map.insert(current.clone(), strokes);
                map
            }
        }
    }
}

/// Decode stored JSON. Anything unrecognised yields an empty map.
pub fn decode(json: &str, current: &ViewId) -> ViewMap {
    match serde_json::from_str::<PersistedInk>(json) {
        Ok(persisted) => {
            let mut views = persisted.into_views(current);
            for strokes in views.values_mut() {
                strokes.retain(Stroke::is_committable);
            }
            views
        }
        Err(e) => {
            log::warn!("Ignoring unrecognised persisted ink: {}", e);
            ViewMap::new()
        }
    }
}

/// Encode the per-view map for storage.
pub fn encode(views: &ViewMap) -> Result<String, serde_json::Error> {
    serde_json::to_string(views)
}
