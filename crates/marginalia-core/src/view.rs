//! Per-view stroke partitions.
//!
//! The host document shows one logical view at a time; each view keeps its
//! own stroke list and exactly one list is active.

use crate::ink::Stroke;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a logical view of the host document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    /// View used when the host exposes no view signal.
    pub const DEFAULT: &'static str = "default";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from the host's view signal, falling back to the default
    /// view when the signal is missing or blank.
    pub fn from_signal(signal: Option<&str>) -> Self {
        match signal.map(str::trim) {
            Some(s) if !s.is_empty() => Self(s.to_string()),
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Every view's strokes, as persisted.
pub type ViewMap = BTreeMap<ViewId, Vec<Stroke>>;

/// Stroke lists for every view, with one active list checked out.
#[derive(Debug, Clone, Default)]
pub struct ViewPartitions {
    /// Inactive partitions. The active one lives in `active`.
    stored: ViewMap,
    active_id: ViewId,
    active: Vec<Stroke>,
}

impl ViewPartitions {
    pub fn new(active_id: ViewId) -> Self {
        Self {
            stored: ViewMap::new(),
            active_id,
            active: Vec::new(),
        }
    }

    /// Build from a loaded map, checking out `active_id`'s partition.
    pub fn from_map(mut map: ViewMap, active_id: ViewId) -> Self {
        let active = map.remove(&active_id).unwrap_or_default();
        Self {
            stored: map,
            active_id,
            active,
        }
    }

    pub fn active_id(&self) -> &ViewId {
        &self.active_id
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.active
    }

    pub fn strokes_mut(&mut self) -> &mut Vec<Stroke> {
        &mut self.active
    }

    /// Store the outgoing list under its id and check out `id`'s list
    /// (empty if new). Returns false if `id` is already active.
    pub fn switch_to(&mut self, id: ViewId) -> bool {
        if id == self.active_id {
            return false;
        }
        let outgoing = std::mem::take(&mut self.active);
        let outgoing_id = std::mem::replace(&mut self.active_id, id);
        self.stored.insert(outgoing_id, outgoing);
        self.active = self.stored.remove(&self.active_id).unwrap_or_default();
        true
    }

    /// All partitions including the active one. Empty partitions are kept so
    /// a cleared view stays cleared in storage.
    pub fn snapshot(&self) -> ViewMap {
        let mut map = self.stored.clone();
        map.insert(self.active_id.clone(), self.active.clone());
        map
    }

    pub fn clear_active(&mut self) {
        self.active.clear();
    }

    pub fn clear_all(&mut self) {
        self.stored.clear();
        self.active.clear();
    }

    /// Total stroke count across every view.
    pub fn total_strokes(&self) -> usize {
        self.active.len() + self.stored.values().map(Vec::len).sum::<usize>()
    }
}
