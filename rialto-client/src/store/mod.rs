//! Client-side alert state. The backend is permitted to answer a list request
//! with a bare array or with an object nesting the collection under one of
//! several keys; normalization happens here, once, instead of scattered
//! is-this-an-array guards at every call site.
use serde_json::Value;

use rialto::alert::Alert;

/// Recognized collection keys, checked in order. The first array-valued match is
/// authoritative.
pub const LIST_KEYS: [&str; 4] = ["alerts", "users", "data", "payload"];

/// A bare array is used as-is; otherwise the candidate keys are tried in order;
/// anything else degrades to an empty collection with a logged shape mismatch,
/// never an error.
pub fn normalize_list(value: &Value, candidate_keys: &[&str]) -> Vec<Value> {
    if let Some(items) = value.as_array() {
        return items.clone();
    }
    for key in candidate_keys {
        if let Some(items) = value.get(*key).and_then(|nested| nested.as_array()) {
            return items.clone();
        }
    }
    log::warn!("unexpected list shape, degrading to empty collection: {value}");
    Vec::new()
}

/// Facade-owned alert collection. Fetches are keyed by a monotonically increasing
/// sequence number so that an older request resolving after a newer one cannot
/// clobber fresher state.
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: Vec<Alert>,
    last_seq: u64,
    last_applied: u64,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the sequence number for a fetch about to start.
    pub fn begin_fetch(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    /// Applies a completed fetch. Returns false when the result is stale, in
    /// which case the store is left untouched.
    pub fn apply(&mut self, seq: u64, alerts: Vec<Alert>) -> bool {
        if seq <= self.last_applied {
            log::debug!("discarding stale fetch result (seq {seq} <= {})", self.last_applied);
            return false;
        }
        self.last_applied = seq;
        self.alerts = alerts;
        true
    }

    /// Like [apply](AlertStore::apply) but takes a raw response value, coercing
    /// through [normalize_list] and dropping entries that do not decode.
    pub fn apply_value(&mut self, seq: u64, value: &Value) -> bool {
        let alerts = normalize_list(value, &LIST_KEYS)
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        self.apply(seq, alerts)
    }

    pub fn get_alerts(&self) -> Vec<Alert> {
        self.alerts.clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
