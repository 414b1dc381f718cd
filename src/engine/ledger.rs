use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::PositionRecord;

/// In-memory record of executed straddles for the life of the process.
/// Insert-only; nothing is ever updated or removed.
#[derive(Clone, Default)]
pub struct PositionLedger {
    positions: Arc<RwLock<HashMap<String, PositionRecord>>>,
}

/// `{session}_{unix seconds}` key for a new record.
pub fn position_key(session_id: &str, created_at: DateTime<Utc>) -> String {
    format!("{}_{}", session_id, created_at.timestamp())
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` and returns the key it was stored under. A key already
    /// taken (same session within the same second) gets a `_N` suffix.
    pub async fn record(&self, key: String, record: PositionRecord) -> String {
        let mut positions = self.positions.write().await;

        let mut stored_key = key.clone();
        let mut n = 1;
        while positions.contains_key(&stored_key) {
            n += 1;
            stored_key = format!("{}_{}", key, n);
        }
        if n > 1 {
            warn!(key = %key, stored_key = %stored_key, "Position key collision");
        }

        positions.insert(stored_key.clone(), record);
        debug!(key = %stored_key, total = positions.len(), "Position recorded");
        stored_key
    }

    /// All records, oldest first.
    pub async fn list_all(&self) -> Vec<(String, PositionRecord)> {
        let positions = self.positions.read().await;
        let mut all: Vec<(String, PositionRecord)> = positions
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at).then_with(|| a.0.cmp(&b.0)));
        all
    }

    pub async fn list_for_session(&self, session_id: &str) -> Vec<(String, PositionRecord)> {
        self.list_all()
            .await
            .into_iter()
            .filter(|(_, record)| record.session_id == session_id)
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.positions.read().await.len()
    }
}
