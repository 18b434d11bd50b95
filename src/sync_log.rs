//! Sync audit log
//!
//! Append-only, capped ring buffer of [`SyncLogEntry`] values. A smaller
//! trailing slice is persisted through the key-value store so the UI can show
//! recent history across restarts. Log entries are strictly observational and
//! never drive control flow.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::warn;

use crate::models::{LogLevel, SyncLogEntry};
use crate::storage::KeyValueStore;

const LOGS_KEY: &str = "zenith_crm_sync_logs";

/// In-memory hard cap; oldest entries are evicted first.
pub const MAX_LOG_ENTRIES: usize = 100;
/// Trailing slice persisted to the store.
pub const PERSISTED_LOG_ENTRIES: usize = 50;

pub struct SyncLogBuffer {
    store: Arc<dyn KeyValueStore>,
    entries: Mutex<VecDeque<SyncLogEntry>>,
}

impl SyncLogBuffer {
    /// Load the persisted trailing slice from the store.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = store
            .get(LOGS_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<SyncLogEntry>>(&raw).ok())
            .unwrap_or_default();

        Self {
            store,
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }

    /// Append one entry, evicting the oldest once the cap is reached, and
    /// persist the trailing slice.
    pub fn append(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<BTreeMap<String, serde_json::Value>>,
        error: Option<String>,
    ) {
        let entry = SyncLogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            context,
            error,
        };

        let mut entries = self.entries.lock().unwrap();
        entries.push_back(entry);
        while entries.len() > MAX_LOG_ENTRIES {
            entries.pop_front();
        }

        let start = entries.len().saturating_sub(PERSISTED_LOG_ENTRIES);
        let trailing: Vec<&SyncLogEntry> = entries.iter().skip(start).collect();
        match serde_json::to_string(&trailing) {
            Ok(raw) => {
                if let Err(err) = self.store.set(LOGS_KEY, &raw) {
                    warn!(error = %err, "Failed to persist sync logs");
                }
            }
            Err(err) => warn!(error = %err, "Failed to serialize sync logs"),
        }
    }

    /// Snapshot of the newest entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<SyncLogEntry> {
        let entries = self.entries.lock().unwrap();
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Whether any of the newest `window` entries is an error.
    pub fn has_recent_errors(&self, window: usize) -> bool {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .rev()
            .take(window)
            .any(|e| e.level == LogLevel::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn buffer() -> SyncLogBuffer {
        SyncLogBuffer::load(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn ring_buffer_never_exceeds_cap() {
        let logs = buffer();
        for i in 0..(MAX_LOG_ENTRIES * 3) {
            logs.append(LogLevel::Info, format!("entry {}", i), None, None);
        }
        assert_eq!(logs.len(), MAX_LOG_ENTRIES);

        // Oldest evicted first: the newest entry survives
        let recent = logs.recent(1);
        assert_eq!(recent[0].message, format!("entry {}", MAX_LOG_ENTRIES * 3 - 1));
    }

    #[test]
    fn persists_trailing_slice_only() {
        let store = Arc::new(MemoryStore::new());
        let logs = SyncLogBuffer::load(store.clone());
        for i in 0..MAX_LOG_ENTRIES {
            logs.append(LogLevel::Info, format!("entry {}", i), None, None);
        }

        let reopened = SyncLogBuffer::load(store);
        assert_eq!(reopened.len(), PERSISTED_LOG_ENTRIES);
    }

    #[test]
    fn recent_error_detection_is_windowed() {
        let logs = buffer();
        logs.append(LogLevel::Error, "boom", None, None);
        assert!(logs.has_recent_errors(10));

        for i in 0..20 {
            logs.append(LogLevel::Info, format!("ok {}", i), None, None);
        }
        assert!(!logs.has_recent_errors(10));
    }
}
