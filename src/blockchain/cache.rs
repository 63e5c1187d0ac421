// src/blockchain/cache.rs
//! Freshness-windowed cache for chain reads.
//!
//! Each logical key gets two entries in the backing document: the payload
//! under `<key>` and the write instant (Unix millis) under
//! `<key>_timestamp`. Entries are overwritten on every successful fetch and
//! are never evicted; stale entries stay retrievable through the explicit
//! fallback path.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Well-known cache keys, scoped by resource kind and entity id.
pub mod keys {
    pub const POLLS: &str = "polls";
    pub const TRANSACTIONS: &str = "transactions";

    pub fn poll(id: u64) -> String {
        format!("poll_{}", id)
    }

    pub fn contestants(poll_id: u64) -> String {
        format!("contestants_{}", poll_id)
    }
}

/// Process-wide cache, constructed once and passed by reference to all
/// operations. Concurrent `save`s are last-writer-wins.
#[derive(Debug)]
pub struct CacheStore {
    entries: DashMap<String, Value>,
    path: Option<PathBuf>,
    ttl: Duration,
}

impl CacheStore {
    /// Open a cache backed by `path`, loading any existing document.
    /// `path: None` keeps the cache in memory only (headless contexts
    /// without a home directory).
    pub fn new(path: Option<PathBuf>, ttl: Duration) -> Self {
        let entries = DashMap::new();

        if let Some(path) = &path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                    Ok(Value::Object(map)) => {
                        for (key, value) in map {
                            entries.insert(key, value);
                        }
                    }
                    Ok(_) | Err(_) => {
                        warn!("cache file {} is not a JSON object, starting empty", path.display());
                    }
                },
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!("failed to read cache file {}: {}", path.display(), err),
            }
        }

        Self { entries, path, ttl }
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn timestamp_key(key: &str) -> String {
        format!("{}_timestamp", key)
    }

    /// Write the payload plus the current instant. Persistence failures are
    /// logged, never propagated; a broken disk must not fail a fetch.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("failed to serialize cache entry '{}': {}", key, err);
                return;
            }
        };

        self.entries.insert(key.to_string(), payload);
        self.entries
            .insert(Self::timestamp_key(key), Value::from(Self::now_ms()));
        self.persist();
    }

    /// True while the entry's age is inside the freshness window.
    pub fn is_valid(&self, key: &str) -> bool {
        let Some(written_at) = self
            .entries
            .get(&Self::timestamp_key(key))
            .and_then(|v| v.as_i64())
        else {
            return false;
        };

        let age = Self::now_ms().saturating_sub(written_at);
        age >= 0 && (age as u128) < self.ttl.as_millis()
    }

    /// The payload, only while fresh. Stale entries are left in place for
    /// the fallback path.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_valid(key) {
            return None;
        }
        self.load_stale(key)
    }

    /// The payload regardless of freshness. The explicit fallback path for
    /// reads that failed against the node.
    pub fn load_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        match serde_json::from_value(entry.value().clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("cache entry '{}' failed to deserialize: {}", key, err);
                None
            }
        }
    }

    fn persist(&self) {
        let Some(path) = &self.path else { return };

        let mut document = serde_json::Map::new();
        for entry in self.entries.iter() {
            document.insert(entry.key().clone(), entry.value().clone());
        }

        if let Err(err) =
            std::fs::write(path, serde_json::to_string(&Value::Object(document)).unwrap_or_default())
        {
            warn!("failed to persist cache to {}: {}", path.display(), err);
        }
    }
}
