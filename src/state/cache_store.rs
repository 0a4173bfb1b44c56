//! Concurrent key/value store with per-entry TTL.
//!
//! Backs three consumers: filter-response memoization, price baselines, and
//! time-bucketed price-change records. Same-key operations are last-write-wins
//! by arrival order; there is no cross-key coordination. Expired entries are
//! dropped lazily on read and swept periodically by a background task, so a
//! read can never observe a value past its TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl CacheStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { entries: DashMap::new() })
    }

    /// Store `value` under `key` for `ttl_secs`. A zero or negative TTL is an
    /// input error, not a silent coercion.
    pub fn set(&self, key: &str, value: Value, ttl_secs: i64) -> Result<()> {
        self.set_at(Instant::now(), key, value, ttl_secs)
    }

    fn set_at(&self, now: Instant, key: &str, value: Value, ttl_secs: i64) -> Result<()> {
        if ttl_secs <= 0 {
            return Err(AppError::Cache(format!(
                "ttl_seconds must be a positive integer, got {ttl_secs}"
            )));
        }
        let entry = CacheEntry {
            value,
            expires_at: now + Duration::from_secs(ttl_secs as u64),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    /// Returns `(value, ttl_remaining_secs)` for a live entry. An expired
    /// entry is removed on the way out.
    pub fn get(&self, key: &str) -> Option<(Value, i64)> {
        self.get_at(Instant::now(), key)
    }

    fn get_at(&self, now: Instant, key: &str) -> Option<(Value, i64)> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                let remaining = (entry.expires_at - now).as_secs() as i64;
                return Some((entry.value.clone(), remaining));
            }
        }
        // Re-checks expiry under the write guard, so an overwrite that landed
        // after the read above is never deleted.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Delete every key matching a glob pattern (`*` and `?`). O(number of
    /// keys) — administrative path, not the ingestion hot path. Zero matches
    /// is a successful no-op.
    pub fn clear(&self, pattern: &str) -> usize {
        let matched: Vec<String> = self
            .entries
            .iter()
            .filter(|e| glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect();
        let mut deleted = 0;
        for key in matched {
            if self.entries.remove(&key).is_some() {
                deleted += 1;
            }
        }
        deleted
    }

    /// All live keys matching a glob pattern. Used by the stats roll-up reader.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| e.value().expires_at > now && glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect()
    }

    /// Drop every expired entry. Called by the background sweeper.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Minimal glob matcher: `*` matches any run (including empty), `?` matches
/// exactly one character. Operates on bytes — keys are ASCII-structured.
fn glob_match(pattern: &str, text: &str) -> bool {
    glob_match_bytes(pattern.as_bytes(), text.as_bytes())
}

fn glob_match_bytes(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match_bytes(&pattern[1..], text)
                || (!text.is_empty() && glob_match_bytes(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match_bytes(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match_bytes(&pattern[1..], &text[1..]),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_round_trips() {
        let store = CacheStore::new();
        store.set("filter:wb:videocards:abc", json!({"n": 3}), 5).unwrap();
        let (value, ttl) = store.get("filter:wb:videocards:abc").unwrap();
        assert_eq!(value, json!({"n": 3}));
        assert!(ttl <= 5 && ttl >= 4);
    }

    #[test]
    fn zero_or_negative_ttl_is_an_error() {
        let store = CacheStore::new();
        assert!(store.set("k", json!(1), 0).is_err());
        assert!(store.set("k", json!(1), -10).is_err());
        assert!(store.get("k").is_none());
    }

    #[test]
    fn expired_entry_is_unreadable() {
        let store = CacheStore::new();
        let start = Instant::now();
        store.set_at(start, "k", json!("v"), 5).unwrap();

        // Still alive just before the deadline.
        let before = start + Duration::from_secs(4);
        assert!(store.get_at(before, "k").is_some());

        // Gone once the TTL has elapsed, and the entry is removed.
        let after = start + Duration::from_secs(6);
        assert!(store.get_at(after, "k").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn fresh_overwrite_survives_racing_expired_reads() {
        // Reads of an expired entry run concurrently with a fresh same-key
        // write; the write must never be swept out by the expiry path.
        let store = CacheStore::new();
        let past = Instant::now() - Duration::from_secs(2);
        for _ in 0..500 {
            store.set_at(past, "k", json!("stale"), 1).unwrap();
            let reader = {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.get("k");
                })
            };
            store.set("k", json!("fresh"), 60).unwrap();
            reader.join().unwrap();
            assert_eq!(store.get("k").unwrap().0, json!("fresh"));
        }
    }

    #[test]
    fn last_write_wins_on_same_key() {
        let store = CacheStore::new();
        store.set("k", json!(1), 60).unwrap();
        store.set("k", json!(2), 60).unwrap();
        assert_eq!(store.get("k").unwrap().0, json!(2));
    }

    #[test]
    fn clear_by_pattern() {
        let store = CacheStore::new();
        store.set("price_stats:daily:2025-08-27:videocards:rtx4090", json!(1), 60).unwrap();
        store.set("price_stats:daily:2025-08-27:processors:14900k", json!(2), 60).unwrap();
        store.set("price_stats:weekly:2025-W35:videocards:rtx4090", json!(3), 60).unwrap();

        assert_eq!(store.clear("price_stats:daily:2025-*"), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_with_no_matches_is_zero_not_error() {
        let store = CacheStore::new();
        store.set("a", json!(1), 60).unwrap();
        assert_eq!(store.clear("zzz:*"), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn glob_matcher_basics() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("daily:*:rtx4090", "daily:2025-08-27:rtx4090"));
        assert!(!glob_match("daily:*:rtx4090", "weekly:2025-08-27:rtx4090"));
    }
}
