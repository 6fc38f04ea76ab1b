//! Temporal burst selection
//!
//! From a focal entry, walk outward over listing neighbors and check
//! every entry whose capture time is within the configured gap of the
//! previous member. Either side stops independently at the first
//! missing timestamp or oversized gap.

use crate::fetch_cache::MetadataCache;
use crate::metadata::capture_time_ms;
use crate::store::DirectoryEntryStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use viewer_fs::{Entry, EntryKey};

pub struct BurstSelector {
    metadata: Arc<MetadataCache>,
    store: Arc<DirectoryEntryStore>,
    max_gap_ms: i64,
}

impl BurstSelector {
    pub fn new(
        metadata: Arc<MetadataCache>,
        store: Arc<DirectoryEntryStore>,
        max_gap_ms: i64,
    ) -> Self {
        Self {
            metadata,
            store,
            max_gap_ms,
        }
    }

    async fn capture_time(
        &self,
        entries: &[Entry],
        index: usize,
        memo: &mut HashMap<usize, Option<i64>>,
    ) -> Option<i64> {
        if let Some(cached) = memo.get(&index) {
            return *cached;
        }
        let entry = &entries[index];
        let time = if !entry.is_media() {
            None
        } else {
            match self.metadata.request(&entry.relative_path).await {
                Ok(payload) => payload.metadata.as_ref().and_then(capture_time_ms),
                Err(_) => None,
            }
        };
        memo.insert(index, time);
        time
    }

    /// Replace the checked set with the burst around `focal_key`.
    /// Returns the checked keys; empty when the focal entry has no
    /// resolvable capture time.
    pub async fn select_burst(&self, focal_key: &str) -> HashSet<EntryKey> {
        self.store.clear_checked();

        let entries = self.store.entries();
        let Some(focal) = entries.iter().position(|e| e.key() == focal_key) else {
            return HashSet::new();
        };

        let mut memo = HashMap::new();
        let Some(focal_time) = self.capture_time(&entries, focal, &mut memo).await else {
            return HashSet::new();
        };

        let mut selected = HashSet::new();
        selected.insert(entries[focal].key());

        // Left walk: each member within the gap of the previous one.
        let mut prev = focal_time;
        for i in (0..focal).rev() {
            match self.capture_time(&entries, i, &mut memo).await {
                Some(t) if (prev - t).abs() <= self.max_gap_ms => {
                    selected.insert(entries[i].key());
                    prev = t;
                }
                _ => break,
            }
        }

        // Right walk, independent of the left one.
        let mut prev = focal_time;
        for i in focal + 1..entries.len() {
            match self.capture_time(&entries, i, &mut memo).await {
                Some(t) if (t - prev).abs() <= self.max_gap_ms => {
                    selected.insert(entries[i].key());
                    prev = t;
                }
                _ => break,
            }
        }

        tracing::debug!("burst around {}: {} entries", focal_key, selected.len());
        self.store.replace_checked(selected.clone());
        selected
    }
}
