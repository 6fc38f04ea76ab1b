//! Bulk move and delete
//!
//! Items are processed strictly one at a time so an interactive
//! conflict answer can apply to everything that follows it. Per-item
//! failures are isolated; the batch always runs to completion.

use crate::conflict::{ConflictRequest, ConflictResolver};
use crate::store::DirectoryEntryStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use viewer_fs::{normalize_dir, Entry, EntryKey, FileService, FsError, MoveOutcome, MoveStrategy};

/// Identifies move-item drags across the UI boundary.
pub const DRAG_PAYLOAD_KIND: &str = "photodeck/move-items";

/// Serialized drag content; `kind` guards against foreign drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload {
    pub kind: String,
    pub items: Vec<EntryKey>,
}

impl DragPayload {
    pub fn new(items: Vec<EntryKey>) -> Self {
        Self {
            kind: DRAG_PAYLOAD_KIND.to_string(),
            items,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Accepts only well-formed payloads carrying our kind tag.
    pub fn parse(text: &str) -> Option<Self> {
        let payload: Self = serde_json::from_str(text).ok()?;
        (payload.kind == DRAG_PAYLOAD_KIND && !payload.items.is_empty()).then_some(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveReport {
    /// Source key and the name the item ended up with.
    pub moved: Vec<(EntryKey, String)>,
    pub skipped: Vec<EntryKey>,
    /// Key and failure reason.
    pub failed: Vec<(EntryKey, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<EntryKey>,
    pub failed: Vec<(EntryKey, String)>,
}

pub struct BulkTransferCoordinator {
    fs: Arc<dyn FileService>,
    resolver: Arc<ConflictResolver>,
    store: Arc<DirectoryEntryStore>,
    /// One batch at a time.
    op_lock: AsyncMutex<()>,
}

impl BulkTransferCoordinator {
    pub fn new(
        fs: Arc<dyn FileService>,
        resolver: Arc<ConflictResolver>,
        store: Arc<DirectoryEntryStore>,
    ) -> Self {
        Self {
            fs,
            resolver,
            store,
            op_lock: AsyncMutex::new(()),
        }
    }

    /// The keys a drag starting on `grabbed` should carry: the whole
    /// checked set when the grabbed item is part of it, otherwise just
    /// the grabbed item.
    pub fn drag_items_for(&self, grabbed: &str) -> Vec<EntryKey> {
        let checked = self.store.checked();
        if checked.contains(grabbed) {
            self.store
                .entries()
                .iter()
                .map(Entry::key)
                .filter(|k| checked.contains(k))
                .collect()
        } else {
            vec![grabbed.to_string()]
        }
    }

    fn entries_for(&self, keys: &[EntryKey]) -> Vec<Entry> {
        let listed = self.store.entries();
        keys.iter()
            .filter_map(|key| listed.iter().find(|e| &e.key() == key).cloned())
            .collect()
    }

    /// Move the given entries into `dest_dir`, asking on each collision
    /// unless a previous answer said "apply to all". Successfully moved
    /// entries drop out of the listing when the batch finishes.
    pub async fn move_items(&self, keys: &[EntryKey], dest_dir: &str) -> MoveReport {
        let _batch = self.op_lock.lock().await;
        let dest = normalize_dir(dest_dir);
        let mut report = MoveReport::default();

        if dest == self.store.current_dir() {
            return report;
        }

        let mut remembered: Option<MoveStrategy> = None;
        for entry in self.entries_for(keys) {
            let key = entry.key();
            let mut strategy = remembered.unwrap_or(MoveStrategy::Ask);
            loop {
                match self.fs.move_item(&entry.relative_path, &dest, strategy).await {
                    Ok(MoveOutcome::Moved { final_name }) => {
                        tracing::debug!("moved {} -> {}/{}", key, dest, final_name);
                        report.moved.push((key, final_name));
                        break;
                    }
                    Ok(MoveOutcome::Skipped) => {
                        report.skipped.push(key);
                        break;
                    }
                    Ok(MoveOutcome::Conflict { existing_name }) => {
                        let decision = self
                            .resolver
                            .ask(ConflictRequest {
                                item: entry.name.clone(),
                                dest_dir: dest.clone(),
                                existing_name,
                            })
                            .await;
                        strategy = decision.resolution.into();
                        if decision.apply_to_all {
                            remembered = Some(strategy);
                        }
                    }
                    Err(FsError::NotFound(_)) => {
                        report.skipped.push(key);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("move failed for {}: {}", key, e);
                        report.failed.push((key, e.to_string()));
                        break;
                    }
                }
            }
        }

        let moved_keys: Vec<EntryKey> = report.moved.iter().map(|(k, _)| k.clone()).collect();
        self.store.remove_by_keys(&moved_keys);
        report
    }

    /// Delete the given entries. Callers confirm with the user first.
    pub async fn delete_items_confirmed(&self, keys: &[EntryKey]) -> DeleteReport {
        let _batch = self.op_lock.lock().await;
        let mut report = DeleteReport::default();

        for entry in self.entries_for(keys) {
            let key = entry.key();
            match self.fs.delete_item(&entry.relative_path).await {
                Ok(()) => report.deleted.push(key),
                Err(e) => {
                    tracing::warn!("delete failed for {}: {}", key, e);
                    report.failed.push((key, e.to_string()));
                }
            }
        }

        self.store.remove_by_keys(&report.deleted);
        report
    }
}
