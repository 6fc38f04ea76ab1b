//! Current-directory entry state
//!
//! Entry list, selection cursor, preview flag, and the checked set, all
//! scoped to the displayed directory and mutated only through named
//! operations so index/key invariants hold.

use crate::error::Result;
use futures::future::{AbortHandle, Abortable};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use viewer_fs::{natural_sort_key, normalize_dir, Entry, EntryKey, EntryKind, FileService};

#[derive(Debug, Default)]
struct StoreState {
    current_dir: String,
    entries: Vec<Entry>,
    selected_index: usize,
    preview_open: bool,
    checked: HashSet<EntryKey>,
    /// Set only when an explicit reload fails, so the UI can distinguish
    /// the failure from an empty directory.
    load_error: Option<String>,
}

pub struct DirectoryEntryStore {
    fs: Arc<dyn FileService>,
    state: RwLock<StoreState>,
    /// Monotonic ticket per issued load; the displayed list always
    /// corresponds to the most recently issued one.
    load_seq: AtomicU64,
    inflight_load: Mutex<Option<AbortHandle>>,
    changed: watch::Sender<u64>,
}

impl DirectoryEntryStore {
    pub fn new(fs: Arc<dyn FileService>) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            fs,
            state: RwLock::new(StoreState {
                current_dir: ".".to_string(),
                ..StoreState::default()
            }),
            load_seq: AtomicU64::new(0),
            inflight_load: Mutex::new(None),
            changed,
        }
    }

    /// Observe state changes; the value is an opaque version counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    fn touch(&self) {
        self.changed.send_modify(|v| *v += 1);
    }

    // ----- listing -----

    /// Load a directory, superseding any in-flight load. On failure the
    /// previous listing stays in place.
    pub async fn load(&self, path: &str) -> Result<()> {
        self.load_inner(path, false).await
    }

    /// Explicit reload of the current directory; a failure here is
    /// surfaced via `load_error`, distinct from an empty directory.
    pub async fn reload(&self) -> Result<()> {
        let dir = self.current_dir();
        self.load_inner(&dir, true).await
    }

    async fn load_inner(&self, path: &str, explicit: bool) -> Result<()> {
        let dir = normalize_dir(path);
        let seq = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let (abort, registration) = AbortHandle::new_pair();
        if let Some(prev) = self.inflight_load.lock().replace(abort) {
            prev.abort();
        }

        let result = Abortable::new(self.fs.list_directory(&dir), registration).await;

        // Last-issued-wins: a stale response never overwrites a fresher one.
        if self.load_seq.load(Ordering::SeqCst) != seq {
            return Ok(());
        }

        match result {
            Err(futures::future::Aborted) => Ok(()),
            Ok(Ok(mut entries)) => {
                entries.sort_by(|a, b| natural_sort_key(&a.name).cmp(&natural_sort_key(&b.name)));
                {
                    let mut st = self.state.write();
                    st.current_dir = dir;
                    st.entries = entries;
                    st.selected_index = 0;
                    st.preview_open = false;
                    st.checked.clear();
                    st.load_error = None;
                }
                self.touch();
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!("listing load failed for {}: {}", dir, e);
                if explicit {
                    self.state.write().load_error = Some(e.to_string());
                    self.touch();
                }
                Err(e.into())
            }
        }
    }

    pub fn load_error(&self) -> Option<String> {
        self.state.read().load_error.clone()
    }

    // ----- read-only snapshots -----

    pub fn current_dir(&self) -> String {
        self.state.read().current_dir.clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.state.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.state.read().selected_index
    }

    pub fn selected_entry(&self) -> Option<Entry> {
        let st = self.state.read();
        st.entries.get(st.selected_index).cloned()
    }

    pub fn is_preview_open(&self) -> bool {
        self.state.read().preview_open
    }

    pub fn checked(&self) -> HashSet<EntryKey> {
        self.state.read().checked.clone()
    }

    // ----- cursor -----

    fn clamp(index: usize, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            index.min(len - 1)
        }
    }

    pub fn select(&self, index: usize) {
        {
            let mut st = self.state.write();
            st.selected_index = Self::clamp(index, st.entries.len());
        }
        self.touch();
    }

    pub fn move_selection(&self, delta: isize) {
        {
            let mut st = self.state.write();
            let len = st.entries.len();
            let next = st.selected_index as isize + delta;
            st.selected_index = Self::clamp(next.max(0) as usize, len);
        }
        self.touch();
    }

    /// Select the directory entry with the given relative path, if listed.
    pub fn select_dir_entry(&self, relative_path: &str) -> bool {
        let want = normalize_dir(relative_path);
        let mut hit = false;
        {
            let mut st = self.state.write();
            if let Some(idx) = st
                .entries
                .iter()
                .position(|e| e.kind == EntryKind::Dir && normalize_dir(&e.relative_path) == want)
            {
                st.selected_index = idx;
                hit = true;
            }
        }
        if hit {
            self.touch();
        }
        hit
    }

    pub fn set_preview_open(&self, open: bool) {
        self.state.write().preview_open = open;
        self.touch();
    }

    // ----- checked set -----

    pub fn toggle_check(&self, key: &str) {
        {
            let mut st = self.state.write();
            if !st.checked.remove(key) {
                st.checked.insert(key.to_string());
            }
        }
        self.touch();
    }

    pub fn select_all(&self) {
        {
            let mut st = self.state.write();
            let keys: Vec<EntryKey> = st.entries.iter().map(Entry::key).collect();
            st.checked.extend(keys);
        }
        self.touch();
    }

    /// Unchecks every currently listed key (keys from other directories,
    /// if any leaked in, are untouched by design of the lifecycle).
    pub fn deselect_all(&self) {
        {
            let mut st = self.state.write();
            let keys: Vec<EntryKey> = st.entries.iter().map(Entry::key).collect();
            for k in &keys {
                st.checked.remove(k);
            }
        }
        self.touch();
    }

    pub fn set_range_checked(&self, from: usize, to: usize, checked: bool) {
        {
            let mut st = self.state.write();
            let (a, b) = (from.min(to), from.max(to));
            let keys: Vec<EntryKey> = st
                .entries
                .iter()
                .skip(a)
                .take(b.saturating_sub(a) + 1)
                .map(Entry::key)
                .collect();
            for k in keys {
                if checked {
                    st.checked.insert(k);
                } else {
                    st.checked.remove(&k);
                }
            }
        }
        self.touch();
    }

    /// Replace the checked set wholesale (burst selection).
    pub fn replace_checked(&self, keys: HashSet<EntryKey>) {
        self.state.write().checked = keys;
        self.touch();
    }

    pub fn clear_checked(&self) {
        self.state.write().checked.clear();
        self.touch();
    }

    // ----- optimistic removal -----

    /// Remove entries by key after a confirmed move/delete.
    ///
    /// The cursor follows the selected entry by identity when it
    /// survives; when it was removed, the cursor lands on the entry now
    /// occupying the nearest remaining index and an open preview closes.
    pub fn remove_by_keys(&self, keys: &[EntryKey]) {
        if keys.is_empty() {
            return;
        }
        {
            let key_set: HashSet<&str> = keys.iter().map(String::as_str).collect();
            let mut st = self.state.write();

            let selected_key = st.entries.get(st.selected_index).map(Entry::key);
            let old_index = st.selected_index;

            st.entries.retain(|e| !key_set.contains(e.key().as_str()));
            for k in keys {
                st.checked.remove(k);
            }

            let len = st.entries.len();
            let survived = selected_key
                .as_ref()
                .and_then(|key| st.entries.iter().position(|e| &e.key() == key));
            match survived {
                Some(idx) => st.selected_index = idx,
                None => {
                    st.selected_index = Self::clamp(old_index, len);
                    st.preview_open = false;
                }
            }
        }
        self.touch();
    }
}
