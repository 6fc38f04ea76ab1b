//! Directory navigation
//!
//! Every navigation invalidates both fetch caches, briefly suppresses
//! thumbnail prefetch while the old grid is torn down, and drives the
//! entry store. Parent navigation leaves a one-shot marker so the
//! directory we came out of is selected in the parent listing.

use crate::error::Result;
use crate::fetch_cache::{MetadataCache, ThumbnailLoader};
use crate::store::DirectoryEntryStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use viewer_fs::{natural_sort_key, normalize_dir, parent_dir, Entry, FileService};

pub struct NavigationCoordinator {
    fs: Arc<dyn FileService>,
    store: Arc<DirectoryEntryStore>,
    metadata: Arc<MetadataCache>,
    thumbnails: Arc<ThumbnailLoader>,
    suppress_window: Duration,
    /// Guards the suppression timer against later navigations.
    epoch: Mutex<u64>,
    navigating: watch::Sender<bool>,
    /// Directory to select in the next successfully loaded listing.
    pending_reveal: Mutex<Option<String>>,
    /// Sibling directory names per parent, in listing order.
    sibling_cache: Mutex<HashMap<String, Vec<String>>>,
}

impl NavigationCoordinator {
    pub fn new(
        fs: Arc<dyn FileService>,
        store: Arc<DirectoryEntryStore>,
        metadata: Arc<MetadataCache>,
        thumbnails: Arc<ThumbnailLoader>,
        suppress_window: Duration,
    ) -> Self {
        let (navigating, _) = watch::channel(false);
        Self {
            fs,
            store,
            metadata,
            thumbnails,
            suppress_window,
            epoch: Mutex::new(0),
            navigating,
            pending_reveal: Mutex::new(None),
            sibling_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_navigating(&self) -> bool {
        *self.navigating.borrow()
    }

    pub fn subscribe_navigating(&self) -> watch::Receiver<bool> {
        self.navigating.subscribe()
    }

    /// Open the suppression window and arm its expiry timer.
    fn begin_navigation(self: &Arc<Self>) {
        self.metadata.invalidate_all();
        self.thumbnails.invalidate_all();

        let epoch = {
            let mut epoch = self.epoch.lock();
            *epoch += 1;
            *epoch
        };
        let _ = self.navigating.send(true);

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.suppress_window).await;
            if *this.epoch.lock() == epoch {
                let _ = this.navigating.send(false);
            }
        });
    }

    /// The new listing is on screen; the window closes early.
    pub fn listing_rendered(&self) {
        *self.epoch.lock() += 1;
        let _ = self.navigating.send(false);
    }

    /// Navigate to a directory. The previous listing stays visible when
    /// the load fails.
    pub async fn push_dir(self: &Arc<Self>, path: &str) -> Result<()> {
        let dir = normalize_dir(path);
        let reveal = self.pending_reveal.lock().take();

        self.begin_navigation();
        self.store.load(&dir).await?;

        if let Some(marker) = reveal {
            // One shot: applied only when the marked directory is
            // listed here, silently dropped otherwise.
            if parent_dir(&marker) == dir {
                self.store.select_dir_entry(&marker);
            }
        }
        Ok(())
    }

    /// Navigate to the parent, selecting the directory we came out of.
    pub async fn go_parent(self: &Arc<Self>) -> Result<()> {
        let current = self.store.current_dir();
        if current == "." {
            return Ok(());
        }
        *self.pending_reveal.lock() = Some(current.clone());
        self.push_dir(&parent_dir(&current)).await
    }

    /// Navigate to the previous (`-1`) or next (`+1`) sibling directory
    /// of the current one, in the parent's listing order. At either end
    /// this is a no-op.
    pub async fn go_sibling(self: &Arc<Self>, offset: isize) -> Result<()> {
        let current = self.store.current_dir();
        if current == "." {
            return Ok(());
        }
        let parent = parent_dir(&current);
        let siblings = self.sibling_dirs(&parent).await?;

        let name = current.rsplit('/').next().unwrap_or(&current).to_string();
        let Some(at) = siblings.iter().position(|s| *s == name) else {
            return Ok(());
        };
        let target = at as isize + offset;
        if target < 0 || target as usize >= siblings.len() {
            return Ok(());
        }

        let sibling = &siblings[target as usize];
        let path = if parent == "." {
            sibling.clone()
        } else {
            format!("{}/{}", parent, sibling)
        };
        self.push_dir(&path).await
    }

    async fn sibling_dirs(&self, parent: &str) -> Result<Vec<String>> {
        if let Some(hit) = self.sibling_cache.lock().get(parent) {
            return Ok(hit.clone());
        }
        let listing = self.fs.list_directory(parent).await?;
        let mut dirs: Vec<String> = listing
            .iter()
            .filter(|e| e.is_dir())
            .map(|e| e.name.clone())
            .collect();
        dirs.sort_by(|a, b| natural_sort_key(a).cmp(&natural_sort_key(b)));
        self.sibling_cache
            .lock()
            .insert(parent.to_string(), dirs.clone());
        Ok(dirs)
    }

    /// Warm the thumbnail cache for an entry about to become visible.
    /// Dropped while a navigation is settling; the caller retries on the
    /// next visibility trigger.
    pub fn prefetch_thumbnail(&self, entry: &Entry) {
        if !entry.is_media() {
            return;
        }
        if self.is_navigating() {
            tracing::trace!("prefetch suppressed for {}", entry.relative_path);
            return;
        }
        self.thumbnails.prefetch(&entry.relative_path);
    }
}
