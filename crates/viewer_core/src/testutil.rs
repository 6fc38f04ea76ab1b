//! In-memory service fakes for engine tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use viewer_fs::{
    natural_sort_key, Entry, EntryKind, FileService, FsError, Metadata, MetadataPayload,
    MetadataService, MoveOutcome, MoveStrategy, TreeNode, DIR_THUMB_COUNT,
};

#[derive(Default)]
struct FakeFsInner {
    listings: HashMap<String, Vec<Entry>>,
    listing_delays: HashMap<String, Duration>,
    listing_failures: HashMap<String, FsError>,
    /// Names already occupying each destination directory.
    occupied: HashMap<String, HashSet<String>>,
    /// Source paths that have vanished out from under us.
    missing: HashSet<String>,
    move_failures: HashMap<String, FsError>,
    delete_failures: HashMap<String, FsError>,
    move_calls: Vec<(String, String, MoveStrategy)>,
    deleted: Vec<String>,
    tree: Option<TreeNode>,
}

/// Scriptable `FileService` with a recording move log.
#[derive(Clone, Default)]
pub struct FakeFs {
    inner: Arc<Mutex<FakeFsInner>>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_listing(&self, dir: &str, entries: Vec<Entry>) {
        let mut inner = self.inner.lock();
        inner.listings.insert(dir.to_string(), entries);
        inner.listing_failures.remove(dir);
    }

    pub fn set_listing_delay(&self, dir: &str, delay: Duration) {
        self.inner.lock().listing_delays.insert(dir.to_string(), delay);
    }

    pub fn fail_listing(&self, dir: &str, error: FsError) {
        self.inner.lock().listing_failures.insert(dir.to_string(), error);
    }

    /// Mark `name` as already present in `dest_dir`.
    pub fn occupy(&self, dest_dir: &str, name: &str) {
        self.inner
            .lock()
            .occupied
            .entry(dest_dir.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn vanish(&self, source_path: &str) {
        self.inner.lock().missing.insert(source_path.to_string());
    }

    pub fn fail_move(&self, source_path: &str, error: FsError) {
        self.inner
            .lock()
            .move_failures
            .insert(source_path.to_string(), error);
    }

    pub fn fail_delete(&self, path: &str, error: FsError) {
        self.inner
            .lock()
            .delete_failures
            .insert(path.to_string(), error);
    }

    pub fn set_tree(&self, tree: TreeNode) {
        self.inner.lock().tree = Some(tree);
    }

    pub fn move_calls(&self) -> Vec<(String, String, MoveStrategy)> {
        self.inner.lock().move_calls.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().deleted.clone()
    }
}

fn clone_fs_error(e: &FsError) -> FsError {
    match e {
        FsError::Io(io) => FsError::Io(std::io::Error::new(io.kind(), io.to_string())),
        FsError::NotFound(p) => FsError::NotFound(p.clone()),
        FsError::AccessDenied(p) => FsError::AccessDenied(p.clone()),
        FsError::InvalidPath(p) => FsError::InvalidPath(p.clone()),
        FsError::NotADirectory(p) => FsError::NotADirectory(p.clone()),
        FsError::InvalidOperation(p) => FsError::InvalidOperation(p.clone()),
    }
}

fn renamed(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}~2.{}", stem, ext),
        _ => format!("{}~2", name),
    }
}

#[async_trait]
impl FileService for FakeFs {
    async fn list_directory(&self, path: &str) -> viewer_fs::Result<Vec<Entry>> {
        let (delay, result) = {
            let inner = self.inner.lock();
            let delay = inner.listing_delays.get(path).copied();
            let result = if let Some(e) = inner.listing_failures.get(path) {
                Err(clone_fs_error(e))
            } else if let Some(entries) = inner.listings.get(path) {
                Ok(entries.clone())
            } else {
                Err(FsError::NotFound(path.to_string()))
            };
            (delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn list_tree(&self, path: &str, _depth: u32) -> viewer_fs::Result<TreeNode> {
        self.inner
            .lock()
            .tree
            .clone()
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    async fn list_dir_thumbs(&self, path: &str) -> viewer_fs::Result<Vec<String>> {
        let inner = self.inner.lock();
        let entries = inner
            .listings
            .get(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        let mut images: Vec<&Entry> = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Image)
            .collect();
        images.sort_by(|a, b| natural_sort_key(&a.name).cmp(&natural_sort_key(&b.name)));
        Ok(images
            .into_iter()
            .take(DIR_THUMB_COUNT)
            .map(|e| e.relative_path.clone())
            .collect())
    }

    async fn move_item(
        &self,
        source_path: &str,
        dest_dir: &str,
        strategy: MoveStrategy,
    ) -> viewer_fs::Result<MoveOutcome> {
        let mut inner = self.inner.lock();
        inner
            .move_calls
            .push((source_path.to_string(), dest_dir.to_string(), strategy));

        if let Some(e) = inner.move_failures.get(source_path) {
            return Err(clone_fs_error(e));
        }
        if inner.missing.contains(source_path) {
            return Ok(MoveOutcome::Skipped);
        }

        let name = source_path
            .rsplit('/')
            .next()
            .unwrap_or(source_path)
            .to_string();
        let taken = inner
            .occupied
            .get(dest_dir)
            .is_some_and(|names| names.contains(&name));

        let outcome = if !taken {
            MoveOutcome::Moved {
                final_name: name.clone(),
            }
        } else {
            match strategy {
                MoveStrategy::Ask => {
                    return Ok(MoveOutcome::Conflict {
                        existing_name: name,
                    })
                }
                MoveStrategy::Skip => MoveOutcome::Skipped,
                MoveStrategy::Overwrite => MoveOutcome::Moved {
                    final_name: name.clone(),
                },
                MoveStrategy::Rename => MoveOutcome::Moved {
                    final_name: renamed(&name),
                },
            }
        };
        if let MoveOutcome::Moved { final_name } = &outcome {
            inner
                .occupied
                .entry(dest_dir.to_string())
                .or_default()
                .insert(final_name.clone());
        }
        Ok(outcome)
    }

    async fn delete_item(&self, path: &str) -> viewer_fs::Result<()> {
        let mut inner = self.inner.lock();
        if let Some(e) = inner.delete_failures.get(path) {
            return Err(clone_fs_error(e));
        }
        inner.deleted.push(path.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeMetadataInner {
    tags: HashMap<String, Vec<(String, String)>>,
    failures: HashSet<String>,
}

/// Scriptable `MetadataService` that counts fetches.
#[derive(Clone, Default)]
pub struct FakeMetadata {
    inner: Arc<Mutex<FakeMetadataInner>>,
    calls: Arc<AtomicUsize>,
}

impl FakeMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_capture_time(&self, path: &str, value: &str) {
        self.put_tag(path, "DateTimeOriginal", value);
    }

    pub fn put_tag(&self, path: &str, tag: &str, value: &str) {
        self.inner
            .lock()
            .tags
            .entry(path.to_string())
            .or_default()
            .push((tag.to_string(), value.to_string()));
    }

    pub fn fail(&self, path: &str) {
        self.inner.lock().failures.insert(path.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataService for FakeMetadata {
    async fn fetch_metadata(&self, path: &str) -> viewer_fs::Result<MetadataPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock();
        if inner.failures.contains(path) {
            return Ok(MetadataPayload::failed("unreadable"));
        }
        match inner.tags.get(path) {
            Some(pairs) => {
                let mut metadata = Metadata::default();
                for (tag, value) in pairs {
                    metadata.insert(tag.clone(), value.clone());
                }
                Ok(MetadataPayload::ok(metadata))
            }
            None => Ok(MetadataPayload::failed("no metadata")),
        }
    }
}
