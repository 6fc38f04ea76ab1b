//! Async service seams consumed by the browsing engine
//!
//! Each call is independent; `move_item` and `delete_item` are safe to
//! retry on sources that have already vanished.

use crate::{Entry, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default bounded depth for `list_tree`
pub const DEFAULT_TREE_DEPTH: u32 = 3;
/// Hard ceiling for `list_tree` depth
pub const MAX_TREE_DEPTH: u32 = 10;
/// How many preview images a directory card stacks
pub const DIR_THUMB_COUNT: usize = 4;

/// One node of the lazily-consumed directory tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Conflict strategy for a single move call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveStrategy {
    /// Report a collision back to the caller instead of acting
    Ask,
    /// Destructively replace the existing destination item
    Overwrite,
    /// Leave the source untouched
    Skip,
    /// Append a `~N` suffix before the extension until a name is free
    Rename,
}

/// Outcome of moving one item. A destination collision under `Ask` is a
/// distinguished response, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { final_name: String },
    Skipped,
    Conflict { existing_name: String },
}

/// Technical tags read from a file (capture times, camera model, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub tags: BTreeMap<String, String>,
}

impl Metadata {
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(tag.into(), value.into());
    }
}

/// Metadata lookup result. Routine absence of embedded metadata is a
/// payload with an error reason, not a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataPayload {
    pub metadata: Option<Metadata>,
    pub error: Option<String>,
}

impl MetadataPayload {
    pub fn ok(metadata: Metadata) -> Self {
        Self {
            metadata: Some(metadata),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            metadata: None,
            error: Some(reason.into()),
        }
    }
}

/// Directory listing, tree listing, and transfer operations
#[async_trait]
pub trait FileService: Send + Sync {
    /// List one directory. Fails with NotFound/AccessDenied when the path
    /// does not resolve inside the allowed root.
    async fn list_directory(&self, path: &str) -> Result<Vec<Entry>>;

    /// Bounded-depth directory tree rooted at `path`. Best effort:
    /// unreadable subtrees are omitted, not reported.
    async fn list_tree(&self, path: &str, depth: u32) -> Result<TreeNode>;

    /// Up to [`DIR_THUMB_COUNT`] image paths from one directory, in name
    /// order, for the stacked preview on directory cards.
    async fn list_dir_thumbs(&self, path: &str) -> Result<Vec<String>>;

    /// Move one item into `dest_dir`. A source that no longer exists is
    /// `Skipped`, not an error.
    async fn move_item(
        &self,
        source_path: &str,
        dest_dir: &str,
        strategy: MoveStrategy,
    ) -> Result<MoveOutcome>;

    /// Delete one item (recursively for directories). Deleting an already
    /// removed path succeeds.
    async fn delete_item(&self, path: &str) -> Result<()>;
}

/// Per-file metadata extraction
#[async_trait]
pub trait MetadataService: Send + Sync {
    async fn fetch_metadata(&self, path: &str) -> Result<MetadataPayload>;
}

/// Thumbnail byte fetch (rasterization happens behind this seam)
#[async_trait]
pub trait ThumbnailService: Send + Sync {
    async fn fetch_thumbnail(&self, path: &str) -> Result<Vec<u8>>;
}
