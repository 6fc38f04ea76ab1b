//! PhotoDeck File System Boundary Layer
//!
//! Everything the browsing engine consumes from the storage side, behind
//! async service traits:
//! - Relative-path normalization and decomposition
//! - Directory listing with media-kind classification
//! - Bounded-depth directory tree
//! - Move / delete with per-item conflict strategies
//! - Metadata and thumbnail lookups
//!
//! The local implementations resolve every relative path safely under a
//! configured root directory; real deployments may substitute remote
//! services at the same seams.

mod entry;
mod local;
mod relpath;
mod service;

pub use entry::{Entry, EntryKey, EntryKind};
pub use local::{LocalFileService, LocalMetadataService, LocalThumbnailService};
pub use relpath::{
    ancestor_paths_of, dir_to_url, join_rel, natural_sort_key, normalize_dir, parent_dir,
};
pub use service::{
    FileService, Metadata, MetadataPayload, MetadataService, MoveOutcome, MoveStrategy,
    ThumbnailService, TreeNode, DEFAULT_TREE_DEPTH, DIR_THUMB_COUNT, MAX_TREE_DEPTH,
};

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl FsError {
    pub fn from_io(e: std::io::Error, path: &str) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::AccessDenied(path.to_string()),
            _ => FsError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
