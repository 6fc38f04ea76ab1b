//! PhotoDeck Core Browsing Engine
//!
//! This crate contains:
//! - Bounded-concurrency metadata and thumbnail caches
//! - Directory entry state (selection, checks, optimistic removal)
//! - Bulk move/delete with interactive conflict resolution
//! - Folder tree panel state with drag auto-expand
//! - Temporal burst selection
//! - Navigation with prefetch suppression

pub mod bulk;
pub mod burst;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod fetch_cache;
pub mod metadata;
pub mod nav;
pub mod persist;
pub mod store;
pub mod tree;

#[cfg(test)]
mod testutil;

pub use bulk::{BulkTransferCoordinator, DeleteReport, DragPayload, MoveReport, DRAG_PAYLOAD_KIND};
pub use burst::BurstSelector;
pub use config::{
    BurstConfig, FetchConfig, GridConfig, NavigationConfig, TreeConfig, ViewerConfig,
};
pub use conflict::{ConflictDecision, ConflictRequest, ConflictResolver, Resolution};
pub use engine::ViewerEngine;
pub use error::{Result, ViewerError};
pub use fetch_cache::{
    metadata_cache, thumbnail_loader, Fetch, FetchCache, FetchError, MetadataCache,
    ThumbnailLoader,
};
pub use metadata::{
    capture_date_key, capture_time_ms, normalize_capture_time, pick_capture_time,
    CAPTURE_TIME_TAGS,
};
pub use nav::NavigationCoordinator;
pub use persist::UiState;
pub use store::DirectoryEntryStore;
pub use tree::DirectoryTreeController;

use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Global engine instance (for UI access)
static ENGINE: OnceCell<Arc<ViewerEngine>> = OnceCell::new();

/// Initialize the global engine
pub fn init(config: ViewerConfig) -> anyhow::Result<Arc<ViewerEngine>> {
    let engine = Arc::new(ViewerEngine::new(config)?);
    ENGINE
        .set(engine.clone())
        .map_err(|_| anyhow::anyhow!("engine already initialized"))?;
    Ok(engine)
}

/// Get the global engine
pub fn engine() -> Option<Arc<ViewerEngine>> {
    ENGINE.get().cloned()
}

/// Initialize observability and the global engine in one call
pub fn bootstrap(config: ViewerConfig) -> anyhow::Result<Arc<ViewerEngine>> {
    viewer_log::init()?;
    init(config)
}
