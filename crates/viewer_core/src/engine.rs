//! Engine assembly
//!
//! Wires the services, caches, stores, and coordinators into one
//! object the UI layer talks to.

use crate::bulk::BulkTransferCoordinator;
use crate::burst::BurstSelector;
use crate::conflict::ConflictResolver;
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::fetch_cache::{metadata_cache, thumbnail_loader, MetadataCache, ThumbnailLoader};
use crate::nav::NavigationCoordinator;
use crate::persist::UiState;
use crate::store::DirectoryEntryStore;
use crate::tree::DirectoryTreeController;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use viewer_fs::{
    FileService, LocalFileService, LocalMetadataService, LocalThumbnailService, MetadataService,
    ThumbnailService,
};

pub struct ViewerEngine {
    config: ViewerConfig,
    ui_state: Mutex<UiState>,
    fs: Arc<dyn FileService>,
    pub metadata: Arc<MetadataCache>,
    pub thumbnails: Arc<ThumbnailLoader>,
    pub store: Arc<DirectoryEntryStore>,
    pub tree: Arc<DirectoryTreeController>,
    pub conflicts: Arc<ConflictResolver>,
    pub bulk: Arc<BulkTransferCoordinator>,
    pub burst: Arc<BurstSelector>,
    pub nav: Arc<NavigationCoordinator>,
}

impl ViewerEngine {
    /// Assemble an engine over the local filesystem services rooted at
    /// `config.root_dir`.
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let root = config
            .root_dir
            .clone()
            .ok_or_else(|| ViewerError::Config("root_dir is not set".to_string()))?;
        let fs: Arc<dyn FileService> = Arc::new(LocalFileService::new(&root)?);
        let metadata: Arc<dyn MetadataService> = Arc::new(LocalMetadataService::new(&root));
        let thumbnails: Arc<dyn ThumbnailService> = Arc::new(LocalThumbnailService::new(&root));
        Self::with_services(config, fs, metadata, thumbnails)
    }

    /// Assemble an engine over injected services.
    pub fn with_services(
        config: ViewerConfig,
        fs: Arc<dyn FileService>,
        metadata_service: Arc<dyn MetadataService>,
        thumbnail_service: Arc<dyn ThumbnailService>,
    ) -> Result<Self> {
        let ui_state = UiState::load();

        let metadata = Arc::new(metadata_cache(
            metadata_service,
            config.fetch.metadata_concurrency,
        ));
        let thumbnails = Arc::new(thumbnail_loader(
            thumbnail_service,
            config.fetch.thumbnail_concurrency,
        ));

        let store = Arc::new(DirectoryEntryStore::new(fs.clone()));
        let tree = Arc::new(DirectoryTreeController::new(Duration::from_millis(
            config.tree.auto_expand_dwell_ms,
        )));
        tree.set_marked_dir(ui_state.marked_dir.clone());

        let conflicts = Arc::new(ConflictResolver::new());
        let bulk = Arc::new(BulkTransferCoordinator::new(
            fs.clone(),
            conflicts.clone(),
            store.clone(),
        ));
        let burst = Arc::new(BurstSelector::new(
            metadata.clone(),
            store.clone(),
            config.burst.max_gap_ms,
        ));
        let nav = Arc::new(NavigationCoordinator::new(
            fs.clone(),
            store.clone(),
            metadata.clone(),
            thumbnails.clone(),
            Duration::from_millis(config.navigation.suppress_window_ms),
        ));

        Ok(Self {
            config,
            ui_state: Mutex::new(ui_state),
            fs,
            metadata,
            thumbnails,
            store,
            tree,
            conflicts,
            bulk,
            burst,
            nav,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Preview image paths for a directory card.
    pub async fn dir_thumbs(&self, path: &str) -> Result<Vec<String>> {
        Ok(self.fs.list_dir_thumbs(path).await?)
    }

    /// Refresh the folder tree panel from the service.
    pub async fn load_tree(&self) -> Result<()> {
        let tree = self.fs.list_tree(".", self.config.tree.depth).await?;
        self.tree.set_tree(tree);
        Ok(())
    }

    /// Navigate to a directory and mirror it in the tree panel.
    pub async fn open_dir(self: &Arc<Self>, path: &str) -> Result<()> {
        self.nav.push_dir(path).await?;
        self.tree.set_current_dir(&self.store.current_dir());
        Ok(())
    }

    // ----- persisted UI scalars -----

    pub fn card_width(&self) -> u32 {
        self.ui_state.lock().card_width
    }

    pub fn set_card_width(&self, width: u32) {
        let mut state = self.ui_state.lock();
        state.card_width = width.max(1);
        if let Err(e) = state.save() {
            tracing::warn!("failed to persist ui state: {}", e);
        }
    }

    /// Toggle the pinned move destination and persist it.
    pub fn toggle_marked_dir(&self, path: &str) -> Option<String> {
        let mark = self.tree.toggle_mark(path);
        let mut state = self.ui_state.lock();
        state.marked_dir = mark.clone();
        if let Err(e) = state.save() {
            tracing::warn!("failed to persist ui state: {}", e);
        }
        mark
    }

    pub fn marked_dir(&self) -> Option<String> {
        self.tree.marked_dir()
    }
}
