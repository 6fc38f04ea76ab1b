//! Persisted UI scalars
//!
//! The marked move destination and the card-size preference survive
//! restarts as a small JSON state file.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    /// User-pinned default bulk-move target
    pub marked_dir: Option<String>,
    pub card_width: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            marked_dir: None,
            card_width: 220,
        }
    }
}

impl UiState {
    pub fn load() -> Self {
        let path = Self::state_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed ui state {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::state_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn state_path() -> PathBuf {
        ProjectDirs::from("com", "PhotoDeck", "PhotoDeck")
            .map(|dirs| dirs.data_dir().join("ui-state.json"))
            .unwrap_or_else(|| PathBuf::from("./ui-state.json"))
    }
}
