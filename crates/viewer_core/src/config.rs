//! Engine configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Storage root for the local service implementations
    pub root_dir: Option<PathBuf>,
    pub fetch: FetchConfig,
    pub navigation: NavigationConfig,
    pub tree: TreeConfig,
    pub burst: BurstConfig,
    pub grid: GridConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            fetch: FetchConfig::default(),
            navigation: NavigationConfig::default(),
            tree: TreeConfig::default(),
            burst: BurstConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

/// Per-cache concurrency ceilings; metadata and thumbnails use separate
/// resource pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub metadata_concurrency: usize,
    pub thumbnail_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            metadata_concurrency: 5,
            thumbnail_concurrency: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// How long thumbnail prefetch stays suppressed after a navigation
    /// starts, in milliseconds.
    pub suppress_window_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            suppress_window_ms: 150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Dwell before a drag hover auto-expands a collapsed node, in
    /// milliseconds.
    pub auto_expand_dwell_ms: u64,
    /// Depth passed to the tree listing service.
    pub depth: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            auto_expand_dwell_ms: 600,
            depth: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    /// Maximum capture-time gap between adjacent burst members, in
    /// milliseconds.
    pub max_gap_ms: i64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self { max_gap_ms: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub default_card_width: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_card_width: 220,
        }
    }
}

impl ViewerConfig {
    /// Load configuration from file
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "PhotoDeck", "PhotoDeck")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_toml() {
        let config = ViewerConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: ViewerConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.fetch.metadata_concurrency, 5);
        assert_eq!(back.navigation.suppress_window_ms, 150);
        assert_eq!(back.tree.auto_expand_dwell_ms, 600);
        assert_eq!(back.burst.max_gap_ms, 1000);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ViewerConfig = toml::from_str("[fetch]\nmetadata_concurrency = 2\n").unwrap();
        assert_eq!(config.fetch.metadata_concurrency, 2);
        assert_eq!(config.fetch.thumbnail_concurrency, 5);
        assert_eq!(config.grid.default_card_width, 220);
    }
}
