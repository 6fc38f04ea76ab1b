//! Directory entries and identity keys

use serde::{Deserialize, Serialize};

/// What a listed entry is, dispatched by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    Image,
    Video,
    Other,
}

impl EntryKind {
    /// Media entries are the only ones that carry capture timestamps.
    pub fn is_media(self) -> bool {
        matches!(self, EntryKind::Image | EntryKind::Video)
    }
}

const IMAGE_EXT: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic"];
const VIDEO_EXT: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// Classify a file name by its extension.
pub fn kind_for_name(name: &str) -> EntryKind {
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => return EntryKind::Other,
    };
    if IMAGE_EXT.contains(&ext.as_str()) {
        EntryKind::Image
    } else if VIDEO_EXT.contains(&ext.as_str()) {
        EntryKind::Video
    } else {
        EntryKind::Other
    }
}

/// Stable identity string for an entry.
///
/// Directories are suffixed with `/` so a directory and a file sharing a
/// name never collide in the checked set or caches.
pub type EntryKey = String;

/// One item in a directory listing. An immutable snapshot; a new listing
/// fully replaces the prior set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub relative_path: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(name: impl Into<String>, relative_path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            relative_path: relative_path.into(),
            kind,
        }
    }

    pub fn key(&self) -> EntryKey {
        if self.kind == EntryKind::Dir {
            format!("{}/", self.relative_path)
        } else {
            self.relative_path.clone()
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_media(&self) -> bool {
        self.kind.is_media()
    }
}
