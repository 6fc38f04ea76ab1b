//! Local implementations of the service seams, rooted at one directory

use crate::relpath::{join_rel, natural_sort_key, normalize_dir};
use crate::service::{
    FileService, Metadata, MetadataPayload, MetadataService, MoveOutcome, MoveStrategy,
    ThumbnailService, TreeNode, DEFAULT_TREE_DEPTH, DIR_THUMB_COUNT, MAX_TREE_DEPTH,
};
use crate::{entry::kind_for_name, Entry, EntryKind, FsError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Resolve a relative path strictly under `root`.
///
/// Purely lexical: `..` may not climb above the root, absolute prefixes
/// are rejected. The target does not need to exist.
fn resolve_under(root: &Path, relative: &str) -> Result<PathBuf> {
    let trimmed = relative.trim_start_matches('/');
    let mut resolved = root.to_path_buf();
    let mut depth: usize = 0;

    for comp in Path::new(trimmed).components() {
        match comp {
            Component::Normal(c) => {
                resolved.push(c);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(FsError::InvalidPath(relative.to_string()));
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(FsError::InvalidPath(relative.to_string()));
            }
        }
    }

    Ok(resolved)
}

fn split_name_ext(base: &str) -> (&str, &str) {
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (base, ""),
    }
}

/// Next free `name~N.ext` candidate in `dest_abs`, N starting at 2.
fn tilde_rename_target(dest_abs: &Path, base: &str) -> Result<PathBuf> {
    let (stem, ext) = split_name_ext(base);
    for i in 2..100u32 {
        let candidate = if ext.is_empty() {
            format!("{}~{}", stem, i)
        } else {
            format!("{}~{}.{}", stem, i, ext)
        };
        let full = dest_abs.join(&candidate);
        if !full.exists() {
            return Ok(full);
        }
    }
    Err(FsError::InvalidOperation(format!(
        "failed to generate unique rename for {}",
        base
    )))
}

/// Blocking half of `move_item`; runs on the blocking pool.
fn move_on_disk(
    src_abs: &Path,
    dest_abs: &Path,
    base: &str,
    source_path: &str,
    strategy: MoveStrategy,
) -> Result<MoveOutcome> {
    // Source already moved by a prior step: skip, not an error.
    if !src_abs.exists() {
        tracing::debug!("move source vanished, skipping: {}", source_path);
        return Ok(MoveOutcome::Skipped);
    }

    let dest_path = dest_abs.join(base);
    if !dest_path.exists() {
        std::fs::rename(src_abs, &dest_path).map_err(|e| FsError::from_io(e, source_path))?;
        return Ok(MoveOutcome::Moved {
            final_name: base.to_string(),
        });
    }

    match strategy {
        MoveStrategy::Ask => Ok(MoveOutcome::Conflict {
            existing_name: base.to_string(),
        }),
        MoveStrategy::Skip => Ok(MoveOutcome::Skipped),
        MoveStrategy::Overwrite => {
            remove_any(&dest_path).map_err(|e| FsError::from_io(e, base))?;
            std::fs::rename(src_abs, &dest_path).map_err(|e| FsError::from_io(e, source_path))?;
            Ok(MoveOutcome::Moved {
                final_name: base.to_string(),
            })
        }
        MoveStrategy::Rename => {
            let target = tilde_rename_target(dest_abs, base)?;
            let final_name = target
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(base)
                .to_string();
            std::fs::rename(src_abs, &target).map_err(|e| FsError::from_io(e, source_path))?;
            Ok(MoveOutcome::Moved { final_name })
        }
    }
}

fn remove_any(path: &Path) -> std::io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Directory listing, tree, and transfer operations on the local disk
#[derive(Debug, Clone)]
pub struct LocalFileService {
    root: PathBuf,
}

impl LocalFileService {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(FsError::NotADirectory(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        resolve_under(&self.root, relative)
    }
}

fn build_tree(abs: &Path, rel: &str, level: u32, max_depth: u32) -> TreeNode {
    let name = if rel == "." {
        "ROOT".to_string()
    } else {
        rel.rsplit('/').next().unwrap_or(rel).to_string()
    };
    let mut node = TreeNode {
        name,
        path: rel.to_string(),
        children: Vec::new(),
    };

    if level >= max_depth {
        return node;
    }

    // Unreadable subtrees are pruned silently.
    let read = match std::fs::read_dir(abs) {
        Ok(r) => r,
        Err(_) => return node,
    };

    let mut dirs: Vec<String> = read
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| !n.starts_with('.'))
        .collect();
    dirs.sort_by(|a, b| natural_sort_key(a).cmp(&natural_sort_key(b)));

    for d in dirs {
        let child_rel = join_rel(rel, &d);
        node.children
            .push(build_tree(&abs.join(&d), &child_rel, level + 1, max_depth));
    }

    node
}

#[async_trait]
impl FileService for LocalFileService {
    async fn list_directory(&self, path: &str) -> Result<Vec<Entry>> {
        let rel = normalize_dir(path);
        let abs = self.resolve(&rel)?;

        let mut read = tokio::fs::read_dir(&abs)
            .await
            .map_err(|e| FsError::from_io(e, &rel))?;

        let mut entries = Vec::new();
        while let Some(item) = read.next_entry().await.map_err(|e| FsError::from_io(e, &rel))? {
            let name = match item.file_name().into_string() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if name.starts_with('.') {
                continue;
            }
            let kind = match item.file_type().await {
                Ok(t) if t.is_dir() => EntryKind::Dir,
                Ok(_) => kind_for_name(&name),
                Err(_) => continue, // entry vanished mid-listing
            };
            let relative_path = join_rel(&rel, &name);
            entries.push(Entry::new(name, relative_path, kind));
        }

        Ok(entries)
    }

    async fn list_tree(&self, path: &str, depth: u32) -> Result<TreeNode> {
        let rel = normalize_dir(path);
        let abs = self.resolve(&rel)?;
        if !abs.is_dir() {
            return Err(FsError::NotFound(rel));
        }

        let max_depth = if depth == 0 {
            DEFAULT_TREE_DEPTH
        } else {
            depth.min(MAX_TREE_DEPTH)
        };

        let tree =
            tokio::task::spawn_blocking(move || build_tree(&abs, &rel, 0, max_depth))
                .await
                .map_err(|e| FsError::InvalidOperation(e.to_string()))?;
        Ok(tree)
    }

    async fn list_dir_thumbs(&self, path: &str) -> Result<Vec<String>> {
        let rel = normalize_dir(path);
        let abs = self.resolve(&rel)?;

        let mut read = tokio::fs::read_dir(&abs)
            .await
            .map_err(|e| FsError::from_io(e, &rel))?;

        let mut names = Vec::new();
        while let Some(item) = read.next_entry().await.map_err(|e| FsError::from_io(e, &rel))? {
            let name = match item.file_name().into_string() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if name.starts_with('.') {
                continue;
            }
            match item.file_type().await {
                Ok(t) if t.is_file() && kind_for_name(&name) == EntryKind::Image => {
                    names.push(name)
                }
                _ => {}
            }
        }

        names.sort_by(|a, b| natural_sort_key(a).cmp(&natural_sort_key(b)));
        names.truncate(DIR_THUMB_COUNT);
        Ok(names.into_iter().map(|n| join_rel(&rel, &n)).collect())
    }

    async fn move_item(
        &self,
        source_path: &str,
        dest_dir: &str,
        strategy: MoveStrategy,
    ) -> Result<MoveOutcome> {
        let src_abs = self.resolve(source_path)?;
        let dest_rel = normalize_dir(dest_dir);
        let dest_abs = self.resolve(&dest_rel)?;

        tokio::fs::create_dir_all(&dest_abs)
            .await
            .map_err(|e| FsError::from_io(e, &dest_rel))?;

        let base = src_abs
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FsError::InvalidPath(source_path.to_string()))?
            .to_string();

        // Existence probes, overwrite removal, and the rename probes all
        // touch the disk; keep them off the async runtime.
        let source = source_path.to_string();
        let outcome = tokio::task::spawn_blocking(move || {
            move_on_disk(&src_abs, &dest_abs, &base, &source, strategy)
        })
        .await
        .map_err(|e| FsError::InvalidOperation(e.to_string()))??;

        if let MoveOutcome::Moved { final_name } = &outcome {
            tracing::info!("Moved: {} -> {}/{}", source_path, dest_rel, final_name);
        }
        Ok(outcome)
    }

    async fn delete_item(&self, path: &str) -> Result<()> {
        let abs = self.resolve(path)?;
        tokio::task::spawn_blocking(move || remove_any(&abs))
            .await
            .map_err(|e| FsError::InvalidOperation(e.to_string()))?
            .map_err(|e| FsError::from_io(e, path))?;
        tracing::info!("Deleted: {}", path);
        Ok(())
    }
}

/// Filesystem-level metadata. Embedded tag extraction lives behind a
/// remote seam; locally only the modification time is available.
#[derive(Debug, Clone)]
pub struct LocalMetadataService {
    root: PathBuf,
}

impl LocalMetadataService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl MetadataService for LocalMetadataService {
    async fn fetch_metadata(&self, path: &str) -> Result<MetadataPayload> {
        let abs = resolve_under(&self.root, path)?;

        let meta = match tokio::fs::metadata(&abs).await {
            Ok(m) => m,
            Err(e) => return Ok(MetadataPayload::failed(e.to_string())),
        };

        let mut tags = Metadata::default();
        if let Ok(modified) = meta.modified() {
            let stamp: chrono::DateTime<chrono::Local> = modified.into();
            tags.insert(
                "FileModifyDate",
                stamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            );
        }

        Ok(MetadataPayload::ok(tags))
    }
}

/// Raw thumbnail bytes from disk; rasterization/transcoding is external.
#[derive(Debug, Clone)]
pub struct LocalThumbnailService {
    root: PathBuf,
}

impl LocalThumbnailService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ThumbnailService for LocalThumbnailService {
    async fn fetch_thumbnail(&self, path: &str) -> Result<Vec<u8>> {
        let abs = resolve_under(&self.root, path)?;
        tokio::fs::read(&abs)
            .await
            .map_err(|e| FsError::from_io(e, path))
    }
}
