use anyhow::{bail, Context, Result};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs::DirEntry;

use crate::models::{ContentHandle, FileEntry};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Walks `root` and returns every regular file as a [`FileEntry`] whose path
/// starts with the root directory's own name (`TeslaCam/SavedClips/...`).
/// Symlinked directories are not followed. Unreadable subdirectories are
/// logged and skipped; only an unreadable `root` is an error.
pub async fn scan_directory(root: &Path) -> Result<Vec<FileEntry>> {
    let metadata = tokio::fs::metadata(root)
        .await
        .with_context(|| format!("failed to open archive root {}", root.display()))?;
    if !metadata.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    let root_label = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut entries = Vec::new();
    let mut pending: Vec<(PathBuf, String)> = vec![(root.to_path_buf(), root_label)];

    while let Some((dir, relative)) = pending.pop() {
        let listed = list_dir(&dir).await;
        let Some(children) = keep_listing(&dir, root, listed)? else {
            continue;
        };

        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let child_relative = if relative.is_empty() {
                name
            } else {
                format!("{relative}/{name}")
            };

            let file_type = match child.file_type().await {
                Ok(file_type) => file_type,
                Err(err) => {
                    log_warn!("Skipping {}: {}", child.path().display(), err);
                    continue;
                }
            };

            if file_type.is_dir() {
                pending.push((child.path(), child_relative));
            } else if file_type.is_file() {
                entries.push(FileEntry::new(
                    child_relative,
                    ContentHandle::from_path(child.path()),
                ));
            }
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    log_info!("Scanned {} files under {}", entries.len(), root.display());
    Ok(entries)
}

async fn list_dir(dir: &Path) -> io::Result<Vec<DirEntry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(child) = reader.next_entry().await? {
        children.push(child);
    }
    Ok(children)
}

/// A listing failure is fatal only for the root; anywhere below it the
/// directory is logged and skipped.
fn keep_listing<T>(dir: &Path, root: &Path, listed: io::Result<Vec<T>>) -> Result<Option<Vec<T>>> {
    match listed {
        Ok(children) => Ok(Some(children)),
        Err(err) if dir == root => {
            Err(err).with_context(|| format!("failed to list {}", dir.display()))
        }
        Err(err) => {
            log_warn!("Skipping unreadable directory {}: {}", dir.display(), err);
            Ok(None)
        }
    }
}
