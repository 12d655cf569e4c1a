use crate::error::{AppError, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes `data` to `target_path`, creating parent directories and replacing
/// any existing file. The file is synced before the handle is dropped.
pub async fn write_file(target_path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::filesystem(parent, e))?;
    }

    let mut file = fs::File::create(target_path)
        .await
        .map_err(|e| AppError::filesystem(target_path, e))?;

    file.write_all(data)
        .await
        .map_err(|e| AppError::filesystem(target_path, e))?;

    // Flush to disk before anyone (including the next run) stats the file.
    file.sync_all()
        .await
        .map_err(|e| AppError::filesystem(target_path, e))?;

    drop(file);
    Ok(())
}

/// Size of the regular file at `path`, or `None` if it does not exist or is not a file.
pub async fn file_size(path: &Path) -> Option<u64> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

/// Moves `source` to `target`, falling back to copy + delete when a plain
/// rename is not possible (e.g. across filesystems). `target` only ever
/// appears complete.
pub async fn move_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::filesystem(parent, e))?;
    }

    match fs::rename(source, target).await {
        Ok(()) => {
            debug!("Renamed {:?} -> {:?}", source, target);
            Ok(())
        }
        Err(rename_err) => {
            debug!(
                "Rename {:?} -> {:?} failed ({}), copying instead",
                source, target, rename_err
            );
            copy_into_place(source, target).await?;
            if let Err(e) = fs::remove_file(source).await {
                warn!("Copied {:?} but could not remove source: {}", source, e);
            }
            Ok(())
        }
    }
}

/// Hidden sibling of `target` that a copy is staged in.
fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.part", name))
}

/// Copies `source` next to `target` under a hidden name, then renames it into
/// place. A failed copy leaves neither the staged file nor `target` behind.
async fn copy_into_place(source: &Path, target: &Path) -> Result<()> {
    let partial = partial_path(target);

    if let Err(e) = fs::copy(source, &partial).await {
        if let Err(cleanup) = fs::remove_file(&partial).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove partial copy {:?}: {}", partial, cleanup);
            }
        }
        return Err(AppError::filesystem(target, e));
    }

    // Same directory, so this is atomic.
    if let Err(e) = fs::rename(&partial, target).await {
        let _ = fs::remove_file(&partial).await;
        return Err(AppError::filesystem(target, e));
    }
    Ok(())
}
