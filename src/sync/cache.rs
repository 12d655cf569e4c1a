use crate::error::{AppError, Result};
use crate::utils::file_utils;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// A previously downloaded modpack archive in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArchive {
    pub path: PathBuf,
    pub file_name: String,
    pub modified: SystemTime,
}

/// The `<profile>/modpacks` directory. Archives in it are never mutated or pruned.
#[derive(Debug, Clone)]
pub struct ModpackCache {
    dir: PathBuf,
}

impl ModpackCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Every regular file in the cache, whatever its extension. A missing
    /// directory is an empty cache. Hidden files are in-flight copies from
    /// `move_file` and never count as cached.
    pub async fn archives(&self) -> Result<Vec<CachedArchive>> {
        let mut archives = Vec::new();
        if !self.dir.is_dir() {
            return Ok(archives);
        }

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| AppError::filesystem(&self.dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::filesystem(&self.dir, e))?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            archives.push(CachedArchive {
                path: entry.path(),
                file_name,
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        Ok(archives)
    }

    /// True iff a cached archive's name contains `version_file_name`.
    pub async fn has_version(&self, version_file_name: &str) -> Result<bool> {
        let found = self
            .archives()
            .await?
            .iter()
            .any(|archive| archive.file_name.contains(version_file_name));
        debug!(
            "Cache lookup for '{}' in {:?}: {}",
            version_file_name, self.dir, found
        );
        Ok(found)
    }

    /// The most recently modified cached archive, if any.
    pub async fn latest_cached(&self) -> Result<Option<CachedArchive>> {
        Ok(self
            .archives()
            .await?
            .into_iter()
            .max_by_key(|archive| archive.modified))
    }

    /// Moves a fully applied archive into the cache under `file_name`.
    pub async fn store(&self, archive_path: &Path, file_name: &str) -> Result<PathBuf> {
        let target = self.dir.join(file_name);
        file_utils::move_file(archive_path, &target).await?;
        info!("Cached modpack archive at {:?}", target);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_missing_dir_is_empty_cache() {
        let temp = tempfile::tempdir().unwrap();
        let cache = ModpackCache::new(temp.path().join("modpacks"));
        assert!(!cache.has_version("pack-v1.mrpack").await.unwrap());
        assert!(cache.latest_cached().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_has_version_matches_substring() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("modpacks");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("pack-v2.mrpack"), b"zip").unwrap();
        std::fs::write(dir.join("notes.txt"), b"pack-v3.mrpack").unwrap();

        let cache = ModpackCache::new(&dir);
        assert!(cache.has_version("pack-v2.mrpack").await.unwrap());
        assert!(cache.has_version("pack-v2").await.unwrap());
        assert!(!cache.has_version("pack-v3.mrpack").await.unwrap());
    }

    #[tokio::test]
    async fn test_has_version_ignores_extension() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("modpacks");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("pack-v1.zip"), b"zip").unwrap();

        let cache = ModpackCache::new(&dir);
        assert!(cache.has_version("pack-v1.zip").await.unwrap());
        assert_eq!(
            cache.latest_cached().await.unwrap().unwrap().file_name,
            "pack-v1.zip"
        );
    }

    #[tokio::test]
    async fn test_partial_copy_is_not_a_cached_version() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("modpacks");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(".pack-v1.mrpack.part"), b"trunc").unwrap();
        std::fs::create_dir_all(dir.join("pack-v1.mrpack.d")).unwrap();

        let cache = ModpackCache::new(&dir);
        assert!(!cache.has_version("pack-v1.mrpack").await.unwrap());
        assert!(cache.latest_cached().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_cached_uses_modification_time() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("modpacks");
        std::fs::create_dir_all(&dir).unwrap();

        let older = dir.join("pack-v1.mrpack");
        let newer = dir.join("pack-v2.mrpack");
        std::fs::write(&newer, b"new").unwrap();
        std::fs::write(&older, b"old").unwrap();

        let now = SystemTime::now();
        std::fs::File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(now - Duration::from_secs(3600))
            .unwrap();
        std::fs::File::options()
            .write(true)
            .open(&newer)
            .unwrap()
            .set_modified(now)
            .unwrap();

        let latest = ModpackCache::new(&dir).latest_cached().await.unwrap().unwrap();
        assert_eq!(latest.file_name, "pack-v2.mrpack");
    }

    #[tokio::test]
    async fn test_store_moves_archive() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("download.mrpack");
        std::fs::write(&source, b"archive").unwrap();

        let cache = ModpackCache::new(temp.path().join("modpacks"));
        let stored = cache.store(&source, "pack-v1.mrpack").await.unwrap();

        assert!(!source.exists());
        assert_eq!(std::fs::read(&stored).unwrap(), b"archive");
        assert!(cache.has_version("pack-v1.mrpack").await.unwrap());
    }
}
