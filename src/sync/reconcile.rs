use crate::error::{AppError, Result};
use crate::integrations::mrpack::FileEntry;
use crate::utils::path_utils::file_name_in_dir;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tokio::fs;

const MOD_EXTENSION: &str = "jar";

/// Mod file name -> on-disk size, recomputed every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalModState {
    files: BTreeMap<String, u64>,
}

impl LocalModState {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            files: entries
                .into_iter()
                .map(|(name, size)| (name.into(), size))
                .collect(),
        }
    }

    /// Lists the managed files in `mods_dir`: every `*.jar` plus any file whose
    /// name is in `expected_names`. Anything else (e.g. `*.disabled`) is not ours
    /// to touch. A missing directory yields an empty state.
    pub async fn scan(mods_dir: &Path, expected_names: &HashSet<String>) -> Result<Self> {
        let mut files = BTreeMap::new();
        if !mods_dir.is_dir() {
            return Ok(Self { files });
        }

        let mut entries = fs::read_dir(mods_dir)
            .await
            .map_err(|e| AppError::filesystem(mods_dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::filesystem(mods_dir, e))?
        {
            let metadata = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_jar = entry
                .path()
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case(MOD_EXTENSION));
            if is_jar || expected_names.contains(&name) {
                files.insert(name, metadata.len());
            }
        }

        Ok(Self { files })
    }

    pub fn size_of(&self, name: &str) -> Option<u64> {
        self.files.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }
}

/// Delete / keep / fetch decisions for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Mod file names on disk the pack no longer lists.
    pub to_delete: Vec<String>,
    /// Mod file names on disk whose size already matches.
    pub kept: Vec<String>,
    /// Manifest entries for the downloader, in manifest order.
    pub to_download: Vec<FileEntry>,
}

/// Names of the manifest entries that live directly in `mods_dir_name`, with their sizes.
pub fn expected_mods(files: &[FileEntry], mods_dir_name: &str) -> HashMap<String, u64> {
    files
        .iter()
        .filter_map(|file| file_name_in_dir(&file.path, mods_dir_name).map(|name| (name, file.size)))
        .collect()
}

/// Diffs the manifest against the mods directory state. Pure; touches nothing.
///
/// Only entries directly under `mods_dir_name` are compared with `local`. Other
/// entries (resource packs, shaders, ...) are always handed to the downloader,
/// which skips them when their destination already has the right size.
///
/// Comparison is by name and size only: a corrupted file that happens to have
/// the expected size is kept.
pub fn plan(files: &[FileEntry], local: &LocalModState, mods_dir_name: &str) -> ReconciliationPlan {
    let expected = expected_mods(files, mods_dir_name);

    let to_delete = local
        .names()
        .filter(|name| !expected.contains_key(*name))
        .map(str::to_string)
        .collect();

    let mut kept = Vec::new();
    let mut to_download = Vec::new();
    for file in files {
        match file_name_in_dir(&file.path, mods_dir_name) {
            Some(name) if local.size_of(&name) == Some(file.size) => kept.push(name),
            _ => to_download.push(file.clone()),
        }
    }

    ReconciliationPlan {
        to_delete,
        kept,
        to_download,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub deleted: Vec<String>,
    /// (file name, reason)
    pub failed: Vec<(String, String)>,
}

/// Removes each stale mod. A failure is logged and does not stop the others.
pub async fn apply_deletions(mods_dir: &Path, to_delete: &[String]) -> DeletionReport {
    let mut report = DeletionReport::default();
    for name in to_delete {
        let path = mods_dir.join(name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed stale mod: {}", name);
                report.deleted.push(name.clone());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Stale mod already gone: {}", name);
                report.deleted.push(name.clone());
            }
            Err(e) => {
                warn!("Failed to remove stale mod {:?}: {}", path, e);
                report.failed.push((name.clone(), e.to_string()));
            }
        }
    }
    report
}

#[derive(Debug, Clone, Default)]
pub struct ReconciliationResult {
    pub plan: ReconciliationPlan,
    pub deletions: DeletionReport,
}

/// Scans `mods_dir`, deletes stale mods and returns what still has to be fetched.
pub async fn reconcile(
    mods_dir: &Path,
    mods_dir_name: &str,
    files: &[FileEntry],
) -> Result<ReconciliationResult> {
    fs::create_dir_all(mods_dir)
        .await
        .map_err(|e| AppError::filesystem(mods_dir, e))?;

    let expected_names: HashSet<String> = expected_mods(files, mods_dir_name).into_keys().collect();
    let local = LocalModState::scan(mods_dir, &expected_names).await?;
    debug!("Found {} managed mods in {:?}", local.len(), mods_dir);

    let plan = plan(files, &local, mods_dir_name);
    let deletions = apply_deletions(mods_dir, &plan.to_delete).await;

    info!(
        "{} files need downloading, {} mods kept, {} stale mods removed",
        plan.to_download.len(),
        plan.kept.len(),
        deletions.deleted.len()
    );

    Ok(ReconciliationResult { plan, deletions })
}
