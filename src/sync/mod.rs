pub mod cache;
pub mod mod_downloader;
pub mod overrides;
pub mod reconcile;

use crate::config::SyncConfig;
use crate::error::{AppError, Result};
use crate::integrations::modrinth::{self, LatestVersion};
use crate::integrations::mrpack;
use crate::utils::http_utils::{HttpTransport, ReqwestTransport};
use cache::{CachedArchive, ModpackCache};
use log::{error, info, warn};
use mod_downloader::{DownloadReport, ModDownloadService};
use overrides::{OverrideOutcome, OverrideReport};
use sanitize_filename::sanitize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;

/// Prefix of the scratch directory a run creates in the profile.
pub const TEMP_DIR_PREFIX: &str = ".modpack-sync-";

/// What a completed sync run did.
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub version: LatestVersion,
    /// Sanitized file name used for the temp download and the cache entry.
    pub archive_file_name: String,
    pub deleted: Vec<String>,
    /// (file name, reason)
    pub delete_failures: Vec<(String, String)>,
    pub downloads: Vec<DownloadReport>,
    pub overrides: Vec<OverrideReport>,
    /// Set when the archive was promoted into the cache.
    pub cached_archive: Option<PathBuf>,
}

impl SyncSummary {
    pub fn failed_downloads(&self) -> impl Iterator<Item = &DownloadReport> {
        self.downloads.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn failed_overrides(&self) -> impl Iterator<Item = &OverrideReport> {
        self.overrides
            .iter()
            .filter(|r| matches!(r.outcome, OverrideOutcome::Failed(_)))
    }

    /// No download or override failed. Stale-mod deletion failures do not count.
    pub fn is_complete(&self) -> bool {
        self.failed_downloads().next().is_none() && self.failed_overrides().next().is_none()
    }
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The version list could not be fetched or was empty. Nothing was touched.
    VersionUnavailable { reason: String },
    UpToDate { archive_file_name: String },
    Updated(SyncSummary),
}

/// Read-only view used by the `status` command.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub latest: std::result::Result<LatestVersion, String>,
    pub latest_cached: Option<CachedArchive>,
    pub up_to_date: bool,
}

/// Sequences one sync run: fetch version, check cache, download archive,
/// read it, reconcile mods, download, apply overrides, cache the archive.
pub struct ModpackSync {
    config: SyncConfig,
    transport: Arc<dyn HttpTransport>,
    cache: ModpackCache,
}

impl ModpackSync {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: SyncConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        let cache = ModpackCache::new(config.cache_dir());
        Ok(Self {
            config,
            transport,
            cache,
        })
    }

    async fn latest_version(&self) -> Result<LatestVersion> {
        modrinth::fetch_latest_version(
            self.transport.as_ref(),
            &self.config.api_url,
            Some(self.config.request_timeout),
        )
        .await
    }

    pub async fn run(&self) -> Result<SyncOutcome> {
        // --- Resolve latest version ---
        let latest = match self.latest_version().await {
            Ok(latest) => latest,
            Err(e) => {
                error!("Could not determine the latest modpack version: {}", e);
                return Ok(SyncOutcome::VersionUnavailable {
                    reason: e.to_string(),
                });
            }
        };

        let archive_file_name = archive_file_name(&latest)?;

        // --- Check cache ---
        if self.cache.has_version(&archive_file_name).await? {
            info!("Modpack is already up to date ({})", archive_file_name);
            return Ok(SyncOutcome::UpToDate { archive_file_name });
        }

        // --- Download archive ---
        info!("Downloading modpack version {}...", archive_file_name);
        // Removed when dropped, on every exit path below.
        let temp_dir = self.create_temp_dir().await?;
        let archive_path = temp_dir.path().join(&archive_file_name);
        self.download_archive(&latest.url, &archive_path).await?;

        // --- Read archive ---
        // Nothing in the profile is touched until the archive is known to be valid.
        let archive = mrpack::read_mrpack(&archive_path).await?;

        // --- Reconcile mods ---
        let mods_dir = self.config.mods_dir();
        let reconciliation =
            reconcile::reconcile(&mods_dir, &self.config.mods_dir_name, &archive.manifest.files)
                .await?;

        // --- Download files ---
        let downloader = ModDownloadService::new(self.transport.clone())
            .with_concurrency(self.config.concurrent_downloads)
            .with_request_timeout(self.config.request_timeout);
        let downloads = downloader
            .download_all(&reconciliation.plan.to_download, &self.config.profile_dir)
            .await;

        // --- Apply overrides ---
        let override_reports =
            overrides::apply_overrides(&self.config.profile_dir, &archive.overrides).await;

        let mut summary = SyncSummary {
            version: latest,
            archive_file_name,
            deleted: reconciliation.deletions.deleted,
            delete_failures: reconciliation.deletions.failed,
            downloads,
            overrides: override_reports,
            cached_archive: None,
        };

        // --- Cache archive ---
        if summary.is_complete() {
            let stored = self
                .cache
                .store(&archive_path, &summary.archive_file_name)
                .await?;
            summary.cached_archive = Some(stored);
            info!("Modpack updated successfully");
        } else {
            warn!(
                "Modpack applied with errors ({} downloads, {} overrides failed); \
                 version not cached so the next run retries",
                summary.failed_downloads().count(),
                summary.failed_overrides().count()
            );
        }

        Ok(SyncOutcome::Updated(summary))
    }

    /// Reports the latest remote version and the cache state without touching the profile.
    pub async fn status(&self) -> Result<SyncStatus> {
        let latest_cached = self.cache.latest_cached().await?;

        let latest = match self.latest_version().await {
            Ok(latest) => latest,
            Err(e) => {
                return Ok(SyncStatus {
                    latest: Err(e.to_string()),
                    latest_cached,
                    up_to_date: false,
                })
            }
        };

        let up_to_date = self.cache.has_version(&archive_file_name(&latest)?).await?;
        Ok(SyncStatus {
            latest: Ok(latest),
            latest_cached,
            up_to_date,
        })
    }

    /// Scratch directory for the archive, inside the profile so caching it
    /// later is a rename on the same filesystem.
    async fn create_temp_dir(&self) -> Result<TempDir> {
        let parent = &self.config.profile_dir;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::filesystem(parent, e))?;
        tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| AppError::filesystem(parent, e))
    }

    async fn download_archive(&self, url: &str, target: &Path) -> Result<()> {
        // No per-request timeout: a pack archive can be large.
        let written = self
            .transport
            .download_to_file(url, target, None)
            .await
            .map_err(|e| {
                error!("Failed to download modpack: {}", e);
                e
            })?;
        info!("Modpack downloaded to {:?} ({} bytes)", target, written);
        Ok(())
    }
}

fn archive_file_name(latest: &LatestVersion) -> Result<String> {
    let name = sanitize(&latest.filename);
    if name.is_empty() {
        return Err(AppError::EmptyCatalog(format!(
            "version {} has an unusable file name '{}'",
            latest.version_number, latest.filename
        )));
    }
    Ok(name)
}
