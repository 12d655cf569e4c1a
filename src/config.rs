use crate::error::{AppError, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::time::Duration;

pub static SYNC_DIRECTORY: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "modpack-sync", "ModpackSync"));

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_CONCURRENT_DOWNLOADS: usize = 5;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_DIR_NAME: &str = "modpacks";
pub const DEFAULT_MODS_DIR_NAME: &str = "mods";

/// Everything a sync run needs to know, handed to the orchestrator up front.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Root of the Minecraft game profile that gets mutated.
    pub profile_dir: PathBuf,
    /// Modrinth "list project versions" endpoint, newest version first.
    pub api_url: String,
    pub concurrent_downloads: usize,
    /// Bounds a single request, not the whole batch.
    pub request_timeout: Duration,
    pub cache_dir_name: String,
    pub mods_dir_name: String,
}

impl SyncConfig {
    pub fn new(profile_dir: impl Into<PathBuf>, api_url: impl Into<String>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
            api_url: api_url.into(),
            concurrent_downloads: DEFAULT_CONCURRENT_DOWNLOADS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_dir_name: DEFAULT_CACHE_DIR_NAME.to_string(),
            mods_dir_name: DEFAULT_MODS_DIR_NAME.to_string(),
        }
    }

    pub fn with_concurrency(mut self, concurrent_downloads: usize) -> Self {
        self.concurrent_downloads = concurrent_downloads;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.profile_dir.join(&self.cache_dir_name)
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.profile_dir.join(&self.mods_dir_name)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(AppError::Config("API URL must not be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "API URL must be http(s), got '{}'",
                url
            )));
        }
        if self.concurrent_downloads == 0 {
            return Err(AppError::Config(
                "Concurrent downloads must be at least 1".into(),
            ));
        }
        if self.profile_dir.exists() && !self.profile_dir.is_dir() {
            return Err(AppError::Config(format!(
                "Profile path {:?} is not a directory",
                self.profile_dir
            )));
        }
        Ok(())
    }
}

/// Default location for log files when none is given on the command line.
pub fn default_log_dir() -> PathBuf {
    match SYNC_DIRECTORY.as_ref() {
        Some(dirs) => dirs.data_dir().join("logs"),
        None => std::env::temp_dir().join("modpack-sync").join("logs"),
    }
}
