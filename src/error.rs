use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote error: {url} returned status {status}")]
    Remote { url: String, status: u16 },

    #[error("Modrinth returned no usable version: {0}")]
    EmptyCatalog(String),

    #[error("Malformed modpack archive: {0}")]
    MalformedArchive(String),

    #[error("Filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AppError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
