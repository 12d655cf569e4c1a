use crate::error::{AppError, Result};
use crate::utils::http_utils::HttpTransport;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Subset of https://docs.modrinth.com/api/operations/getprojectversions/
// that the sync needs. Unknown fields are ignored.

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModrinthVersion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version_number: String,
    pub files: Vec<ModrinthFile>,
    #[serde(default)]
    pub date_published: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModrinthFile {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub size: Option<u64>,
}

/// The newest published pack file of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestVersion {
    pub filename: String,
    pub url: String,
    pub version_number: String,
}

/// Fetches the version list from `api_url` and returns the first file of the first
/// (newest) version.
pub async fn fetch_latest_version(
    transport: &dyn HttpTransport,
    api_url: &str,
    timeout: Option<Duration>,
) -> Result<LatestVersion> {
    info!("Getting Modrinth versions: {}", api_url);

    let body = transport.get_bytes(api_url, timeout).await?;
    let versions: Vec<ModrinthVersion> = serde_json::from_slice(&body)?;
    debug!("Modrinth returned {} versions", versions.len());

    latest_from_versions(versions, api_url)
}

fn latest_from_versions(versions: Vec<ModrinthVersion>, api_url: &str) -> Result<LatestVersion> {
    let newest = versions
        .into_iter()
        .next()
        .ok_or_else(|| AppError::EmptyCatalog(format!("{} lists no versions", api_url)))?;

    let file = newest.files.into_iter().next().ok_or_else(|| {
        AppError::EmptyCatalog(format!(
            "newest version '{}' ({}) has no files",
            newest.version_number, newest.id
        ))
    })?;

    info!(
        "Latest version: {} ({})",
        newest.version_number, file.filename
    );

    Ok(LatestVersion {
        filename: file.filename,
        url: file.url,
        version_number: newest.version_number,
    })
}
