use crate::error::{AppError, Result};
use crate::utils::path_utils::safe_relative_path;
use async_zip::tokio::read::seek::ZipFileReader;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::BufReader;

pub const MANIFEST_FILE_NAME: &str = "modrinth.index.json";
pub const OVERRIDES_PREFIX: &str = "overrides/";
pub const CLIENT_OVERRIDES_PREFIX: &str = "client-overrides/";

/// Represents the overall structure of a modrinth.index.json file.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")] // Modrinth uses camelCase for this file
pub struct ModrinthIndex {
    #[serde(default)]
    pub format_version: u32,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub version_id: String,
    #[serde(default)]
    pub name: String,
    pub summary: Option<String>,
    pub files: Vec<ModrinthIndexFile>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
}

/// Represents a file entry within the modrinth.index.json.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModrinthIndexFile {
    pub path: String, // Target path within the instance (e.g., "mods/fabric-api.jar")
    #[serde(default)]
    pub hashes: HashMap<String, String>,
    pub env: Option<HashMap<String, String>>, // "client"/"server" -> "required"/"optional"/"unsupported"
    #[serde(default)]
    pub downloads: Vec<String>,
    pub file_size: u64,
}

impl ModrinthIndexFile {
    fn is_client_file(&self) -> bool {
        self.env
            .as_ref()
            .and_then(|env| env.get("client"))
            .map_or(true, |support| support != "unsupported")
    }
}

/// A file the pack expects in the profile, relative to the profile root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub downloads: Vec<String>,
}

impl FileEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

#[derive(Debug, Clone)]
pub struct ModpackManifest {
    pub name: String,
    pub version_id: String,
    pub files: Vec<FileEntry>,
}

impl ModpackManifest {
    /// Validates the raw index: client-side files only, safe and unique paths.
    pub fn from_index(index: ModrinthIndex) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut files = Vec::with_capacity(index.files.len());

        for file in index.files {
            if !file.is_client_file() {
                debug!("Skipping server-only file: {}", file.path);
                continue;
            }

            let path = safe_relative_path(&file.path).ok_or_else(|| {
                AppError::MalformedArchive(format!(
                    "manifest path '{}' escapes the profile directory",
                    file.path
                ))
            })?;

            if !seen.insert(path.clone()) {
                return Err(AppError::MalformedArchive(format!(
                    "manifest lists '{}' more than once",
                    file.path
                )));
            }

            files.push(FileEntry {
                path,
                size: file.file_size,
                downloads: file.downloads,
            });
        }

        Ok(Self {
            name: index.name,
            version_id: index.version_id,
            files,
        })
    }
}

/// A file shipped inside the archive that is written verbatim into the profile.
/// Content is kept as raw bytes; nothing here interprets it as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub path: PathBuf,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ModpackArchive {
    pub manifest: ModpackManifest,
    /// `overrides/` entries first, then `client-overrides/`, each in archive order.
    pub overrides: Vec<OverrideEntry>,
}

struct EntryInfo {
    index: usize,
    name: String,
    is_dir: bool,
}

fn override_rank(name: &str) -> Option<(u8, &str)> {
    if let Some(rest) = name.strip_prefix(OVERRIDES_PREFIX) {
        Some((0, rest))
    } else if let Some(rest) = name.strip_prefix(CLIENT_OVERRIDES_PREFIX) {
        Some((1, rest))
    } else {
        None
    }
}

/// Opens a .mrpack archive and reads its manifest and all override files into memory.
pub async fn read_mrpack(pack_path: &Path) -> Result<ModpackArchive> {
    info!("Reading mrpack file: {:?}", pack_path);

    let file = File::open(pack_path).await.map_err(|e| {
        error!("Failed to open mrpack file {:?}: {}", pack_path, e);
        AppError::filesystem(pack_path, e)
    })?;
    let mut buf_reader = BufReader::new(file);

    let mut zip = ZipFileReader::with_tokio(&mut buf_reader)
        .await
        .map_err(|e| {
            error!("Failed to read zip archive {:?}: {}", pack_path, e);
            AppError::MalformedArchive(format!("not a readable zip archive: {}", e))
        })?;

    // --- Index entries ---
    let mut entries = Vec::new();
    for (index, entry) in zip.file().entries().iter().enumerate() {
        let name = match entry.filename().as_str() {
            Ok(s) => s.to_string(),
            Err(_) => {
                warn!("Skipping entry {} with non UTF-8 filename", index);
                continue;
            }
        };
        let is_dir = entry.dir().unwrap_or_else(|_| name.ends_with('/'));
        entries.push(EntryInfo {
            index,
            name,
            is_dir,
        });
    }
    debug!("Archive contains {} entries", entries.len());

    // --- Parse manifest ---
    let manifest_index = entries
        .iter()
        .find(|e| e.name == MANIFEST_FILE_NAME)
        .map(|e| e.index)
        .ok_or_else(|| {
            error!("{} not found in archive: {:?}", MANIFEST_FILE_NAME, pack_path);
            AppError::MalformedArchive(format!("{} not found", MANIFEST_FILE_NAME))
        })?;

    let manifest_bytes = read_entry(&mut zip, manifest_index, MANIFEST_FILE_NAME).await?;
    let index: ModrinthIndex = serde_json::from_slice(&manifest_bytes).map_err(|e| {
        error!("Failed to parse {}: {}", MANIFEST_FILE_NAME, e);
        AppError::MalformedArchive(format!("invalid {}: {}", MANIFEST_FILE_NAME, e))
    })?;
    let manifest = ModpackManifest::from_index(index)?;
    info!(
        "Parsed manifest for pack '{}' ({}) with {} files",
        manifest.name,
        manifest.version_id,
        manifest.files.len()
    );

    // --- Collect overrides ---
    // overrides/ ranks before client-overrides/ so client files win on equal paths.
    let mut ranked = Vec::new();
    for entry in entries.iter().filter(|e| !e.is_dir) {
        let Some((rank, rest)) = override_rank(&entry.name) else {
            continue;
        };
        let Some(relative) = safe_relative_path(rest) else {
            warn!("Skipping unsafe override entry: {}", entry.name);
            continue;
        };
        let content = read_entry(&mut zip, entry.index, &entry.name).await?;
        ranked.push((
            rank,
            OverrideEntry {
                path: relative,
                content,
            },
        ));
    }
    // Stable sort keeps archive order within each prefix.
    ranked.sort_by_key(|(rank, _)| *rank);
    let overrides: Vec<OverrideEntry> = ranked.into_iter().map(|(_, entry)| entry).collect();
    info!("Found {} override files", overrides.len());

    Ok(ModpackArchive {
        manifest,
        overrides,
    })
}

async fn read_entry(
    zip: &mut ZipFileReader<&mut BufReader<File>>,
    index: usize,
    name: &str,
) -> Result<Vec<u8>> {
    let mut entry_reader = zip.reader_with_entry(index).await.map_err(|e| {
        error!("Failed to get entry reader for {}: {}", name, e);
        AppError::MalformedArchive(format!("cannot read entry {}: {}", name, e))
    })?;

    let mut buffer = Vec::new();
    entry_reader
        .read_to_end_checked(&mut buffer)
        .await
        .map_err(|e| {
            error!("Failed to read {} from archive: {}", name, e);
            AppError::MalformedArchive(format!("corrupt entry {}: {}", name, e))
        })?;

    Ok(buffer)
}
