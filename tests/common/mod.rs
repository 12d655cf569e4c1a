#![allow(dead_code)]

use async_trait::async_trait;
use modpack_sync_lib::error::{AppError, Result};
use modpack_sync_lib::utils::http_utils::HttpTransport;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn setup_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone)]
enum FakeResponse {
    Body(Vec<u8>),
    Status(u16),
}

/// In-memory `HttpTransport`. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, FakeResponse>>,
    requests: Mutex<Vec<(String, Option<Duration>)>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), FakeResponse::Body(body.into()));
    }

    pub fn fail(&self, url: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), FakeResponse::Status(status));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.timeouts_for(url).len()
    }

    /// The timeout passed with each request to `url`, in request order.
    pub fn timeouts_for(&self, url: &str) -> Vec<Option<Duration>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, timeout)| *timeout)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), timeout));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(FakeResponse::Body(body)) => Ok(body),
            Some(FakeResponse::Status(status)) => Err(AppError::Remote {
                url: url.to_string(),
                status,
            }),
            None => Err(AppError::Remote {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn mod_url(name: &str) -> String {
    format!("https://cdn.modrinth.com/data/test/{}", name)
}

/// modrinth.index.json content for `(path, size)` files, each downloadable from `mod_url`.
pub fn index_json(files: &[(&str, u64)]) -> String {
    let files: Vec<_> = files
        .iter()
        .map(|(path, size)| {
            let name = path.rsplit('/').next().unwrap_or(path);
            json!({
                "path": path,
                "hashes": {"sha1": "0000000000000000000000000000000000000000"},
                "env": {"client": "required", "server": "required"},
                "downloads": [mod_url(name)],
                "fileSize": size,
            })
        })
        .collect();

    json!({
        "formatVersion": 1,
        "game": "minecraft",
        "versionId": "1.0.0",
        "name": "Test Pack",
        "files": files,
        "dependencies": {"minecraft": "1.20.1", "fabric-loader": "0.15.0"},
    })
    .to_string()
}

/// Builds a zip in memory. Names ending in `/` become directory entries.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// A .mrpack with the given index and override entries (full archive names).
pub fn build_mrpack(index: &str, extra: &[(&str, &[u8])]) -> Vec<u8> {
    let mut entries: Vec<(&str, &[u8])> = vec![("modrinth.index.json", index.as_bytes())];
    entries.extend_from_slice(extra);
    build_zip(&entries)
}

pub fn write_mod(dir: &Path, name: &str, size: usize) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), vec![7u8; size]).unwrap();
}

pub fn versions_json(filename: &str, url: &str) -> String {
    json!([
        {
            "id": "abc123",
            "name": "Test Pack",
            "version_number": filename.trim_end_matches(".mrpack"),
            "files": [{"url": url, "filename": filename, "primary": true, "size": 1}],
        }
    ])
    .to_string()
}
