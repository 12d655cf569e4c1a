use crate::config::APP_USER_AGENT;
use crate::error::{AppError, Result};
use crate::utils::file_utils;
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, error};
use reqwest::{Client, Response};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// The HTTP capability the sync pipeline consumes.
///
/// Implementations return the full response body on a success status and
/// `AppError::Remote` for any other status.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>>;

    /// Downloads `url` into `target`, returning the number of bytes written.
    /// The default buffers the whole body; transports that can stream should.
    async fn download_to_file(
        &self,
        url: &str,
        target: &Path,
        timeout: Option<Duration>,
    ) -> Result<u64> {
        let bytes = self.get_bytes(url, timeout).await?;
        file_utils::write_file(target, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

/// `HttpTransport` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(APP_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str, timeout: Option<Duration>) -> Result<Response> {
        debug!("GET {}", url);
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            error!(
                "Request failed: {} returned status {} ({})",
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(AppError::Remote {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let response = self.send(url, timeout).await?;
        let bytes = response.bytes().await?;
        debug!("Received {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    async fn download_to_file(
        &self,
        url: &str,
        target: &Path,
        timeout: Option<Duration>,
    ) -> Result<u64> {
        let response = self.send(url, timeout).await?;
        let content_length = response.content_length();

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::filesystem(parent, e))?;
        }
        let mut file = fs::File::create(target)
            .await
            .map_err(|e| AppError::filesystem(target, e))?;

        // --- Stream body to disk ---
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::filesystem(target, e))?;
            written += chunk.len() as u64;
        }

        file.sync_all()
            .await
            .map_err(|e| AppError::filesystem(target, e))?;
        drop(file);

        debug!(
            "Streamed {} bytes from {} (content length {:?})",
            written, url, content_length
        );
        Ok(written)
    }
}
