//! Streaming HTTP download with paced progress events

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::PackboxConfig;
use crate::core::progress::emit;
use crate::core::{FileOperation, PackboxError, ProgressCallback, ProgressEvent, Result};

/// Decides when a progress callback is due
///
/// A callback fires whenever the bytes read since the previous one exceed
/// `total / steps`, which bounds a file to roughly `steps` callbacks.
#[derive(Debug, Clone, Copy)]
pub struct ProgressPacer {
    total: u64,
    step: u64,
    downloaded: u64,
    last_reported: u64,
}

impl ProgressPacer {
    pub fn new(total: u64, steps: u64) -> Self {
        Self {
            total,
            step: total / steps.max(1),
            downloaded: 0,
            last_reported: 0,
        }
    }

    /// Record `bytes` more; returns the cumulative count when a callback is due
    pub fn advance(&mut self, bytes: u64) -> Option<u64> {
        self.downloaded += bytes;
        if self.downloaded - self.last_reported > self.step {
            self.last_reported = self.downloaded;
            Some(self.downloaded)
        } else {
            None
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Percentage of the expected size, capped at 100
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.downloaded.saturating_mul(100) / self.total).min(100) as u8
    }
}

/// Streams response bodies straight to disk
pub struct HttpFetcher {
    client: Client,
    progress_steps: u64,
    default_total_size: u64,
}

impl HttpFetcher {
    pub fn new(config: &PackboxConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            progress_steps: config.progress_steps,
            default_total_size: config.default_total_size,
        })
    }

    /// Download `url` to `dest`, creating parent directories as needed
    ///
    /// Each chunk is written as it arrives. Bytes already written are left in
    /// place when the transfer fails.
    pub async fn fetch_to(
        &self,
        url: &str,
        dest: &Path,
        label: &str,
        progress: &Option<ProgressCallback>,
    ) -> Result<u64> {
        let parsed = url::Url::parse(url).map_err(|source| PackboxError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| PackboxError::http(url, e))?;
        if !response.status().is_success() {
            return Err(PackboxError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_length = response.content_length().filter(|len| *len > 0);
        // Unknown length only affects pacing
        let total = content_length.unwrap_or(self.default_total_size);
        debug!("Downloading {} ({:?} bytes) to {}", url, content_length, dest.display());

        emit(progress, ProgressEvent::DownloadStarted {
            path: label.to_string(),
            url: url.to_string(),
            total_size: content_length,
        });

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PackboxError::fs(parent, FileOperation::CreateDir, e))?;
        }
        let mut file = fs::File::create(dest)
            .await
            .map_err(|e| PackboxError::fs(dest, FileOperation::Create, e))?;

        let mut pacer = ProgressPacer::new(total, self.progress_steps);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PackboxError::http(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PackboxError::fs(dest, FileOperation::Write, e))?;

            if let Some(downloaded) = pacer.advance(chunk.len() as u64) {
                emit(progress, ProgressEvent::DownloadProgress {
                    path: label.to_string(),
                    downloaded,
                    total: pacer.total(),
                    percent: pacer.percent(),
                });
            }
        }

        file.flush()
            .await
            .map_err(|e| PackboxError::fs(dest, FileOperation::Write, e))?;

        debug!("Download completed: {} bytes", pacer.downloaded());
        Ok(pacer.downloaded())
    }
}
