//! Modrinth lookup by SHA-1 digest (`GET /version_file/{sha1}`)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{normalize_base_url, PackboxConfig};
use crate::core::{PackboxError, Result};
use crate::hash::ContentHasher;
use crate::manifest::{ModEntry, Source};
use crate::sources::{LocalFile, RegistryClient, ResolutionOutcome};

/// Version payload; only the file URLs are of interest
#[derive(Debug, Clone, Deserialize)]
pub struct VersionFileResponse {
    #[serde(default)]
    pub files: Vec<VersionFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionFile {
    pub url: String,
}

/// Digest-keyed registry client
pub struct ModrinthClient {
    client: Client,
    base_url: String,
    hasher: ContentHasher,
}

impl ModrinthClient {
    pub fn new(config: &PackboxConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            base_url: normalize_base_url(&config.modrinth_url)?,
            hasher: ContentHasher::new(config.digest_chunk_size),
        })
    }

    /// Look up a known digest; `sha1` is echoed into the matched entry
    pub async fn lookup_sha1(&self, relative: &str, sha1: &str) -> ResolutionOutcome {
        let url = format!("{}/version_file/{}", self.base_url, sha1);
        debug!("Modrinth lookup: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return ResolutionOutcome::TransportFailure(PackboxError::http(url, e)),
        };

        if response.status() != StatusCode::OK {
            debug!("Modrinth returned {} for {}", response.status(), relative);
            return ResolutionOutcome::NotFound;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ResolutionOutcome::TransportFailure(PackboxError::http(url, e)),
        };
        if body.trim().is_empty() {
            return ResolutionOutcome::NotFound;
        }

        let parsed: VersionFileResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return ResolutionOutcome::TransportFailure(PackboxError::json("Modrinth version_file response", e));
            }
        };

        match parsed.files.into_iter().next() {
            Some(file) => ResolutionOutcome::Matched(
                ModEntry::new(relative, file.url, Source::Modrinth).with_sha1(sha1),
            ),
            None => ResolutionOutcome::NotFound,
        }
    }
}

#[async_trait]
impl RegistryClient for ModrinthClient {
    fn source(&self) -> Source {
        Source::Modrinth
    }

    async fn lookup(&self, file: &LocalFile) -> ResolutionOutcome {
        let sha1 = match self.hasher.digest_file(&file.absolute).await {
            Ok(sha1) => sha1,
            Err(e) => {
                warn!("Failed to create SHA-1 hash for {}: {}", file.absolute.display(), e);
                return ResolutionOutcome::NotFound;
            }
        };
        self.lookup_sha1(&file.relative, &sha1).await
    }
}
