//! CurseForge lookup by whitespace-insensitive fingerprint (`POST /fingerprints`)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{normalize_base_url, PackboxConfig};
use crate::core::{FileOperation, PackboxError, Result};
use crate::hash::FingerprintCodec;
use crate::manifest::{ModEntry, Source};
use crate::sources::{LocalFile, RegistryClient, ResolutionOutcome};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Serialize)]
struct FingerprintRequest {
    fingerprints: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FingerprintResponse {
    pub data: FingerprintMatches,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintMatches {
    #[serde(default)]
    pub exact_matches: Vec<FingerprintMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FingerprintMatch {
    pub file: MatchedFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedFile {
    /// Null when the author disallows third-party distribution
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Fingerprint-keyed registry client; needs an API key
pub struct CurseForgeClient {
    client: Client,
    base_url: String,
    api_key: String,
    codec: FingerprintCodec,
}

impl CurseForgeClient {
    pub fn new(config: &PackboxConfig) -> Result<Self> {
        let api_key = config
            .curseforge_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PackboxError::ConfigMissing {
                what: "CurseForge API key".to_string(),
                suggestion: "write the key to a .curseforge file in the pack root or set CURSEFORGE_API_KEY"
                    .to_string(),
            })?;

        Ok(Self {
            client: config.http_client()?,
            base_url: normalize_base_url(&config.curseforge_url)?,
            api_key,
            codec: FingerprintCodec::new(),
        })
    }

    /// Look up a precomputed fingerprint
    pub async fn lookup_fingerprint(&self, relative: &str, fingerprint: u32) -> ResolutionOutcome {
        let url = format!("{}/fingerprints", self.base_url);
        debug!("CurseForge lookup for {}: fingerprint {}", relative, fingerprint);

        let request = FingerprintRequest {
            fingerprints: vec![u64::from(fingerprint)],
        };
        let response = match self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ResolutionOutcome::TransportFailure(PackboxError::http(url, e)),
        };

        if response.status() != StatusCode::OK {
            debug!("CurseForge returned {} for {}", response.status(), relative);
            return ResolutionOutcome::NotFound;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ResolutionOutcome::TransportFailure(PackboxError::http(url, e)),
        };
        if body.trim().is_empty() {
            return ResolutionOutcome::NotFound;
        }

        let parsed: FingerprintResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return ResolutionOutcome::TransportFailure(PackboxError::json("CurseForge fingerprint response", e));
            }
        };

        let Some(first) = parsed.data.exact_matches.into_iter().next() else {
            return ResolutionOutcome::NotFound;
        };
        match first.file.download_url {
            Some(download_url) if !download_url.is_empty() => {
                ResolutionOutcome::Matched(ModEntry::new(relative, download_url, Source::CurseForge))
            }
            _ => {
                warn!("CurseForge matched {} but offers no download URL", relative);
                ResolutionOutcome::NotFound
            }
        }
    }
}

#[async_trait]
impl RegistryClient for CurseForgeClient {
    fn source(&self) -> Source {
        Source::CurseForge
    }

    async fn lookup(&self, file: &LocalFile) -> ResolutionOutcome {
        let bytes = match tokio::fs::read(&file.absolute).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = PackboxError::fs(&file.absolute, FileOperation::Read, e);
                warn!("Failed to fingerprint {}: {}", file.relative, err);
                return ResolutionOutcome::NotFound;
            }
        };
        let fingerprint = self.codec.fingerprint(&bytes);
        self.lookup_fingerprint(&file.relative, fingerprint).await
    }
}
