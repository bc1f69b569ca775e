//! Minecraft and loader version listings from each loader's metadata service

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::{normalize_base_url, PackboxConfig};
use crate::core::{PackboxError, Result};
use crate::manifest::Loader;

pub const FABRIC_META_URL: &str = "https://meta.fabricmc.net/v2";
pub const QUILT_META_URL: &str = "https://meta.quiltmc.org/v3";
pub const FORGE_METADATA_URL: &str =
    "https://files.minecraftforge.net/net/minecraftforge/forge/maven-metadata.json";
pub const NEOFORGE_VERSIONS_URL: &str =
    "https://maven.neoforged.net/api/maven/versions/releases/net/neoforged/neoforge";

/// Where each loader publishes its version metadata
#[derive(Debug, Clone)]
pub struct LoaderEndpoints {
    pub fabric: String,
    pub quilt: String,
    pub forge: String,
    pub neoforge: String,
}

impl Default for LoaderEndpoints {
    fn default() -> Self {
        Self {
            fabric: FABRIC_META_URL.to_string(),
            quilt: QUILT_META_URL.to_string(),
            forge: FORGE_METADATA_URL.to_string(),
            neoforge: NEOFORGE_VERSIONS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MetaVersion {
    version: String,
}

#[derive(Debug, Clone, Deserialize)]
struct NeoForgeVersions {
    #[serde(default)]
    versions: Vec<String>,
}

pub struct LoaderMeta {
    client: Client,
    endpoints: LoaderEndpoints,
}

impl LoaderMeta {
    pub fn new(config: &PackboxConfig) -> Result<Self> {
        Self::with_endpoints(config, LoaderEndpoints::default())
    }

    pub fn with_endpoints(config: &PackboxConfig, endpoints: LoaderEndpoints) -> Result<Self> {
        let endpoints = LoaderEndpoints {
            fabric: normalize_base_url(&endpoints.fabric)?,
            quilt: normalize_base_url(&endpoints.quilt)?,
            forge: normalize_base_url(&endpoints.forge)?,
            neoforge: normalize_base_url(&endpoints.neoforge)?,
        };
        Ok(Self {
            client: config.http_client()?,
            endpoints,
        })
    }

    /// Minecraft versions the loader supports, in the order the service lists them
    pub async fn minecraft_versions(&self, loader: Loader) -> Result<Vec<String>> {
        match loader {
            Loader::Fabric => self.meta_versions(&self.endpoints.fabric, "game").await,
            Loader::Quilt => self.meta_versions(&self.endpoints.quilt, "game").await,
            Loader::Forge => {
                let map = self.forge_map().await?;
                Ok(map.into_iter().rev().map(|(minecraft, _)| minecraft).collect())
            }
            Loader::NeoForge => {
                let versions = self.neoforge_versions().await?;
                Ok(neoforge_minecraft_versions(&versions))
            }
        }
    }

    /// Loader versions usable with `minecraft_version`
    ///
    /// Fabric and Quilt publish one loader list for every game version.
    pub async fn loader_versions(&self, loader: Loader, minecraft_version: &str) -> Result<Vec<String>> {
        match loader {
            Loader::Fabric => self.meta_versions(&self.endpoints.fabric, "loader").await,
            Loader::Quilt => self.meta_versions(&self.endpoints.quilt, "loader").await,
            Loader::Forge => {
                let map = self.forge_map().await?;
                let versions = map
                    .into_iter()
                    .find(|(minecraft, _)| minecraft == minecraft_version)
                    .map(|(_, versions)| versions)
                    .ok_or_else(|| PackboxError::InvalidValue {
                        kind: "minecraft version",
                        value: minecraft_version.to_string(),
                    })?;
                Ok(versions.into_iter().rev().collect())
            }
            Loader::NeoForge => {
                let versions = self.neoforge_versions().await?;
                Ok(neoforge_loader_versions(&versions, minecraft_version))
            }
        }
    }

    async fn meta_versions(&self, base: &str, kind: &str) -> Result<Vec<String>> {
        let url = format!("{}/versions/{}", base, kind);
        let versions: Vec<MetaVersion> = self.get_json(&url).await?;
        Ok(versions.into_iter().map(|v| v.version).collect())
    }

    /// Minecraft version -> loader versions, oldest first, in document order
    async fn forge_map(&self) -> Result<Vec<(String, Vec<String>)>> {
        let raw: serde_json::Map<String, serde_json::Value> = self.get_json(&self.endpoints.forge).await?;
        raw.into_iter()
            .map(|(minecraft, versions)| {
                let versions: Vec<String> = serde_json::from_value(versions)
                    .map_err(|e| PackboxError::json(format!("Forge versions for {}", minecraft), e))?;
                Ok((minecraft, versions))
            })
            .collect()
    }

    async fn neoforge_versions(&self) -> Result<Vec<String>> {
        let response: NeoForgeVersions = self.get_json(&self.endpoints.neoforge).await?;
        Ok(response.versions)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Fetching loader metadata: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PackboxError::http(url, e))?;
        if !response.status().is_success() {
            return Err(PackboxError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let body = response.text().await.map_err(|e| PackboxError::http(url, e))?;
        serde_json::from_str(&body).map_err(|e| PackboxError::json(url, e))
    }
}

/// NeoForge `20.4.x` targets Minecraft `1.20.4`
fn neoforge_minecraft_versions(versions: &[String]) -> Vec<String> {
    let mut minecraft: Vec<String> = Vec::new();
    for version in versions.iter().filter(|v| v.starts_with('2')) {
        let Some(prefix) = version.get(0..4) else {
            continue;
        };
        let candidate = format!("1.{}", prefix);
        if !minecraft.contains(&candidate) {
            minecraft.push(candidate);
        }
    }
    minecraft
}

fn neoforge_loader_versions(versions: &[String], minecraft_version: &str) -> Vec<String> {
    let prefix = minecraft_version
        .get(2..6)
        .or_else(|| minecraft_version.get(2..))
        .unwrap_or_default();
    versions
        .iter()
        .filter(|v| v.starts_with(prefix))
        .cloned()
        .collect()
}
