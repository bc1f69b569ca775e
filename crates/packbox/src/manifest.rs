//! Modpack manifest model and persistence
//!
//! The manifest is the declarative record of a pack: its metadata plus one
//! [`ModEntry`] per resolved file. It is persisted as `manifest.packbox.json`
//! in the pack root and always rewritten through a temporary file followed by
//! a rename, so an interrupted write never leaves a truncated manifest behind.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::core::{FileOperation, PackboxError, Result};

pub const MANIFEST_FILE_NAME: &str = "manifest.packbox.json";
pub const FORMAT_VERSION: &str = "1.0";

/// Remote registry a file was matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Digest-keyed registry (SHA-1 lookup)
    Modrinth,
    /// Fingerprint-keyed registry (bulk fingerprint match)
    CurseForge,
    /// Terminal value of a fallback chain; never produced by a match
    None,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Modrinth => "MODRINTH",
            Source::CurseForge => "CURSEFORGE",
            Source::None => "NONE",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Source::None)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = PackboxError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "MODRINTH" => Ok(Source::Modrinth),
            "CURSEFORGE" => Ok(Source::CurseForge),
            "NONE" => Ok(Source::None),
            _ => Err(PackboxError::InvalidValue {
                kind: "source",
                value: value.to_string(),
            }),
        }
    }
}

/// Mod loader the pack targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    Fabric,
    Forge,
    NeoForge,
    Quilt,
}

impl Loader {
    pub fn as_str(&self) -> &'static str {
        match self {
            Loader::Fabric => "FABRIC",
            Loader::Forge => "FORGE",
            Loader::NeoForge => "NEOFORGE",
            Loader::Quilt => "QUILT",
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Loader {
    type Err = PackboxError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "FABRIC" => Ok(Loader::Fabric),
            "FORGE" => Ok(Loader::Forge),
            "NEOFORGE" => Ok(Loader::NeoForge),
            "QUILT" => Ok(Loader::Quilt),
            _ => Err(PackboxError::InvalidValue {
                kind: "loader",
                value: value.to_string(),
            }),
        }
    }
}

// Both enums are written upper-case and read case-insensitively.
macro_rules! string_enum_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_enum_serde!(Source);
string_enum_serde!(Loader);

/// One resolved file of the pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModEntry {
    /// Path relative to the pack root, `/`-separated; unique within a manifest
    pub path: String,
    #[serde(default)]
    pub url: String,
    pub source: Source,
    /// Content digest, only recorded when the matching registry is digest-keyed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

impl ModEntry {
    pub fn new<P: Into<String>, U: Into<String>>(path: P, url: U, source: Source) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            source,
            sha1: None,
        }
    }

    pub fn with_sha1<S: Into<String>>(mut self, sha1: S) -> Self {
        self.sha1 = Some(sha1.into());
        self
    }
}

/// Pack metadata plus the ordered list of resolved files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default = "default_format_version")]
    pub format_version: String,
    pub name: String,
    pub author: String,
    pub version: String,
    pub loader: Loader,
    pub minecraft_version: String,
    pub loader_version: String,
    pub source: Source,
    #[serde(default = "default_fallback")]
    pub fallback_source: Source,
    #[serde(default)]
    pub mods: Vec<ModEntry>,
}

fn default_format_version() -> String {
    FORMAT_VERSION.to_string()
}

fn default_fallback() -> Source {
    Source::None
}

impl Manifest {
    #[allow(clippy::too_many_arguments)]
    pub fn new<S: Into<String>>(
        name: S,
        author: S,
        version: S,
        loader: Loader,
        minecraft_version: S,
        loader_version: S,
        source: Source,
        fallback_source: Source,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            name: name.into(),
            author: author.into(),
            version: version.into(),
            loader,
            minecraft_version: minecraft_version.into(),
            loader_version: loader_version.into(),
            source,
            fallback_source,
            mods: Vec::new(),
        }
    }

    /// Return a copy of this manifest whose mods list is replaced wholesale
    pub fn with_mods(&self, mods: Vec<ModEntry>) -> Self {
        Self {
            mods,
            ..self.clone()
        }
    }

    /// Sources in the order resolution should try them
    pub fn source_chain(&self) -> Vec<Source> {
        let mut chain = vec![self.source];
        if !self.fallback_source.is_none() {
            chain.push(self.fallback_source);
        }
        chain
    }

    /// Reject manifests that cannot drive a resolution pass
    pub fn validate(&self) -> Result<()> {
        if self.source.is_none() {
            return Err(PackboxError::Configuration {
                message: "primary source cannot be NONE".to_string(),
                field: Some("source".to_string()),
            });
        }
        if self.fallback_source == self.source {
            return Err(PackboxError::Configuration {
                message: format!("fallback source must differ from the primary source ({})", self.source),
                field: Some("fallbackSource".to_string()),
            });
        }
        Ok(())
    }

    /// Read a manifest; a missing file is a [`PackboxError::ConfigMissing`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PackboxError::ConfigMissing {
                    what: format!("Manifest file '{}'", path.display()),
                    suggestion: "run `packbox init` first".to_string(),
                });
            }
            Err(e) => return Err(PackboxError::fs(path, FileOperation::Read, e)),
        };

        let manifest: Manifest = serde_json::from_str(&contents)
            .map_err(|e| PackboxError::json(path.display().to_string(), e))?;
        debug!("Loaded manifest '{}' with {} mods", manifest.name, manifest.mods.len());
        Ok(manifest)
    }

    /// Persist via write-to-temporary-file-and-rename in the target directory
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PackboxError::json("manifest serialization", e))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| PackboxError::fs(dir, FileOperation::Create, e))?;
        temp.write_all(json.as_bytes())
            .and_then(|_| temp.write_all(b"\n"))
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| PackboxError::fs(temp.path(), FileOperation::Write, e))?;
        temp.persist(path)
            .map_err(|e| PackboxError::fs(path, FileOperation::Rename, e.error))?;

        debug!("Saved manifest with {} mods to {}", self.mods.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Manifest {
        Manifest::new(
            "Test Pack",
            "someone",
            "1.0.0",
            Loader::Fabric,
            "1.20.1",
            "0.15.7",
            Source::Modrinth,
            Source::CurseForge,
        )
    }

    #[test]
    fn test_source_parsing_is_case_insensitive() {
        assert_eq!("Modrinth".parse::<Source>().unwrap(), Source::Modrinth);
        assert_eq!("curseforge".parse::<Source>().unwrap(), Source::CurseForge);
        assert_eq!("NONE".parse::<Source>().unwrap(), Source::None);
        assert!("github".parse::<Source>().is_err());
        assert_eq!("neoforge".parse::<Loader>().unwrap(), Loader::NeoForge);
    }

    #[test]
    fn test_sha1_written_only_when_present() {
        let manifest = sample().with_mods(vec![
            ModEntry::new("mods/a.jar", "https://cdn.modrinth.com/a.jar", Source::Modrinth)
                .with_sha1("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"),
            ModEntry::new("mods/b.jar", "https://edge.forgecdn.net/b.jar", Source::CurseForge),
        ]);

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["formatVersion"], "1.0");
        assert_eq!(value["loader"], "FABRIC");
        assert_eq!(value["fallbackSource"], "CURSEFORGE");
        assert_eq!(value["mods"][0]["source"], "MODRINTH");
        assert_eq!(value["mods"][0]["sha1"], "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert!(value["mods"][1].get("sha1").is_none());
    }

    #[test]
    fn test_load_accepts_layout_without_optional_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        std::fs::write(
            &path,
            r#"{
                "formatVersion": "1.0",
                "name": "Pack",
                "author": "me",
                "version": "2",
                "loader": "quilt",
                "minecraftVersion": "1.20.4",
                "loaderVersion": "0.25.0",
                "source": "Curseforge",
                "fallbackSource": "NONE",
                "extra": {"ignored": true},
                "mods": [
                    {"path": "mods/x.jar", "url": "https://x", "source": "CURSEFORGE", "sha1": null}
                ]
            }"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.loader, Loader::Quilt);
        assert_eq!(manifest.source, Source::CurseForge);
        assert_eq!(manifest.mods.len(), 1);
        assert_eq!(manifest.mods[0].sha1, None);
    }

    #[test]
    fn test_load_missing_manifest_is_config_missing() {
        let dir = tempdir().unwrap();
        let result = Manifest::load(dir.path().join(MANIFEST_FILE_NAME));
        assert!(matches!(result, Err(PackboxError::ConfigMissing { .. })));
    }

    #[test]
    fn test_save_replaces_file_and_leaves_no_temporaries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "garbage from an older run").unwrap();

        let manifest = sample().with_mods(vec![ModEntry::new(
            "mods/b.jar",
            "https://edge.forgecdn.net/b.jar",
            Source::CurseForge,
        )]);
        manifest.save(&path).unwrap();

        assert_eq!(Manifest::load(&path).unwrap(), manifest);
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_with_mods_replaces_instead_of_merging() {
        let first = sample().with_mods(vec![ModEntry::new("mods/a.jar", "u", Source::Modrinth)]);
        let second = first.with_mods(vec![ModEntry::new("mods/b.jar", "v", Source::Modrinth)]);
        assert_eq!(second.mods.len(), 1);
        assert_eq!(second.mods[0].path, "mods/b.jar");
        assert_eq!(first.mods[0].path, "mods/a.jar");
    }

    #[test]
    fn test_source_chain_and_validation() {
        let manifest = sample();
        assert_eq!(manifest.source_chain(), vec![Source::Modrinth, Source::CurseForge]);

        let mut no_fallback = sample();
        no_fallback.fallback_source = Source::None;
        assert_eq!(no_fallback.source_chain(), vec![Source::Modrinth]);

        let mut invalid = sample();
        invalid.source = Source::None;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_fallback_equal_to_primary() {
        let mut manifest = sample();
        manifest.fallback_source = manifest.source;
        match manifest.validate() {
            Err(PackboxError::Configuration { field, .. }) => {
                assert_eq!(field.as_deref(), Some("fallbackSource"))
            }
            other => panic!("Expected configuration error, got {:?}", other),
        }

        assert!(sample().validate().is_ok());
    }
}
