//! Registry adapters and the registry that routes lookups to them
//!
//! Each adapter knows which content key its registry is indexed by and turns
//! one local file into one [`ResolutionOutcome`]. The resolver chain only ever
//! talks to the [`RegistryClient`] trait.

pub mod curseforge;
pub mod modrinth;

pub use curseforge::CurseForgeClient;
pub use modrinth::ModrinthClient;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::PackboxConfig;
use crate::core::{PackboxError, Result};
use crate::manifest::{ModEntry, Source};

/// A file on disk awaiting resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Location used for reading the bytes
    pub absolute: PathBuf,
    /// Manifest key: path relative to the pack root, `/`-separated
    pub relative: String,
}

impl LocalFile {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(absolute: P, relative: S) -> Self {
        Self {
            absolute: absolute.into(),
            relative: relative.into(),
        }
    }
}

/// Result of asking a single registry about a single file
#[derive(Debug)]
pub enum ResolutionOutcome {
    Matched(ModEntry),
    /// Empty body, non-200 status, zero matches, or no usable content key
    NotFound,
    /// The request or the payload decoding failed
    TransportFailure(PackboxError),
}

impl ResolutionOutcome {
    pub fn into_entry(self) -> Option<ModEntry> {
        match self {
            ResolutionOutcome::Matched(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Trait implemented by every registry adapter
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// The source tag written into entries this client matches
    fn source(&self) -> Source;

    /// Compute this registry's content key for the file and look it up
    ///
    /// Exactly one network round trip is issued when a key can be computed.
    async fn lookup(&self, file: &LocalFile) -> ResolutionOutcome;
}

/// Registry of available source adapters, keyed by their source tag
pub struct SourceRegistry {
    clients: Vec<Box<dyn RegistryClient>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Register a client; a later registration for the same source wins
    pub fn register<C: RegistryClient + 'static>(mut self, client: C) -> Self {
        let source = client.source();
        self.clients.retain(|existing| existing.source() != source);
        self.clients.push(Box::new(client));
        self
    }

    /// Build clients for exactly the sources a manifest's chain needs
    ///
    /// Only sources actually in use are constructed, so a CurseForge API key
    /// is required only when CurseForge is configured.
    pub fn for_sources(config: &PackboxConfig, sources: &[Source]) -> Result<Self> {
        let mut registry = Self::new();
        for source in sources {
            registry = match source {
                Source::Modrinth => registry.register(ModrinthClient::new(config)?),
                Source::CurseForge => registry.register(CurseForgeClient::new(config)?),
                Source::None => registry,
            };
        }
        Ok(registry)
    }

    pub fn find(&self, source: Source) -> Option<&dyn RegistryClient> {
        self.clients
            .iter()
            .find(|client| client.source() == source)
            .map(|client| &**client)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
