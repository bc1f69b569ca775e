//! Packbox Library
//!
//! This library records where each file of a Minecraft modpack can be
//! downloaded from and later reinstalls the pack from that record. Local files
//! are identified by content (a SHA-1 digest for Modrinth, a
//! whitespace-insensitive fingerprint for CurseForge), matched through a
//! primary/fallback source chain, and written into a manifest. Installation
//! skips files whose digest still matches and streams everything else.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use packbox::{Detector, Installer, Manifest, PackboxConfig, ProgressEvent, MANIFEST_FILE_NAME};
//! use std::sync::Arc;
//!
//! # async fn example() -> packbox::Result<()> {
//! let config = PackboxConfig::from_env()?;
//! let manifest = Manifest::load(MANIFEST_FILE_NAME)?;
//!
//! // Resolve everything in ./mods and persist the matches
//! let report = Detector::new(config.clone(), ".")
//!     .detect(&manifest, &["mods"], None)
//!     .await?;
//! println!("{} matched, {} unresolved", report.matched, report.unresolved.len());
//!
//! // Reinstall from the manifest
//! let progress = Arc::new(|event: ProgressEvent| {
//!     if let ProgressEvent::DownloadProgress { path, percent, .. } = event {
//!         println!("{}: {}%", path, percent);
//!     }
//! });
//! let installer = Installer::new(config, ".")?;
//! let result = installer.install(&report.manifest, Some(progress)).await;
//! println!("{}/{} mods installed", result.processed(), result.total);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Content keys**: streamed SHA-1 digests and the CurseForge fingerprint
//! - **Source fallback**: primary registry first, optional fallback second
//! - **Fail-soft batches**: one bad file never aborts detection or installation
//! - **Paced progress**: about 50 progress events per download, whatever its size
//! - **Atomic manifests**: written to a temporary file and renamed into place

pub mod config;
pub mod core;
pub mod detect;
pub mod hash;
pub mod install;
pub mod loaders;
pub mod manifest;
pub mod resolver;
pub mod sources;

// Re-export commonly used types for convenience
pub use config::PackboxConfig;
pub use crate::core::{
    FileOperation, IntoProgressCallback, PackboxError, ProgressCallback, ProgressEvent,
    ProgressReporter, Result,
};
pub use detect::{DetectReport, Detector, SUPPORTED_FOLDERS};
pub use hash::{fingerprint, ContentHasher, FingerprintCodec};
pub use install::{EntryOutcome, EntryReport, InstallReport, Installer};
pub use loaders::LoaderMeta;
pub use manifest::{Loader, Manifest, ModEntry, Source, MANIFEST_FILE_NAME};
pub use resolver::SourceResolver;
pub use sources::{LocalFile, RegistryClient, ResolutionOutcome, SourceRegistry};
