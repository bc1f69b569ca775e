//! Folder scanning: resolve every file in the selected pack folders and
//! record the matches in the manifest

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tokio::fs;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::PackboxConfig;
use crate::core::{FileOperation, PackboxError, ProgressCallback, Result};
use crate::manifest::{Manifest, ModEntry, MANIFEST_FILE_NAME};
use crate::resolver::SourceResolver;
use crate::sources::{LocalFile, ResolutionOutcome};

/// Pack folders detection may scan
pub const SUPPORTED_FOLDERS: &[&str] = &["mods", "resourcepacks", "shaderpacks"];

/// Result of a detection pass
#[derive(Debug, Clone)]
pub struct DetectReport {
    /// The manifest as last persisted
    pub manifest: Manifest,
    pub matched: usize,
    /// Relative paths no configured source recognized
    pub unresolved: Vec<String>,
}

/// Trim folder names, drop blanks, and reject anything outside [`SUPPORTED_FOLDERS`]
pub fn normalize_folders<S: AsRef<str>>(folders: &[S]) -> Result<Vec<String>> {
    let mut normalized = Vec::with_capacity(folders.len());
    for folder in folders {
        let folder = folder.as_ref().trim();
        if folder.is_empty() {
            continue;
        }
        if !SUPPORTED_FOLDERS.contains(&folder) {
            return Err(PackboxError::UnsupportedFolder {
                folder: folder.to_string(),
            });
        }
        normalized.push(folder.to_string());
    }
    Ok(normalized)
}

pub struct Detector {
    config: PackboxConfig,
    root: PathBuf,
}

impl Detector {
    pub fn new<P: Into<PathBuf>>(config: PackboxConfig, root: P) -> Self {
        Self {
            config,
            root: root.into(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// Resolve every regular file directly inside each folder
    ///
    /// Matches accumulate across folders; after each folder the manifest is
    /// rebuilt with the accumulated list and saved, so prior entries are
    /// replaced rather than merged.
    pub async fn detect<S: AsRef<str>>(
        &self,
        manifest: &Manifest,
        folders: &[S],
        progress: Option<ProgressCallback>,
    ) -> Result<DetectReport> {
        let folders = normalize_folders(folders)?;

        let mut report = DetectReport {
            manifest: manifest.clone(),
            matched: 0,
            unresolved: Vec::new(),
        };
        if folders.is_empty() {
            warn!("No folders selected, nothing to detect");
            return Ok(report);
        }

        let mut resolver = SourceResolver::for_manifest(&self.config, manifest)?;
        if let Some(callback) = progress {
            resolver = resolver.with_progress(callback);
        }

        let mut mods: Vec<ModEntry> = Vec::new();
        for folder in &folders {
            let folder = folder.as_str();
            let dir = self.root.join(folder);
            if !dir.is_dir() {
                warn!("Folder {} does not exist, skipping", dir.display());
                continue;
            }

            let files = list_files(&dir, folder).await?;
            info!("Checking {} files in {}", files.len(), folder);

            let outcomes: Vec<(LocalFile, ResolutionOutcome)> = async {
                stream::iter(files)
                    .map(|file| {
                        let resolver = &resolver;
                        async move {
                            let outcome = resolver.resolve(&file).await;
                            (file, outcome)
                        }
                    })
                    .buffered(self.config.max_concurrent.max(1))
                    .collect()
                    .await
            }
            .instrument(info_span!("detect_folder", folder = %folder))
            .await;

            for (file, outcome) in outcomes {
                match outcome.into_entry() {
                    Some(entry) => mods.push(entry),
                    None => report.unresolved.push(file.relative),
                }
            }

            report.manifest = manifest.with_mods(mods.clone());
            report.manifest.save(self.manifest_path())?;
            debug!("Saved manifest after {} with {} entries", folder, mods.len());
        }

        report.matched = mods.len();
        Ok(report)
    }
}

/// Regular files directly inside `dir`, sorted by name
async fn list_files(dir: &Path, folder: &str) -> Result<Vec<LocalFile>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| PackboxError::fs(dir, FileOperation::ListDir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PackboxError::fs(dir, FileOperation::ListDir, e))?
    {
        // Follows symlinks, so a linked jar counts as a regular file
        let metadata = match fs::metadata(entry.path()).await {
            Ok(metadata) => metadata,
            Err(e) => {
                let err = PackboxError::fs(entry.path(), FileOperation::Metadata, e);
                warn!("Skipping {}: {}", entry.path().display(), err);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push(LocalFile::new(entry.path(), format!("{}/{}", folder, name)));
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}
