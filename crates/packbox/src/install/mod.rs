//! Manifest installation
//!
//! Each entry is reconciled against disk independently: a file whose digest
//! still matches is skipped without touching the network, anything else is
//! downloaded. A failing entry is logged and recorded, never fatal to the batch.

pub mod http;

pub use http::{HttpFetcher, ProgressPacer};

use std::path::{Component, Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::PackboxConfig;
use crate::core::progress::emit;
use crate::core::{PackboxError, ProgressCallback, ProgressEvent, Result};
use crate::hash::ContentHasher;
use crate::manifest::{Manifest, ModEntry};

/// What happened to one manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Local copy already matched the recorded digest
    Skipped,
    Done { bytes: u64 },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub path: String,
    pub outcome: EntryOutcome,
}

/// Per-entry results in manifest order
///
/// The `N/M` tally printed after installation is `processed()/total`. Failed
/// entries are not counted in `processed()`, so a partial install reports
/// fewer than `total` and [`InstallReport::completion_percent`] stays below 100.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub total: usize,
    pub entries: Vec<EntryReport>,
}

impl InstallReport {
    /// Entries that ended up present on disk (skipped or downloaded); failures are excluded
    pub fn processed(&self) -> usize {
        self.skipped() + self.downloaded()
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, EntryOutcome::Skipped))
    }

    pub fn downloaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, EntryOutcome::Done { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, EntryOutcome::Error { .. }))
    }

    /// Share of entries processed; an empty manifest is complete
    pub fn completion_percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.processed() * 100 / self.total) as u8
    }

    fn count(&self, predicate: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.entries.iter().filter(|entry| predicate(&entry.outcome)).count()
    }
}

/// Downloads manifest entries into a pack root
pub struct Installer {
    root: PathBuf,
    fetcher: HttpFetcher,
    hasher: ContentHasher,
    max_concurrent: usize,
}

impl Installer {
    pub fn new<P: Into<PathBuf>>(config: PackboxConfig, root: P) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            fetcher: HttpFetcher::new(&config)?,
            hasher: ContentHasher::new(config.digest_chunk_size),
            max_concurrent: config.max_concurrent.max(1),
        })
    }

    /// Reconcile every entry of the manifest, in manifest order
    pub async fn install(&self, manifest: &Manifest, progress: Option<ProgressCallback>) -> InstallReport {
        let total = manifest.mods.len();
        info!("Installing {} files from manifest '{}'", total, manifest.name);

        let progress = &progress;
        let entries = stream::iter(manifest.mods.iter().enumerate())
            .map(|(index, entry)| self.install_entry(entry, index, total, progress))
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;

        let report = InstallReport { total, entries };
        info!(
            "Installation complete: {}/{} mods installed ({} skipped, {} downloaded, {} failed)",
            report.processed(),
            report.total,
            report.skipped(),
            report.downloaded(),
            report.failed()
        );
        report
    }

    async fn install_entry(
        &self,
        entry: &ModEntry,
        index: usize,
        total: usize,
        progress: &Option<ProgressCallback>,
    ) -> EntryReport {
        let span = info_span!("install", path = %entry.path);
        async move {
            emit(progress, ProgressEvent::EntryStarted {
                path: entry.path.clone(),
                index,
                total,
            });

            let outcome = match self.reconcile(entry, progress).await {
                Ok(Some(bytes)) => {
                    info!("Successfully downloaded {}", entry.path);
                    emit(progress, ProgressEvent::EntryDone {
                        path: entry.path.clone(),
                        size: bytes,
                    });
                    EntryOutcome::Done { bytes }
                }
                Ok(None) => {
                    debug!("{} is up to date", entry.path);
                    emit(progress, ProgressEvent::EntrySkipped {
                        path: entry.path.clone(),
                    });
                    EntryOutcome::Skipped
                }
                Err(err) => {
                    error!("Error downloading {} from {}: {} ({})", entry.path, entry.url, err, err.category());
                    emit(progress, ProgressEvent::EntryFailed {
                        path: entry.path.clone(),
                        url: entry.url.clone(),
                        error: err.to_string(),
                    });
                    EntryOutcome::Error {
                        message: err.to_string(),
                    }
                }
            };

            EntryReport {
                path: entry.path.clone(),
                outcome,
            }
        }
        .instrument(span)
        .await
    }

    /// `Ok(None)` when the local copy is kept, `Ok(Some(bytes))` after a download
    async fn reconcile(&self, entry: &ModEntry, progress: &Option<ProgressCallback>) -> Result<Option<u64>> {
        let target = target_path(&self.root, &entry.path)?;

        // Without a recorded digest there is nothing to compare against
        if let Some(expected) = entry.sha1.as_deref() {
            if target.is_file() {
                match self.hasher.matches(&target, expected).await {
                    Ok(true) => return Ok(None),
                    Ok(false) => debug!("Digest mismatch for {}, re-downloading", entry.path),
                    Err(err) => debug!("Cannot verify {} ({}), re-downloading", entry.path, err),
                }
            }
        }

        self.fetcher
            .fetch_to(&entry.url, &target, &entry.path, progress)
            .await
            .map(Some)
    }
}

/// Join a manifest path onto the pack root, refusing anything that escapes it
pub fn target_path(root: &Path, relative: &str) -> Result<PathBuf> {
    let relative_path = Path::new(relative);
    let escapes = relative.is_empty()
        || relative_path
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(PackboxError::InvalidValue {
            kind: "path",
            value: relative.to_string(),
        });
    }
    Ok(root.join(relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<EntryOutcome>) -> InstallReport {
        InstallReport {
            total: outcomes.len(),
            entries: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| EntryReport {
                    path: format!("mods/{}.jar", i),
                    outcome,
                })
                .collect(),
        }
    }

    #[test]
    fn test_report_counts() {
        let report = report(vec![
            EntryOutcome::Skipped,
            EntryOutcome::Done { bytes: 10 },
            EntryOutcome::Error { message: "boom".to_string() },
            EntryOutcome::Done { bytes: 5 },
        ]);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.downloaded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.processed(), 3);
        assert_eq!(report.completion_percent(), 75);
    }

    #[test]
    fn test_empty_report_is_complete() {
        assert_eq!(InstallReport::default().completion_percent(), 100);
    }

    #[test]
    fn test_target_path_rejects_escapes() {
        let root = Path::new("/pack");
        assert_eq!(target_path(root, "mods/a.jar").unwrap(), root.join("mods/a.jar"));
        assert!(target_path(root, "../a.jar").is_err());
        assert!(target_path(root, "/etc/passwd").is_err());
        assert!(target_path(root, "").is_err());
    }
}
