//! Progress tracking and reporting for detection and installation

use std::sync::Arc;

use crate::manifest::Source;

/// Progress callback shared by the resolver and the installer
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted while resolving local files or installing manifest entries
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    FileChecking {
        path: String,
    },
    FallbackAttempt {
        path: String,
        source: Source,
    },
    FileMatched {
        path: String,
        source: Source,
    },
    FileUnresolved {
        path: String,
    },
    EntryStarted {
        path: String,
        index: usize,
        total: usize,
    },
    EntrySkipped {
        path: String,
    },
    DownloadStarted {
        path: String,
        url: String,
        total_size: Option<u64>,
    },
    /// Paced to roughly one event per `1 / progress_steps` of the expected size
    DownloadProgress {
        path: String,
        downloaded: u64,
        total: u64,
        percent: u8,
    },
    EntryDone {
        path: String,
        size: u64,
    },
    EntryFailed {
        path: String,
        url: String,
        error: String,
    },
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_file_checking(&self, _path: &str) {}
    fn on_fallback_attempt(&self, _path: &str, _source: Source) {}
    fn on_file_matched(&self, _path: &str, _source: Source) {}
    fn on_file_unresolved(&self, _path: &str) {}
    fn on_entry_started(&self, _path: &str, _index: usize, _total: usize) {}
    fn on_entry_skipped(&self, _path: &str) {}
    fn on_download_started(&self, _path: &str, _url: &str, _total_size: Option<u64>) {}
    fn on_download_progress(&self, _path: &str, _downloaded: u64, _total: u64, _percent: u8) {}
    fn on_entry_done(&self, _path: &str, _size: u64) {}
    fn on_entry_failed(&self, _path: &str, _url: &str, _error: &str) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            ProgressEvent::FileChecking { path } => self.on_file_checking(&path),
            ProgressEvent::FallbackAttempt { path, source } => {
                self.on_fallback_attempt(&path, source);
            }
            ProgressEvent::FileMatched { path, source } => self.on_file_matched(&path, source),
            ProgressEvent::FileUnresolved { path } => self.on_file_unresolved(&path),
            ProgressEvent::EntryStarted { path, index, total } => {
                self.on_entry_started(&path, index, total);
            }
            ProgressEvent::EntrySkipped { path } => self.on_entry_skipped(&path),
            ProgressEvent::DownloadStarted { path, url, total_size } => {
                self.on_download_started(&path, &url, total_size);
            }
            ProgressEvent::DownloadProgress { path, downloaded, total, percent } => {
                self.on_download_progress(&path, downloaded, total, percent);
            }
            ProgressEvent::EntryDone { path, size } => self.on_entry_done(&path, size),
            ProgressEvent::EntryFailed { path, url, error } => {
                self.on_entry_failed(&path, &url, &error);
            }
        })
    }
}

/// Emit an event if a callback is present
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for Recorder {
        fn on_entry_skipped(&self, path: &str) {
            self.seen.lock().unwrap().push(format!("skip:{}", path));
        }

        fn on_file_matched(&self, path: &str, source: Source) {
            self.seen.lock().unwrap().push(format!("match:{}:{}", path, source));
        }
    }

    #[test]
    fn test_reporter_adapter_routes_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let callback = Recorder { seen: seen.clone() }.into_callback();

        callback(ProgressEvent::EntrySkipped { path: "mods/a.jar".to_string() });
        callback(ProgressEvent::FileMatched {
            path: "mods/b.jar".to_string(),
            source: Source::Modrinth,
        });
        // Unhandled events fall through to the no-op defaults
        callback(ProgressEvent::FileUnresolved { path: "mods/c.jar".to_string() });

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec!["skip:mods/a.jar", "match:mods/b.jar:MODRINTH"]);
    }
}
