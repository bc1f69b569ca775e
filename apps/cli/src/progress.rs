//! Terminal rendering of library progress events

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use packbox::{ProgressReporter, Source};

const NAME_WIDTH: usize = 30;

/// Shorten a pack path to its file name, ellipsized to fit the bar label
fn display_name(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    if name.chars().count() > NAME_WIDTH {
        let head: String = name.chars().take(NAME_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// One line per resolution step
#[derive(Debug, Default)]
pub struct DetectProgress;

impl ProgressReporter for DetectProgress {
    fn on_file_checking(&self, path: &str) {
        println!("Checking {}", path);
    }

    fn on_fallback_attempt(&self, path: &str, source: Source) {
        println!("  trying {} for {}", source, display_name(path));
    }

    fn on_file_matched(&self, path: &str, source: Source) {
        println!("  found {} on {}", display_name(path), source);
    }

    fn on_file_unresolved(&self, path: &str) {
        println!("  couldn't find {}", display_name(path));
    }
}

/// Per-entry download bars plus an overall completion bar
///
/// Clones share the same bars, so one copy can be handed to the installer.
#[derive(Clone)]
pub struct InstallProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
}

impl InstallProgress {
    pub fn new(total: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total as u64));
        overall.set_style(style("Total: {percent:>3}% [{pos}/{len}] {msg}"));
        Self {
            multi,
            overall,
            bars: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn finish(&self, message: String) {
        self.overall.finish_with_message(message);
    }

    fn take_bar(&self, path: &str) -> Option<ProgressBar> {
        self.bars.lock().ok().and_then(|mut bars| bars.remove(path))
    }

    fn println(&self, line: String) {
        // Falls back to plain stdout when the terminal is not drawable
        if self.multi.println(&line).is_err() {
            println!("{}", line);
        }
    }
}

impl ProgressReporter for InstallProgress {
    fn on_entry_skipped(&self, path: &str) {
        self.println(format!("{:<width$} SKIPPED", display_name(path), width = NAME_WIDTH));
        self.overall.inc(1);
    }

    fn on_download_started(&self, path: &str, _url: &str, _total_size: Option<u64>) {
        let bar = self.multi.insert_before(&self.overall, ProgressBar::new(100));
        bar.set_style(style("{msg:30} [{bar:50.green}] {pos:>3}%"));
        bar.set_message(display_name(path));
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(path.to_string(), bar);
        }
    }

    fn on_download_progress(&self, path: &str, _downloaded: u64, _total: u64, percent: u8) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(bar) = bars.get(path) {
                bar.set_position(u64::from(percent));
            }
        }
    }

    fn on_entry_done(&self, path: &str, _size: u64) {
        if let Some(bar) = self.take_bar(path) {
            bar.set_position(100);
            bar.finish_and_clear();
        }
        self.println(format!("{:<width$} DONE", display_name(path), width = NAME_WIDTH));
        self.overall.inc(1);
    }

    fn on_entry_failed(&self, path: &str, _url: &str, error: &str) {
        if let Some(bar) = self.take_bar(path) {
            bar.abandon();
            self.multi.remove(&bar);
        }
        self.println(format!("{:<width$} ERROR {}", display_name(path), error, width = NAME_WIDTH));
        self.overall.inc(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_truncates_long_names() {
        assert_eq!(display_name("mods/sodium.jar"), "sodium.jar");
        let long = format!("mods/{}.jar", "a".repeat(40));
        let shown = display_name(&long);
        assert_eq!(shown.chars().count(), NAME_WIDTH);
        assert!(shown.ends_with("..."));
    }
}
