use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::community::{GamesSource, fetch_games};
use crate::domain::GameRecord;
use crate::error::AppManifestError;
use crate::library::GameLibrary;
use crate::manifest::{WriteReport, write_manifests};

pub const RESTART_NOTICE: &str = "Restart Steam for the changes to take effect.";

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct GamesResult {
    pub profile: String,
    pub total: usize,
    pub filter: String,
    pub games: Vec<GameRecord>,
}

/// Process-wide state: the current batch, its filter and the target library.
pub struct App<S: GamesSource> {
    source: Arc<S>,
    library: GameLibrary,
    library_path: String,
}

impl<S: GamesSource> App<S> {
    pub fn new(source: S, library_path: impl Into<String>) -> Self {
        Self {
            source: Arc::new(source),
            library: GameLibrary::new(),
            library_path: library_path.into(),
        }
    }

    pub fn source(&self) -> Arc<S> {
        Arc::clone(&self.source)
    }

    pub fn library(&self) -> &GameLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut GameLibrary {
        &mut self.library
    }

    pub fn library_path(&self) -> &str {
        &self.library_path
    }

    pub fn set_library_path(&mut self, path: impl Into<String>) {
        self.library_path = path.into();
    }

    /// Fetch `profile` and replace the current batch. On failure the previous
    /// batch is left untouched.
    pub fn refresh(
        &mut self,
        profile: &str,
        sink: &dyn ProgressSink,
    ) -> Result<usize, AppManifestError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("fetching games for {}", profile.trim()),
            elapsed: None,
        });
        let games = fetch_games(self.source.as_ref(), profile)?;
        let count = self.install_batch(games);
        sink.event(ProgressEvent {
            message: format!("loaded {count} games"),
            elapsed: Some(started.elapsed()),
        });
        Ok(count)
    }

    pub fn install_batch(&mut self, games: Vec<GameRecord>) -> usize {
        self.library.replace_all(games);
        self.library.len()
    }

    pub fn games(&self, profile: &str) -> GamesResult {
        let visible = self.library.visible_records();
        GamesResult {
            profile: profile.trim().to_string(),
            total: self.library.len(),
            filter: self.library.filter().to_string(),
            games: visible.iter().map(|entry| entry.record.clone()).collect(),
        }
    }

    pub fn write_selected(&self, sink: &dyn ProgressSink) -> Result<WriteReport, AppManifestError> {
        let selected = self.library.selected_records();
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!(
                "writing {} manifest(s) to {}",
                selected.len(),
                self.library_path
            ),
            elapsed: None,
        });
        let report = write_manifests(Path::new(&self.library_path), &selected)?;
        sink.event(ProgressEvent {
            message: describe_report(&report),
            elapsed: Some(started.elapsed()),
        });
        Ok(report)
    }
}

pub fn describe_report(report: &WriteReport) -> String {
    let mut message = format!("Successfully created {} manifest files.", report.written);
    if !report.failures.is_empty() {
        message.push_str(&format!(" {} failed:", report.failures.len()));
        for failure in &report.failures {
            message.push_str(&format!("\n- {} ({}): {}", failure.name, failure.app_id, failure.error));
        }
    }
    if report.written > 0 {
        message.push('\n');
        message.push_str(RESTART_NOTICE);
    }
    message
}
