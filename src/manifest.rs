use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::Builder;

use crate::domain::{AppId, GameRecord};
use crate::error::AppManifestError;

#[derive(Debug, Clone, Serialize)]
pub struct WriteReport {
    pub written: usize,
    pub paths: Vec<PathBuf>,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteFailure {
    pub app_id: AppId,
    pub name: String,
    pub error: String,
}

pub fn manifest_file_name(app_id: &AppId) -> String {
    format!("appmanifest_{}.acf", app_id.as_str())
}

pub fn manifest_path(library_dir: &Path, app_id: &AppId) -> PathBuf {
    library_dir.join(manifest_file_name(app_id))
}

/// Render the `AppState` block Steam reads from `appmanifest_<id>.acf`.
/// Fields are substituted verbatim.
pub fn render_manifest(record: &GameRecord) -> String {
    let app_id = record.app_id.as_str();
    let name = record.name.as_str();
    format!(
        r#""AppState"
{{
    "AppID"        "{app_id}"
    "Universe"      "1"
    "name"          "{name}"
    "StateFlags"    "4"
    "installdir"    "{name}"
    "LastUpdated"   "0"
    "UpdateResult"  "0"
    "SizeOnDisk"    "0"
    "buildid"       "0"
    "LastOwner"     "0"
    "BytesToDownload"   "0"
    "BytesDownloaded"   "0"
    "BytesToStage"      "0"
    "BytesStaged"       "0"
}}
"#
    )
}

/// Write one manifest per record into `library_dir`, replacing existing files.
///
/// The directory must already exist. A failure on one record is recorded in
/// the report and the remaining records are still written.
pub fn write_manifests(
    library_dir: &Path,
    records: &[GameRecord],
) -> Result<WriteReport, AppManifestError> {
    if !library_dir.is_dir() {
        return Err(AppManifestError::InvalidLibraryPath(
            library_dir.to_path_buf(),
        ));
    }

    let mut report = WriteReport {
        written: 0,
        paths: Vec::with_capacity(records.len()),
        failures: Vec::new(),
    };

    for record in records {
        let path = manifest_path(library_dir, &record.app_id);
        match write_atomic(library_dir, &path, render_manifest(record).as_bytes()) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "wrote manifest");
                report.written += 1;
                report.paths.push(path);
            }
            Err(err) => {
                tracing::warn!(app_id = %record.app_id, "{err}");
                report.failures.push(WriteFailure {
                    app_id: record.app_id.clone(),
                    name: record.name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        written = report.written,
        failed = report.failures.len(),
        "manifest batch finished"
    );
    Ok(report)
}

fn write_atomic(dir: &Path, path: &Path, content: &[u8]) -> Result<(), AppManifestError> {
    let file_error = |message: String| AppManifestError::FileWrite {
        path: path.to_path_buf(),
        message,
    };
    let mut temp = Builder::new()
        .prefix(".appmanifest")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| file_error(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| file_error(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| file_error(err.error.to_string()))?;
    Ok(())
}
