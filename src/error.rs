use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AppManifestError {
    #[error("please enter a profile ID")]
    EmptyInput,

    #[error("invalid app id: {0:?}")]
    InvalidAppId(String),

    #[error("failed to fetch the profile: {0}")]
    Network(String),

    #[error("Steam Community returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to parse the games XML: {0}")]
    Parse(String),

    #[error("profile unavailable: {0}")]
    ProfileUnavailable(String),

    #[error("please provide a valid Steam library path: {0}")]
    InvalidLibraryPath(PathBuf),

    #[error("failed to write {path}: {message}")]
    FileWrite { path: PathBuf, message: String },

    #[error("failed to read settings file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON settings: {0}")]
    ConfigParse(String),
}
