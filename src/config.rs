use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::community::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::AppManifestError;

pub const CONFIG_FILE_NAME: &str = "steam-appmanifest.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub library_path: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: Option<String>,
    pub library_path: Utf8PathBuf,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from `path`, or from the platform config dir when `path`
    /// is `None`. Only an explicitly named file is required to exist.
    pub fn resolve(path: Option<&str>) -> Result<Settings, AppManifestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok(Self::resolve_config(Config::default())),
            },
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| AppManifestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| AppManifestError::ConfigParse(err.to_string()))?;
        tracing::debug!(path = %config_path.display(), "loaded settings");

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> Settings {
        let profile = config
            .profile
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let library_path = config
            .library_path
            .map(Utf8PathBuf::from)
            .or_else(default_library_path)
            .unwrap_or_default();
        let base_url = config
            .base_url
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = config
            .timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Settings {
            profile,
            library_path,
            base_url,
            timeout,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "steam-appmanifest")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Where Steam keeps `steamapps` on a default install for the host platform.
pub fn default_library_path() -> Option<Utf8PathBuf> {
    if cfg!(windows) {
        return Some(Utf8PathBuf::from(r"C:\Program Files (x86)\Steam\steamapps"));
    }
    // data_dir is ~/Library/Application Support on macOS and
    // $XDG_DATA_HOME (~/.local/share) elsewhere.
    let dirs = BaseDirs::new()?;
    Utf8PathBuf::from_path_buf(dirs.data_dir().join("Steam").join("steamapps")).ok()
}
