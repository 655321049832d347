use cipherstudio_preview::{EntryTieBreak, DEFAULT_ENTRY_FILE, DEFAULT_ENTRY_SYMBOL};
use cipherstudio_workspace::{write_atomic, OrphanPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const SETTINGS_VERSION: u32 = 1;

/// Environment variable naming the settings file.
pub const SETTINGS_PATH_ENV: &str = "CIPHERSTUDIO_SETTINGS";
/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "CIPHERSTUDIO_API_URL";
/// Environment variable carrying the bearer credential. Never persisted.
pub const TOKEN_ENV: &str = "CIPHERSTUDIO_TOKEN";
/// Settings file used when nothing else is configured.
pub const DEFAULT_SETTINGS_FILE: &str = "cipherstudio.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize settings {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub workspace: WorkspaceSettings,
    #[serde(default)]
    pub preview: PreviewSettings,
    #[serde(default)]
    pub layout: crate::layout::PaneBounds,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            api: ApiSettings::default(),
            storage: StorageSettings::default(),
            workspace: WorkspaceSettings::default(),
            preview: PreviewSettings::default(),
            layout: crate::layout::PaneBounds::default(),
        }
    }
}

impl Settings {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = SETTINGS_VERSION;
        }
        self.api.sanitize();
        self.storage.sanitize();
        self.preview.sanitize();
        self.layout.sanitize();
    }

    /// Applies `CIPHERSTUDIO_API_URL` when set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.api.override_base_url(url);
        }
    }
}

/// Settings path from `CIPHERSTUDIO_SETTINGS`, or the default file name.
pub fn settings_path_from_env() -> PathBuf {
    std::env::var_os(SETTINGS_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiSettings {
    fn sanitize(&mut self) {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        self.base_url = if trimmed.is_empty() {
            default_base_url()
        } else {
            trimmed.to_string()
        };
        if self.user_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            self.user_id = None;
        }
        self.timeout_secs = self.timeout_secs.clamp(1, 120);
    }

    pub fn override_base_url(&mut self, url: impl Into<String>) {
        self.base_url = url.into();
        self.sanitize();
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// The REST persistence service.
    #[default]
    Remote,
    /// A single JSON file on disk.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
}

fn default_local_path() -> PathBuf {
    PathBuf::from("cipherstudio-projects.json")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            local_path: default_local_path(),
        }
    }
}

impl StorageSettings {
    fn sanitize(&mut self) {
        if self.local_path.as_os_str().is_empty() {
            self.local_path = default_local_path();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSettings {
    #[serde(default = "default_entry_file")]
    pub entry_file: String,
    #[serde(default = "default_entry_symbol")]
    pub entry_symbol: String,
    #[serde(default)]
    pub tie_break: EntryTieBreak,
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,
    #[serde(default)]
    pub visible: bool,
}

fn default_entry_file() -> String {
    DEFAULT_ENTRY_FILE.to_string()
}

fn default_entry_symbol() -> String {
    DEFAULT_ENTRY_SYMBOL.to_string()
}

fn default_render_timeout_ms() -> u64 {
    2000
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            entry_file: default_entry_file(),
            entry_symbol: default_entry_symbol(),
            tie_break: EntryTieBreak::default(),
            render_timeout_ms: default_render_timeout_ms(),
            visible: false,
        }
    }
}

impl PreviewSettings {
    fn sanitize(&mut self) {
        if self.entry_file.trim().is_empty() {
            self.entry_file = default_entry_file();
        }
        if self.entry_symbol.trim().is_empty() {
            self.entry_symbol = default_entry_symbol();
        }
        self.render_timeout_ms = self.render_timeout_ms.clamp(100, 30_000);
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    data: Settings,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            path: path.into(),
            data: settings,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!(path = %path.display(), "settings file missing; using defaults");
            let mut data = Settings::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Settings =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn settings(&self) -> &Settings {
        &self.data
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), SettingsError>
    where
        F: FnMut(&mut Settings),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SettingsError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            SettingsError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;
        write_atomic(&self.path, payload.as_bytes()).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
