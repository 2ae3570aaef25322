//! Locally persisted settings.
//!
//! Settings live in a small key/value store owned by the surrounding
//! application. The tutor only reads from it: the settings blob once at
//! start-up to pick the initial style, and the bearer token before every
//! turn.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::TutorStyle;

/// Key of the JSON settings blob.
pub const SETTINGS_KEY: &str = "settings";

/// Key of the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Read access to persisted key/value settings.
pub trait SettingsStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns the stored bearer token, ignoring blank values.
    fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

/// A settings store that keeps one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    /// Creates a store rooted at `dir`. The directory need not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a store at the default location.
    ///
    /// Uses TUTOR_SETTINGS_DIR when set, else `tutor` inside the platform
    /// config directory. Fails if neither is available.
    pub fn default_location() -> Result<Self> {
        let dir = settings_dir(env::var_os("TUTOR_SETTINGS_DIR"), dirs::config_dir())?;
        Ok(Self::new(dir))
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn settings_dir(override_dir: Option<OsString>, config_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    config_dir.map(|dir| dir.join("tutor")).ok_or_else(|| {
        Error::validation(
            "could not determine the config directory; set TUTOR_SETTINGS_DIR",
            Some("settings_dir".to_string()),
        )
    })
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.dir.join(key);
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read setting");
                None
            }
        }
    }
}

/// An in-memory settings store.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    values: HashMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// The parts of the settings blob the tutor reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TutorSettings {
    /// The style a new conversation starts in.
    pub tutor_style: TutorStyle,
}

impl TutorSettings {
    /// Reads settings from `store`.
    ///
    /// A missing blob, malformed JSON, or an unknown style all fall back to
    /// the defaults.
    pub fn load(store: &dyn SettingsStore) -> Self {
        match store.get(SETTINGS_KEY) {
            Some(blob) => Self::parse(&blob),
            None => Self::default(),
        }
    }

    /// Parses a settings blob, falling back to defaults field by field.
    pub fn parse(blob: &str) -> Self {
        let value: Value = match serde_json::from_str(blob) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "settings blob is not valid JSON; using defaults");
                return Self::default();
            }
        };
        let tutor_style = match value.get("tutorStyle").and_then(Value::as_str) {
            Some(key) => key.parse().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "ignoring stored tutor style");
                TutorStyle::default()
            }),
            None => TutorStyle::default(),
        };
        Self { tutor_style }
    }
}
