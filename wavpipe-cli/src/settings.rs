//! Persistent CLI settings (JSON file in the user data directory).
//!
//! Precedence, lowest first: built-in defaults, settings file, `WAVPIPE_*`
//! environment variables, command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use wavpipe_core::{
    buffering::{DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_CAPACITY},
    source::wav::WAV_HEADER_BYTES,
    PipelineConfig, RecognizerKind,
};

const MAX_CHUNK_SIZE: usize = 4 * 1024 * 1024;
const MAX_QUEUE_CAPACITY: usize = 4096;
const MAX_HEADER_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct CliSettings {
    pub chunk_size: usize,
    pub queue_capacity: usize,
    pub header_bytes: u64,
    pub sample_rate: u32,
    pub recognizer: String,
    pub show_progress: bool,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            header_bytes: WAV_HEADER_BYTES,
            sample_rate: 16_000,
            recognizer: RecognizerKind::default().as_str().into(),
            show_progress: true,
        }
    }
}

impl CliSettings {
    pub fn normalize(&mut self) {
        self.chunk_size = self.chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self.queue_capacity = self.queue_capacity.clamp(1, MAX_QUEUE_CAPACITY);
        self.header_bytes = self.header_bytes.min(MAX_HEADER_BYTES);
        self.sample_rate = self.sample_rate.clamp(8_000, 192_000);
        self.recognizer = normalize_recognizer(&self.recognizer);
    }

    /// Overlay `WAVPIPE_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_override(&lookup, "WAVPIPE_CHUNK_SIZE") {
            self.chunk_size = v;
        }
        if let Some(v) = parse_override(&lookup, "WAVPIPE_QUEUE_CAPACITY") {
            self.queue_capacity = v;
        }
        if let Some(v) = parse_override(&lookup, "WAVPIPE_HEADER_BYTES") {
            self.header_bytes = v;
        }
        if let Some(v) = parse_override(&lookup, "WAVPIPE_SAMPLE_RATE") {
            self.sample_rate = v;
        }
        if let Some(v) = lookup("WAVPIPE_RECOGNIZER") {
            self.recognizer = v;
        }
        if let Some(v) = lookup("WAVPIPE_PROGRESS") {
            self.show_progress = !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        self.normalize();
    }

    pub fn recognizer_kind(&self) -> RecognizerKind {
        RecognizerKind::parse(&self.recognizer).unwrap_or_default()
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            chunk_size: self.chunk_size,
            queue_capacity: self.queue_capacity,
            header_bytes: self.header_bytes,
            sample_rate: self.sample_rate,
        }
    }
}

pub fn normalize_recognizer(raw: &str) -> String {
    RecognizerKind::parse(raw)
        .unwrap_or_default()
        .as_str()
        .into()
}

fn parse_override<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wavpipe")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("wavpipe")
            .join("settings.json")
    }
}

/// Missing or malformed files fall back to defaults.
pub fn load_settings(path: &Path) -> CliSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<CliSettings>(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), "settings file is invalid, using defaults: {e}");
            CliSettings::default()
        }),
        Err(_) => CliSettings::default(),
    };
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &CliSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
