//! Receiver configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/piclink/pc.toml`
//! - Windows: `%APPDATA%/piclink/pc.toml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Display name of this PC (hostname by default).
    #[serde(default = "default_name")]
    pub name: String,

    /// Listening port (0 = OS-assigned).
    #[serde(default)]
    pub port: u16,

    /// Externally reachable host published in the share address when the
    /// local host would be a loopback name. Auto-detected when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_host: Option<String>,

    /// Treat a close after partial data as an implicit terminator.
    #[serde(default = "default_true")]
    pub partial_on_close: bool,

    /// Directory where received photos are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Document format produced by the OCR pipeline: "txt" or "html".
    #[serde(default = "default_document_format")]
    pub document_format: String,

    /// Hosted OCR backend; the pipeline is skipped when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrConfig>,
}

/// Hosted OCR backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "PicLink PC".into())
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> String {
    "piclink-received".into()
}

fn default_document_format() -> String {
    "html".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            port: 0,
            external_host: None,
            partial_on_close: default_true(),
            output_dir: default_output_dir(),
            document_format: default_document_format(),
            ocr: None,
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Saves the current configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("piclink")
            .join("pc.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("piclink").join("pc.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/piclink/pc.toml"))
    }
}
