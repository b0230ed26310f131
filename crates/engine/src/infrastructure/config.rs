//! Application configuration
//!
//! Layered: built-in defaults, then `config.json` (shared with the original
//! launcher scripts), then environment variables.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "config.json";
pub const CONFIG_TEMPLATE_FILE: &str = "config.json.org";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8188";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server port
    pub server_port: u16,
    /// ComfyUI server URL, as handed to the frontend
    pub comfyui_endpoint: String,
    /// ComfyUI `output` folder, for image previews
    pub output_folder: Option<PathBuf>,
    /// ComfyUI `temp` folder; previews are cached here too
    pub temp_folder: Option<PathBuf>,
    /// Built frontend
    pub dist_dir: PathBuf,
    /// Workflow templates (`<name>.json` + `<name>_config.yaml`)
    pub workflow_dir: PathBuf,
    /// Persisted generation settings
    pub settings_path: PathBuf,
    /// Delay between history checks while jobs are pending
    pub poll_interval: Duration,
    /// Timeout for ComfyUI requests; unbounded when unset
    pub request_timeout: Option<Duration>,
    /// CORS allowed origins (comma-separated, or "*" for any)
    pub cors_allowed_origins: Option<String>,
}

/// `config.json` as written by the launcher scripts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub bun_port: Option<u16>,
    #[serde(default)]
    pub comfyui_endpoint: Option<String>,
    #[serde(default)]
    pub comfyui_output_folder: Option<String>,
    #[serde(default)]
    pub comfyui_temp_folder: Option<String>,
}

impl FileConfig {
    /// Read `config.json` from `dir`, seeding it from `config.json.org` on
    /// first run. A missing or broken file yields the defaults.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let template = dir.join(CONFIG_TEMPLATE_FILE);

        if !path.exists() && template.exists() {
            if let Err(e) = std::fs::copy(&template, &path) {
                tracing::warn!(error = %e, "Failed to copy {} to {}", CONFIG_TEMPLATE_FILE, CONFIG_FILE);
            }
        }

        match Self::read(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "Error loading config file, using defaults");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

impl AppConfig {
    /// Load configuration from `config.json` in `dir` and the environment
    pub fn load(dir: &Path) -> Result<Self> {
        Self::from_sources(FileConfig::load(dir), |key| env::var(key).ok())
    }

    /// Merge a file config with an environment lookup.
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| env(key))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let server_port = match var(&["COMFYDECK_PORT", "PORT"]) {
            Some(port) => port
                .parse()
                .context("COMFYDECK_PORT must be a valid port number")?,
            None => file.bun_port.unwrap_or(DEFAULT_PORT),
        };

        let dist_dir = PathBuf::from(var(&["COMFYDECK_DIST_DIR"]).unwrap_or_else(|| "dist".to_string()));
        let workflow_dir = var(&["COMFYDECK_WORKFLOW_DIR"])
            .map(PathBuf::from)
            .unwrap_or_else(|| dist_dir.join("workflow"));

        let poll_interval_ms = var(&["COMFYDECK_POLL_INTERVAL_MS"])
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        Ok(Self {
            server_port,
            comfyui_endpoint: var(&["COMFYUI_URL", "COMFYUI_BASE_URL"])
                .or(file.comfyui_endpoint.filter(|s| !s.is_empty()))
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            output_folder: var(&["COMFYUI_OUTPUT_FOLDER"])
                .or(file.comfyui_output_folder.filter(|s| !s.is_empty()))
                .map(PathBuf::from),
            temp_folder: var(&["COMFYUI_TEMP_FOLDER"])
                .or(file.comfyui_temp_folder.filter(|s| !s.is_empty()))
                .map(PathBuf::from),
            dist_dir,
            workflow_dir,
            settings_path: var(&["COMFYDECK_SETTINGS_PATH"])
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/settings.json")),
            poll_interval: Duration::from_millis(poll_interval_ms),
            request_timeout: var(&["COMFYDECK_REQUEST_TIMEOUT_SECS"])
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            cors_allowed_origins: var(&["CORS_ALLOWED_ORIGINS"]),
        })
    }

    /// `<dist>/tags/autocomplete.csv`
    pub fn tags_path(&self) -> PathBuf {
        self.dist_dir.join("tags").join("autocomplete.csv")
    }
}
