//! JSON-file settings storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use comfydeck_domain::GenerationSettings;

use crate::infrastructure::ports::{RepoError, SettingsRepo};

/// Stores the generation settings as one JSON object on disk.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsRepo for JsonSettingsStore {
    async fn load(&self) -> Result<Option<Map<String, Value>>, RepoError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RepoError::io("settings.load", e)),
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(other) => Err(RepoError::serialization(format!(
                "expected a JSON object, found {}",
                type_name(&other)
            ))),
            Err(e) => Err(RepoError::serialization(e)),
        }
    }

    async fn save(&self, settings: &GenerationSettings) -> Result<(), RepoError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoError::io("settings.save", e))?;
        }

        let json = serde_json::to_string_pretty(settings).map_err(RepoError::serialization)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| RepoError::io("settings.save", e))
    }

    async fn clear(&self) -> Result<(), RepoError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepoError::io("settings.clear", e)),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
