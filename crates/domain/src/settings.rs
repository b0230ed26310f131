//! User-editable generation settings.
//!
//! The fixed fields cover the required bindings; anything an optional config
//! entry exposes lives in `extra`, keyed by the entry id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    #[serde(default)]
    pub workflow_name: String,
    #[serde(default)]
    pub checkpoint: String,
    #[serde(default)]
    pub positive: String,
    #[serde(default)]
    pub negative: String,
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default = "default_batch_count")]
    pub batch_count: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_seed() -> i64 {
    -1
}

fn default_batch_count() -> u32 {
    1
}

impl Default for GenerationSettings {
    fn default() -> Self {
        let mut extra = Map::new();
        extra.insert("steps".to_string(), json!(20));
        extra.insert("cfg".to_string(), json!(7));
        extra.insert("width".to_string(), json!(512));
        extra.insert("height".to_string(), json!(512));

        Self {
            workflow_name: String::new(),
            checkpoint: String::new(),
            positive: String::new(),
            negative: String::new(),
            seed: default_seed(),
            batch_count: default_batch_count(),
            extra,
        }
    }
}

impl GenerationSettings {
    /// Overlay persisted keys on top of the defaults.
    pub fn from_persisted(persisted: Map<String, Value>) -> Result<Self, DomainError> {
        Self::default().merge(persisted)
    }

    /// Shallow-merge `patch` into a copy of these settings. Keys in the patch
    /// win; a `null` value removes an extra field.
    pub fn merge(&self, patch: Map<String, Value>) -> Result<Self, DomainError> {
        let mut merged = self.to_map();
        for (key, value) in patch {
            merged.insert(key, value);
        }
        merged.retain(|_, v| !v.is_null());

        serde_json::from_value(Value::Object(merged))
            .map_err(|e| DomainError::invalid_settings(e.to_string()))
    }

    /// All settings as a flat JSON object, keyed the way config ids are.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Look up a setting by control id (`positive`, `batchCount`, `steps`, …).
    pub fn get(&self, id: &str) -> Option<Value> {
        self.to_map().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// A field counts as unset when missing, null or an empty string.
    pub fn is_unset(&self, id: &str) -> bool {
        match self.get(id) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }
}
