//! Selectable option lists read out of the backend's object-info manifest.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::settings::GenerationSettings;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::manifest::{ManifestPath, PathSegment};

/// Settings id of the checkpoint list.
pub const CHECKPOINT_ID: &str = "checkpoint";

/// Loader node whose `ckpt_name` input enumerates installed checkpoints.
pub const CHECKPOINT_LOADER_CLASS: &str = "D2 Checkpoint Loader";

/// `<loader>.input.required.ckpt_name[0]`
pub fn checkpoint_path() -> ManifestPath {
    ManifestPath::new(vec![
        PathSegment::Key(CHECKPOINT_LOADER_CLASS.to_string()),
        PathSegment::Key("input".to_string()),
        PathSegment::Key("required".to_string()),
        PathSegment::Key("ckpt_name".to_string()),
        PathSegment::Index(0),
    ])
}

/// Result of resolving a manifest against a workflow config.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedOptions {
    /// Option list per settings id; always contains `checkpoint`.
    pub list_items: BTreeMap<String, Vec<Value>>,
    /// Values to write into settings fields that were unset.
    pub seeded_defaults: Map<String, Value>,
    /// Entries whose path could not be followed.
    #[serde(skip)]
    pub unresolved: Vec<(String, DomainError)>,
}

impl ResolvedOptions {
    pub fn list(&self, id: &str) -> &[Value] {
        self.list_items.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Read option lists and pick defaults for unset settings.
///
/// Remembered values win over config defaults, config defaults win over an
/// empty field.
pub fn resolve(
    manifest: &Value,
    config: Option<&WorkflowConfig>,
    settings: &GenerationSettings,
) -> ResolvedOptions {
    let mut resolved = ResolvedOptions::default();

    // The checkpoint loader may simply not be installed; that is not worth
    // reporting.
    let mut checkpoints = checkpoint_path().resolve_list(manifest).unwrap_or_default();
    checkpoints.sort_by(|a, b| compare_labels(&option_label(a), &option_label(b)));
    seed_from_list(&mut resolved, settings, CHECKPOINT_ID, &checkpoints, None);
    resolved
        .list_items
        .insert(CHECKPOINT_ID.to_string(), checkpoints);

    let Some(config) = config else {
        return resolved;
    };

    for entry in &config.optional {
        let fallback = entry.input.default.as_ref();

        let Some(path) = &entry.input.value else {
            if let Some(default) = fallback {
                if settings.is_unset(&entry.id) {
                    resolved
                        .seeded_defaults
                        .insert(entry.id.clone(), default.clone());
                }
            }
            continue;
        };

        let values = match path.resolve_list(manifest) {
            Ok(values) => values,
            Err(e) => {
                resolved.unresolved.push((entry.id.clone(), e));
                Vec::new()
            }
        };

        seed_from_list(&mut resolved, settings, &entry.id, &values, fallback);
        resolved.list_items.insert(entry.id.clone(), values);
    }

    resolved
}

fn seed_from_list(
    resolved: &mut ResolvedOptions,
    settings: &GenerationSettings,
    id: &str,
    values: &[Value],
    fallback: Option<&Value>,
) {
    if !settings.is_unset(id) {
        return;
    }
    if let Some(first) = values.first().or(fallback) {
        resolved
            .seeded_defaults
            .insert(id.to_string(), first.clone());
    }
}

/// Case-insensitive order, ties broken by the raw text.
fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn option_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
