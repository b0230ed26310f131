//! Typed paths into the backend's object-info manifest.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;

/// One step of a manifest path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

impl PathSegment {
    /// Follow this segment from `node`. Null counts as absent.
    fn step<'a>(&self, node: &'a Value) -> Option<&'a Value> {
        let next = match (self, node) {
            (Self::Key(key), Value::Object(map)) => map.get(key),
            (Self::Key(key), Value::Array(items)) => {
                key.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            (Self::Index(i), Value::Array(items)) => items.get(*i),
            (Self::Index(i), Value::Object(map)) => map.get(&i.to_string()),
            _ => None,
        };
        next.filter(|v| !v.is_null())
    }
}

/// Sequence of keys/indices describing where a list lives in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestPath(Vec<PathSegment>);

impl ManifestPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Build from a JSON/YAML array; anything else is not a path.
    pub fn from_value(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        let segments = items
            .iter()
            .map(|item| match item {
                Value::Number(n) => n
                    .as_u64()
                    .map(|i| PathSegment::Index(i as usize))
                    .unwrap_or_else(|| PathSegment::Key(n.to_string())),
                Value::String(s) => PathSegment::Key(s.clone()),
                other => PathSegment::Key(other.to_string()),
            })
            .collect();
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Follow every segment and return the value at the end of the path.
    pub fn resolve<'a>(&self, root: &'a Value) -> Result<&'a Value, DomainError> {
        let mut current = root;
        for (depth, segment) in self.0.iter().enumerate() {
            current = segment
                .step(current)
                .ok_or_else(|| DomainError::path_not_found(segment, depth))?;
        }
        Ok(current)
    }

    /// Resolve the path and read the result as a list of options.
    ///
    /// A value at the end of the path that is not an array yields an empty
    /// list; only a broken path is an error.
    pub fn resolve_list(&self, root: &Value) -> Result<Vec<Value>, DomainError> {
        let Some((last, parents)) = self.0.split_last() else {
            return Ok(Vec::new());
        };

        let mut current = root;
        for (depth, segment) in parents.iter().enumerate() {
            current = segment
                .step(current)
                .ok_or_else(|| DomainError::path_not_found(segment, depth))?;
        }

        Ok(last
            .step(current)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

impl From<Vec<PathSegment>> for ManifestPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for ManifestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("."))
    }
}
