//! Filesystem workflow template storage.
//!
//! A template named `portrait` is the pair `portrait.json` (the ComfyUI
//! graph, API format) and `portrait_config.yaml` (its binding config).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use comfydeck_domain::{WorkflowConfig, WorkflowGraph};

use crate::infrastructure::ports::{RepoError, WorkflowRepo};

const GRAPH_EXTENSION: &str = "json";
const CONFIG_SUFFIX: &str = "_config.yaml";

pub struct FsWorkflowStore {
    dir: PathBuf,
}

impl FsWorkflowStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Template names are plain file stems; anything that could walk out of
    /// the directory is treated as unknown.
    fn file_path(&self, name: &str, suffix: &str) -> Result<PathBuf, RepoError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(RepoError::not_found("Workflow", name));
        }
        Ok(self.dir.join(format!("{name}{suffix}")))
    }

    async fn read(&self, name: &str, path: PathBuf, operation: &'static str) -> Result<String, RepoError> {
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RepoError::not_found("Workflow", format!("{name} ({})", path.display())))
            }
            Err(e) => Err(RepoError::io(operation, e)),
        }
    }
}

#[async_trait]
impl WorkflowRepo for FsWorkflowStore {
    async fn list(&self) -> Result<Vec<String>, RepoError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| RepoError::io("workflows.list", e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RepoError::io("workflows.list", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(GRAPH_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn load_graph(&self, name: &str) -> Result<WorkflowGraph, RepoError> {
        let path = self.file_path(name, &format!(".{GRAPH_EXTENSION}"))?;
        let text = self.read(name, path, "workflows.load_graph").await?;
        serde_json::from_str(&text).map_err(RepoError::serialization)
    }

    async fn load_config(&self, name: &str) -> Result<WorkflowConfig, RepoError> {
        let path = self.file_path(name, CONFIG_SUFFIX)?;
        let text = self.read(name, path, "workflows.load_config").await?;
        serde_yaml::from_str(&text).map_err(RepoError::serialization)
    }
}
