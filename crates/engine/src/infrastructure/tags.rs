//! Autocomplete tag list loading.

use std::path::Path;

use comfydeck_domain::TagIndex;

/// Load the tag CSV; a missing or unreadable file gives an empty index.
pub async fn load_tag_index(path: &Path) -> TagIndex {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let index = TagIndex::from_csv(&text);
            tracing::info!(count = index.len(), path = %path.display(), "Loaded autocomplete tags");
            index
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No autocomplete tag file");
            TagIndex::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Failed to read autocomplete tags");
            TagIndex::default()
        }
    }
}
