//! Prompt autocomplete tags.

/// Minimum search term length before anything is suggested.
pub const MIN_TERM_LEN: usize = 2;

/// Default number of suggestions.
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    tags: Vec<String>,
}

impl TagIndex {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    /// Parse `tag,count,...` lines, keeping the first column of every
    /// non-blank line.
    pub fn from_csv(text: &str) -> Self {
        let tags = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| line.split(',').next())
            .map(str::to_string)
            .collect();
        Self { tags }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Case-insensitive substring search, in file order.
    pub fn search(&self, term: &str, limit: usize) -> Vec<&str> {
        if term.chars().count() < MIN_TERM_LEN {
            return Vec::new();
        }
        let needle = term.to_lowercase();
        self.tags
            .iter()
            .filter(|tag| tag.to_lowercase().contains(&needle))
            .take(limit)
            .map(String::as_str)
            .collect()
    }
}
