//! Configuration options for archive assembly

use serde::Deserialize;

/// Options for fetching and packaging media
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArchiveOptions {
    /// Maximum number of media fetches in flight
    pub concurrency: usize,

    /// Directory for images inside the archive
    pub images_dir: String,

    /// Directory for attached files inside the archive
    pub files_dir: String,
}

impl ArchiveOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Concurrency limit actually used, never below one
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            images_dir: "images".to_string(),
            files_dir: "files".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ArchiveOptions::default();
        assert_eq!(options.concurrency, 5);
        assert_eq!(options.images_dir, "images");
        assert_eq!(options.files_dir, "files");
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let options = ArchiveOptions::default().with_concurrency(0);
        assert_eq!(options.effective_concurrency(), 1);
    }
}
