//! Unique file names inside one archive

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct Names {
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

/// Hands out archive paths that never collide.
///
/// The first request for `images/a.png` gets that path, later ones get
/// `images/a-1.png`, `images/a-2.png` and so on. One registry belongs to one
/// assembly; reservations are serialized so it can be shared between tasks.
#[derive(Debug, Default)]
pub struct FileNameRegistry {
    names: Mutex<Names>,
}

impl FileNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a unique path for `name` under `dir`
    pub fn reserve(&self, dir: &str, name: &str) -> String {
        let name = sanitize(name);
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);

        let path = join(dir, &name);
        if names.used.insert(path.clone()) {
            return path;
        }

        let (stem, extension) = split_extension(&name);
        loop {
            let suffix = {
                let next = names.next_suffix.entry(path.clone()).or_insert(0);
                *next += 1;
                *next
            };
            let candidate = join(dir, &format!("{stem}-{suffix}{extension}"));
            if names.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Number of reserved paths
    pub fn len(&self) -> usize {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .used
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Make a host-provided name safe to use as a single path component
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "untitled".to_string(),
        _ => cleaned,
    }
}

fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Split `report.final.pdf` into `report.final` and `.pdf`; dot files have
/// no extension
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(at) if at > 0 => name.split_at(at),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collisions_get_suffixes() {
        let registry = FileNameRegistry::new();
        assert_eq!(registry.reserve("images", "a.png"), "images/a.png");
        assert_eq!(registry.reserve("images", "a.png"), "images/a-1.png");
        assert_eq!(registry.reserve("images", "a.png"), "images/a-2.png");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_directories_are_separate() {
        let registry = FileNameRegistry::new();
        assert_eq!(registry.reserve("images", "a.png"), "images/a.png");
        assert_eq!(registry.reserve("files", "a.png"), "files/a.png");
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let registry = FileNameRegistry::new();
        assert_eq!(registry.reserve("files", "a-1.txt"), "files/a-1.txt");
        assert_eq!(registry.reserve("files", "a.txt"), "files/a.txt");
        assert_eq!(registry.reserve("files", "a.txt"), "files/a-2.txt");
    }

    #[test]
    fn test_names_without_extension() {
        let registry = FileNameRegistry::new();
        assert_eq!(registry.reserve("files", "README"), "files/README");
        assert_eq!(registry.reserve("files", "README"), "files/README-1");
        assert_eq!(registry.reserve("files", ".env"), "files/.env");
        assert_eq!(registry.reserve("files", ".env"), "files/.env-1");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize("  "), "untitled");
        assert_eq!(sanitize(".."), "untitled");
        assert_eq!(sanitize("a\\b.png"), "a_b.png");
    }

    #[test]
    fn test_empty_dir() {
        let registry = FileNameRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.reserve("", "doc.md"), "doc.md");
    }
}
