//! Flat file tree and its persisted layout
//!
//! The wire/store layout nests contents one level down so that a tree
//! serializes as `{"app.js": {"file": {"contents": "..."}}}`, which is the
//! shape the sandbox mounts and the store persists.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// File contents wrapper, the innermost layer of the persisted layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBody {
    /// Raw file contents
    pub contents: String,
}

/// One entry of the tree: `{"file": {"contents": "..."}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Nested body, kept for layout compatibility with the store and sandbox
    pub file: FileBody,
}

impl FileEntry {
    /// Create an entry from raw contents
    #[inline]
    #[must_use]
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            file: FileBody {
                contents: contents.into(),
            },
        }
    }

    /// Raw file contents
    #[inline]
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.file.contents
    }
}

/// Check that a file name carries no path separator.
///
/// The AI protocol instructs flat names only; nothing downstream rejects
/// violations, callers log and pass them through.
#[inline]
#[must_use]
pub fn is_flat_name(name: &str) -> bool {
    !name.contains(['/', '\\'])
}

/// Flat project file tree: unique name → entry
///
/// Insertion-ordered so that "an arbitrary remaining key" after a delete is
/// still deterministic for a given history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTree(IndexMap<String, FileEntry>);

impl FileTree {
    /// Create an empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tree has no files
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a file exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Contents of a file, if present
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(FileEntry::contents)
    }

    /// Upsert one file
    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.0.insert(name.into(), FileEntry::new(contents));
    }

    /// Remove one file; true if it existed
    pub fn remove(&mut self, name: &str) -> bool {
        self.0.shift_remove(name).is_some()
    }

    /// Iterate file names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// First file name in insertion order, if any
    #[inline]
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.0.keys().next().map(String::as_str)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.0.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Names that violate the flat-namespace rule
    pub fn flat_violations(&self) -> Vec<&str> {
        self.names().filter(|name| !is_flat_name(name)).collect()
    }
}

impl FromIterator<(String, String)> for FileTree {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, contents)| (name, FileEntry::new(contents)))
                .collect(),
        )
    }
}
