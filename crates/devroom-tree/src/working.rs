//! Per-client working state over the shared tree
//!
//! Tracks which file is active in the editor and which tabs are open.
//! Transitions here are local only; the session layer persists the whole
//! tree after each one and peers learn about it through the store or an
//! incoming AI bundle, never through a tree-level broadcast.

use crate::tree::FileTree;

/// The client-side document: the tree plus editing pointers
///
/// Starts empty; `load` populates it wholesale. The active pointer always
/// names an existing file or nothing.
#[derive(Debug, Clone, Default)]
pub struct WorkingTree {
    tree: FileTree,
    active: Option<String>,
    open: Vec<String>,
}

impl WorkingTree {
    /// Create an empty working tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying shared document
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    /// Currently active file, if any
    #[inline]
    #[must_use]
    pub fn active_file(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Open-tab names in opening order
    #[inline]
    #[must_use]
    pub fn open_files(&self) -> &[String] {
        &self.open
    }

    /// Wholesale replace, used on project open and on a received bundle.
    ///
    /// Pointers that no longer resolve against the new tree are dropped;
    /// the new tree is never merged into the old one.
    pub fn load(&mut self, snapshot: FileTree) {
        self.tree = snapshot;
        let tree = &self.tree;
        self.open.retain(|name| tree.contains(name));
        let active_resolves = self
            .active
            .as_deref()
            .is_some_and(|name| self.tree.contains(name));
        if !active_resolves {
            self.active = self.open.first().cloned();
        }
    }

    /// Upsert one file (local edit)
    pub fn set_file(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.tree.insert(name.into(), contents);
    }

    /// Remove one file; true if it existed.
    ///
    /// Deleting the active file advances the pointer to some remaining
    /// file, or clears it when the tree runs empty.
    pub fn delete_file(&mut self, name: &str) -> bool {
        let removed = self.tree.remove(name);
        if removed {
            self.open.retain(|open| open != name);
            if self.active.as_deref() == Some(name) {
                self.active = self.tree.first_name().map(str::to_owned);
            }
        }
        removed
    }

    /// Focus a file and add it to the open tabs; false if it does not exist
    pub fn open_file(&mut self, name: &str) -> bool {
        if !self.tree.contains(name) {
            return false;
        }
        if !self.open.iter().any(|open| open == name) {
            self.open.push(name.to_owned());
        }
        self.active = Some(name.to_owned());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn populated() -> WorkingTree {
        let mut working = WorkingTree::new();
        working.load(FileTree::from_iter([
            ("app.js".to_owned(), "a".to_owned()),
            ("server.js".to_owned(), "b".to_owned()),
            ("package.json".to_owned(), "{}".to_owned()),
        ]));
        working
    }

    #[test]
    fn starts_empty() {
        let working = WorkingTree::new();
        assert!(working.tree().is_empty());
        assert_eq!(working.active_file(), None);
        assert!(working.open_files().is_empty());
    }

    #[test]
    fn open_sets_active_and_dedups_tabs() {
        let mut working = populated();
        assert!(working.open_file("app.js"));
        assert!(working.open_file("server.js"));
        assert!(working.open_file("app.js"));

        assert_eq!(working.active_file(), Some("app.js"));
        assert_eq!(working.open_files(), ["app.js", "server.js"]);
        assert!(!working.open_file("missing.js"));
    }

    #[test]
    fn delete_active_advances_to_a_remaining_file() {
        let mut working = populated();
        working.open_file("app.js");

        assert!(working.delete_file("app.js"));
        let active = working.active_file().expect("active file after delete");
        assert!(working.tree().contains(active));
        assert!(!working.open_files().contains(&"app.js".to_owned()));
    }

    #[test]
    fn delete_last_file_clears_active() {
        let mut working = WorkingTree::new();
        working.load(FileTree::from_iter([(
            "app.js".to_owned(),
            "a".to_owned(),
        )]));
        working.open_file("app.js");

        assert!(working.delete_file("app.js"));
        assert_eq!(working.active_file(), None);
        assert!(working.tree().is_empty());
    }

    #[test]
    fn delete_inactive_keeps_pointer() {
        let mut working = populated();
        working.open_file("app.js");
        assert!(working.delete_file("server.js"));
        assert_eq!(working.active_file(), Some("app.js"));
    }

    #[test]
    fn load_replaces_wholesale_and_prunes_pointers() {
        let mut working = populated();
        working.open_file("app.js");
        working.open_file("server.js");

        working.load(FileTree::from_iter([
            ("server.js".to_owned(), "new".to_owned()),
            ("index.js".to_owned(), "i".to_owned()),
        ]));

        assert_eq!(working.tree().len(), 2);
        assert_eq!(working.tree().get("server.js"), Some("new"));
        assert!(!working.tree().contains("app.js"));
        assert_eq!(working.open_files(), ["server.js"]);
        assert_eq!(working.active_file(), Some("server.js"));
    }

    #[test]
    fn load_empty_clears_everything() {
        let mut working = populated();
        working.open_file("app.js");
        working.load(FileTree::new());
        assert!(working.tree().is_empty());
        assert_eq!(working.active_file(), None);
        assert!(working.open_files().is_empty());
    }
}
