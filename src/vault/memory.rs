use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{Entity, FileEntry, FolderEntry, Vault};
use crate::error::VaultError;
use crate::paths::{self, PathKind};

#[derive(Debug, Clone)]
enum Node {
    File { created: i64, contents: String },
    Folder,
}

#[derive(Debug, Default)]
struct State {
    /// Normalized path → node. The root (`""`) is implicit.
    nodes: BTreeMap<String, Node>,
    operations: Vec<String>,
    failing_copies: HashSet<String>,
    racing_copies: BTreeMap<String, String>,
    failing_deletes: HashSet<String>,
}

impl State {
    fn entity(&self, path: &str) -> Option<Entity> {
        if path.is_empty() {
            return Some(Entity::Folder(FolderEntry { path: String::new() }));
        }
        match self.nodes.get(path)? {
            Node::File { created, .. } => Some(Entity::File(FileEntry {
                path: path.to_string(),
                name: paths::file_name(path).to_string(),
                creation_time_millis: *created,
            })),
            Node::Folder => Some(Entity::Folder(FolderEntry {
                path: path.to_string(),
            })),
        }
    }

    fn children(&self, folder: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|key| paths::folder_from_path(key, PathKind::File) == folder)
            .cloned()
            .collect()
    }

    fn is_folder(&self, path: &str) -> bool {
        path.is_empty() || matches!(self.nodes.get(path), Some(Node::Folder))
    }
}

/// An in-memory vault.
///
/// Every call is appended to an operation log (`resolve foo`, `copy a -> b`, ...)
/// so callers can assert on exactly what was asked of the store.
#[derive(Debug, Default)]
pub struct MemoryVault {
    state: Mutex<State>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a file, creating its parent folders.
    pub fn add_file(&self, path: &str, created_millis: i64, contents: &str) {
        let path = paths::normalize(path);
        let mut state = self.state();
        let segments = paths::split_path_string(&path);
        for depth in 1..segments.len() {
            state
                .nodes
                .entry(segments[..depth].join("/"))
                .or_insert(Node::Folder);
        }
        state.nodes.insert(
            path.clone(),
            Node::File {
                created: created_millis,
                contents: contents.to_string(),
            },
        );
    }

    /// Add a folder and its parents.
    pub fn add_folder(&self, path: &str) {
        let path = paths::normalize(path);
        let mut state = self.state();
        let segments = paths::split_path_string(&path);
        for depth in 1..=segments.len() {
            state
                .nodes
                .entry(segments[..depth].join("/"))
                .or_insert(Node::Folder);
        }
    }

    /// Make every copy to `dest_path` fail with an I/O error.
    pub fn fail_copies_to(&self, dest_path: &str) {
        self.state().failing_copies.insert(paths::normalize(dest_path));
    }

    /// Simulate another writer: the next copy to `dest_path` finds `contents`
    /// already there and reports `AlreadyExists`.
    pub fn race_copies_to(&self, dest_path: &str, contents: &str) {
        self.state()
            .racing_copies
            .insert(paths::normalize(dest_path), contents.to_string());
    }

    /// Make every delete of `path` fail with an I/O error.
    pub fn fail_deletes_of(&self, path: &str) {
        self.state().failing_deletes.insert(paths::normalize(path));
    }

    pub fn exists(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        self.state().entity(&path).is_some()
    }

    pub fn contents(&self, path: &str) -> Option<String> {
        match self.state().nodes.get(&paths::normalize(path)) {
            Some(Node::File { contents, .. }) => Some(contents.clone()),
            _ => None,
        }
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.state().nodes.keys().cloned().collect()
    }

    pub fn operations(&self) -> Vec<String> {
        self.state().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }
}

impl Vault for MemoryVault {
    fn resolve(&self, path: &str) -> Option<Entity> {
        let path = paths::normalize(path);
        let mut state = self.state();
        state.operations.push(format!("resolve {}", path));
        state.entity(&path)
    }

    fn list_children(&self, folder: &FolderEntry) -> Result<Vec<Entity>, VaultError> {
        let path = paths::normalize(&folder.path);
        let mut state = self.state();
        state.operations.push(format!("list {}", path));
        if !state.is_folder(&path) {
            return Err(VaultError::NotFound(path));
        }
        Ok(state
            .children(&path)
            .iter()
            .filter_map(|child| state.entity(child))
            .collect())
    }

    fn copy(&self, file: &FileEntry, dest_path: &str) -> Result<(), VaultError> {
        let source = paths::normalize(&file.path);
        let dest = paths::normalize(dest_path);
        let mut state = self.state();
        state.operations.push(format!("copy {} -> {}", source, dest));

        if state.failing_copies.contains(&dest) {
            return Err(VaultError::Io {
                path: dest,
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected copy failure"),
            });
        }
        if let Some(winner) = state.racing_copies.remove(&dest) {
            state.nodes.insert(
                dest.clone(),
                Node::File {
                    created: 0,
                    contents: winner,
                },
            );
            return Err(VaultError::AlreadyExists(dest));
        }
        let contents = match state.nodes.get(&source) {
            Some(Node::File { contents, .. }) => contents.clone(),
            _ => return Err(VaultError::NotFound(source)),
        };
        if dest.is_empty() || state.nodes.contains_key(&dest) {
            return Err(VaultError::AlreadyExists(dest));
        }
        if !state.is_folder(paths::folder_from_path(&dest, PathKind::File)) {
            return Err(VaultError::NotFound(dest));
        }
        state.nodes.insert(
            dest,
            Node::File {
                created: file.creation_time_millis,
                contents,
            },
        );
        Ok(())
    }

    fn delete(&self, entity: &Entity, recursive: bool) -> Result<(), VaultError> {
        let path = paths::normalize(entity.path());
        let mut state = self.state();
        state.operations.push(format!("delete {}", path));

        if path.is_empty() {
            return Err(VaultError::Io {
                path,
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "refusing to delete the vault root",
                ),
            });
        }
        if state.failing_deletes.contains(&path) {
            return Err(VaultError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected delete failure"),
            });
        }
        if !state.nodes.contains_key(&path) {
            return Err(VaultError::NotFound(path));
        }

        let prefix = format!("{}/", path);
        let has_descendants = state.nodes.keys().any(|key| key.starts_with(&prefix));
        if has_descendants && !recursive {
            return Err(VaultError::NotEmpty(path));
        }
        state.nodes.retain(|key, _| key != &path && !key.starts_with(&prefix));
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        let path = paths::normalize(path);
        let mut state = self.state();
        state.operations.push(format!("create {}", path));

        if state.entity(&path).is_some() {
            return Err(VaultError::AlreadyExists(path));
        }
        let segments = paths::split_path_string(&path);
        for depth in 1..=segments.len() {
            let ancestor = segments[..depth].join("/");
            match state.nodes.get(&ancestor) {
                Some(Node::File { .. }) => return Err(VaultError::AlreadyExists(ancestor)),
                Some(Node::Folder) => {}
                None => {
                    state.nodes.insert(ancestor, Node::Folder);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file_creates_parents() {
        let vault = MemoryVault::new();
        vault.add_file("Notes/2023/31.md", 5, "hello");
        assert_eq!(vault.paths(), vec!["Notes", "Notes/2023", "Notes/2023/31.md"]);
        assert_eq!(vault.contents("Notes/2023/31.md").as_deref(), Some("hello"));
    }

    #[test]
    fn test_list_children_only_direct() {
        let vault = MemoryVault::new();
        vault.add_file("Notes/a.md", 0, "");
        vault.add_file("Notes/sub/b.md", 0, "");
        let children = vault
            .list_children(&FolderEntry { path: "Notes".into() })
            .unwrap();
        let paths: Vec<&str> = children.iter().map(|e| e.path()).collect();
        assert_eq!(paths, vec!["Notes/a.md", "Notes/sub"]);
    }

    #[test]
    fn test_copy_rules() {
        let vault = MemoryVault::new();
        vault.add_file("Notes/a.md", 7, "a");
        vault.add_file("Archive/a.md", 1, "old");
        let Some(Entity::File(file)) = vault.resolve("Notes/a.md") else {
            panic!("missing file");
        };

        assert!(vault.copy(&file, "Archive/a.md").unwrap_err().is_already_exists());
        assert!(matches!(vault.copy(&file, "Missing/a.md"), Err(VaultError::NotFound(_))));

        vault.copy(&file, "Archive/b.md").unwrap();
        assert_eq!(vault.contents("Archive/b.md").as_deref(), Some("a"));

        vault.fail_copies_to("Archive/c.md");
        assert!(matches!(vault.copy(&file, "Archive/c.md"), Err(VaultError::Io { .. })));
    }

    #[test]
    fn test_delete_and_create_folder() {
        let vault = MemoryVault::new();
        vault.add_file("Notes/sub/a.md", 0, "");
        let sub = vault.resolve("Notes/sub").unwrap();
        assert!(matches!(vault.delete(&sub, false), Err(VaultError::NotEmpty(_))));
        vault.delete(&sub, true).unwrap();
        assert_eq!(vault.paths(), vec!["Notes"]);

        vault.create_folder("Archive/2023/December").unwrap();
        assert!(vault.exists("Archive/2023"));
        assert!(vault.create_folder("Archive/2023").unwrap_err().is_already_exists());
    }

    #[test]
    fn test_operations_are_logged() {
        let vault = MemoryVault::new();
        vault.add_folder("Notes");
        vault.resolve("Notes");
        vault.create_folder("Archive").unwrap();
        assert_eq!(vault.operations(), vec!["resolve Notes", "create Archive"]);
        vault.clear_operations();
        assert!(vault.operations().is_empty());
    }
}
