//! The document store the archiver works on.
//!
//! Paths are vault-relative and `/`-separated. `""` is the vault root.

use crate::error::VaultError;
use crate::paths::{self, PathKind};

mod fs;
mod memory;

pub use fs::FsVault;
pub use memory::MemoryVault;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    /// Creation time in milliseconds since the Unix epoch
    pub creation_time_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub path: String,
}

/// An entry that is neither a regular file nor a folder: a symlink, a
/// special file, or a name the vault cannot address. Never archived or
/// descended into, but it still occupies its folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherEntry {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    File(FileEntry),
    Folder(FolderEntry),
    Other(OtherEntry),
}

impl Entity {
    pub fn path(&self) -> &str {
        match self {
            Entity::File(file) => &file.path,
            Entity::Folder(folder) => &folder.path,
            Entity::Other(other) => &other.path,
        }
    }

    pub fn kind(&self) -> PathKind {
        match self {
            Entity::File(_) | Entity::Other(_) => PathKind::File,
            Entity::Folder(_) => PathKind::Folder,
        }
    }

    /// The folder this entity is, or the folder containing it.
    pub fn folder_path(&self) -> &str {
        paths::folder_from_path(self.path(), self.kind())
    }
}

/// Operations the archiver needs from a document store.
///
/// Every call completes before the archiver issues the next one.
pub trait Vault: Send + Sync {
    /// Look up the entity at `path`.
    fn resolve(&self, path: &str) -> Option<Entity>;

    /// Direct children of `folder`, in a stable order. Entries the vault
    /// cannot archive are listed as [`Entity::Other`], never left out.
    fn list_children(&self, folder: &FolderEntry) -> Result<Vec<Entity>, VaultError>;

    /// Copy `file` to `dest_path`. `AlreadyExists` if the destination is taken.
    fn copy(&self, file: &FileEntry, dest_path: &str) -> Result<(), VaultError>;

    /// A non-recursive delete of a folder with children fails with `NotEmpty`.
    fn delete(&self, entity: &Entity, recursive: bool) -> Result<(), VaultError>;

    /// Create `path` and any missing parents. `AlreadyExists` if it is already there.
    fn create_folder(&self, path: &str) -> Result<(), VaultError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_folder_path() {
        let file = Entity::File(FileEntry {
            path: "Notes/2023/31.md".into(),
            name: "31.md".into(),
            creation_time_millis: 0,
        });
        assert_eq!(file.folder_path(), "Notes/2023");
        assert_eq!(file.kind(), PathKind::File);

        let folder = Entity::Folder(FolderEntry {
            path: "Notes/2023".into(),
        });
        assert_eq!(folder.folder_path(), "Notes/2023");
    }
}
