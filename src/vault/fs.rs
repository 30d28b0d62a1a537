use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{Entity, FileEntry, FolderEntry, OtherEntry, Vault};
use crate::error::VaultError;
use crate::paths;

/// A vault backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        paths::split_path_string(path)
            .into_iter()
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

fn io_error(path: &str, err: io::Error) -> VaultError {
    match err.kind() {
        ErrorKind::NotFound => VaultError::NotFound(path.to_string()),
        ErrorKind::AlreadyExists => VaultError::AlreadyExists(path.to_string()),
        _ => VaultError::Io {
            path: path.to_string(),
            source: err,
        },
    }
}

/// Creation time if the platform records one, otherwise last modification.
fn creation_time_millis(metadata: &fs::Metadata) -> i64 {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
        .unwrap_or(0)
}

/// Classify an entry from metadata that was read without following symlinks.
fn entity_from(path: String, metadata: &fs::Metadata) -> Entity {
    if metadata.is_dir() {
        Entity::Folder(FolderEntry { path })
    } else if metadata.is_file() {
        Entity::File(FileEntry {
            name: paths::file_name(&path).to_string(),
            creation_time_millis: creation_time_millis(metadata),
            path,
        })
    } else {
        Entity::Other(OtherEntry { path })
    }
}

impl Vault for FsVault {
    /// Symlinks resolve to [`Entity::Other`] and are never followed, except
    /// for the vault root itself.
    fn resolve(&self, path: &str) -> Option<Entity> {
        let path = paths::normalize(path);
        let full = self.full_path(&path);
        let metadata = if path.is_empty() {
            fs::metadata(full)
        } else {
            fs::symlink_metadata(full)
        };
        Some(entity_from(path, &metadata.ok()?))
    }

    fn list_children(&self, folder: &FolderEntry) -> Result<Vec<Entity>, VaultError> {
        let dir = self.full_path(&folder.path);
        let entries = fs::read_dir(&dir).map_err(|e| io_error(&folder.path, e))?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&folder.path, e))?;
            let child = match entry.file_name().into_string() {
                Ok(name) => {
                    let path = paths::join_paths(&folder.path, &name);
                    match entry.metadata() {
                        Ok(metadata) => entity_from(path, &metadata),
                        // Gone since read_dir saw it
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => {
                            log::debug!("Cannot stat {}: {}", entry.path().display(), e);
                            Entity::Other(OtherEntry { path })
                        }
                    }
                }
                // Not addressable as a vault path, but it still occupies the folder
                Err(raw) => Entity::Other(OtherEntry {
                    path: paths::join_paths(&folder.path, &raw.to_string_lossy()),
                }),
            };
            children.push(child);
        }
        children.sort_by(|a, b| a.path().cmp(b.path()));

        Ok(children)
    }

    fn copy(&self, file: &FileEntry, dest_path: &str) -> Result<(), VaultError> {
        let mut source = File::open(self.full_path(&file.path)).map_err(|e| io_error(&file.path, e))?;
        let dest_full = self.full_path(dest_path);
        // create_new makes an occupied destination fail instead of being overwritten
        let mut dest = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest_full)
            .map_err(|e| io_error(dest_path, e))?;

        if let Err(e) = io::copy(&mut source, &mut dest) {
            drop(dest);
            if let Err(cleanup) = fs::remove_file(&dest_full) {
                log::warn!("Failed to remove partial copy {}: {}", dest_full.display(), cleanup);
            }
            return Err(io_error(dest_path, e));
        }
        Ok(())
    }

    fn delete(&self, entity: &Entity, recursive: bool) -> Result<(), VaultError> {
        let path = entity.path();
        let full = self.full_path(path);

        match entity {
            // remove_file unlinks a symlink rather than its target
            Entity::File(_) | Entity::Other(_) => fs::remove_file(&full).map_err(|e| io_error(path, e)),
            Entity::Folder(_) if paths::normalize(path).is_empty() => Err(VaultError::Io {
                path: path.to_string(),
                source: io::Error::new(ErrorKind::PermissionDenied, "refusing to delete the vault root"),
            }),
            Entity::Folder(_) if recursive => fs::remove_dir_all(&full).map_err(|e| io_error(path, e)),
            Entity::Folder(_) => {
                let mut entries = fs::read_dir(&full).map_err(|e| io_error(path, e))?;
                if entries.next().is_some() {
                    return Err(VaultError::NotEmpty(path.to_string()));
                }
                fs::remove_dir(&full).map_err(|e| io_error(path, e))
            }
        }
    }

    fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        let full = self.full_path(path);
        if fs::symlink_metadata(&full).is_ok() {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        fs::create_dir_all(&full).map_err(|e| io_error(path, e))
    }
}
