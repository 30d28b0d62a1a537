//! The archive engine: finds notes that are old enough and moves them.
//!
//! A move is copy-then-delete. Whatever already sits at the destination is
//! deleted first (last write wins). When a rule asks for it, folders left
//! empty by the move are pruned from the deepest one outward, stopping below
//! the rule's source folder.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ArchiveRule;
use crate::error::{ArchiveError, VaultError};
use crate::paths::{self, PathKind};
use crate::vault::{Entity, FileEntry, FolderEntry, Vault};

pub const DAY_MILLIS: i64 = 86_400_000;

/// A file that was moved into an archive folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRecord {
    pub source_path: String,
    pub destination: String,
    pub file_name: String,
    pub rule_name: String,
    /// An entity at the destination was deleted to make room
    pub replaced_existing: bool,
    /// False when the copy lost a race against another writer
    pub copied: bool,
    pub pruned_folders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Not old enough yet
    NotDue,
    /// Already sits at its destination
    InPlace,
    Archived(ArchiveRecord),
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub file_name: String,
    pub rule_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub rules_scanned: usize,
    /// Valid rules whose source folder did not resolve to a folder
    pub rules_skipped: usize,
    pub files_seen: usize,
    pub archived: Vec<ArchiveRecord>,
    pub failures: Vec<FileFailure>,
}

/// Eligible iff created strictly before `now - days`.
pub fn is_due(file: &FileEntry, rule: &ArchiveRule, now: DateTime<Utc>) -> bool {
    let cutoff = now.timestamp_millis() - i64::from(rule.min_age_days()) * DAY_MILLIS;
    file.creation_time_millis < cutoff
}

/// Where `file` ends up under `rule`.
pub fn destination_path(file: &FileEntry, rule: &ArchiveRule) -> Result<String, ArchiveError> {
    if !rule.maintain_folder_structure {
        return Ok(paths::join_paths(&rule.dest_folder, &file.name));
    }

    let relative = paths::path_in_source_folder(&file.path, &rule.source_folder).ok_or_else(|| {
        ArchiveError::OutsideSource {
            path: file.path.clone(),
            source_folder: rule.source_folder.clone(),
        }
    })?;
    Ok(paths::join_paths(&rule.dest_folder, &relative))
}

/// The rule archives into a folder inside its own source and `file` already lives there.
fn in_nested_archive(file: &FileEntry, rule: &ArchiveRule) -> bool {
    paths::path_in_source_folder(&rule.dest_folder, &rule.source_folder).is_some()
        && paths::path_in_source_folder(&file.path, &rule.dest_folder).is_some()
}

pub struct Archiver<V> {
    vault: V,
}

impl<V: Vault> Archiver<V> {
    pub fn new(vault: V) -> Self {
        Self { vault }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn scan(&self, rules: &[ArchiveRule]) -> ScanReport {
        self.scan_at(rules, Utc::now())
    }

    /// Run every valid rule in order against the vault as of `now`.
    ///
    /// A failing file is recorded in the report and the scan moves on.
    pub fn scan_at(&self, rules: &[ArchiveRule], now: DateTime<Utc>) -> ScanReport {
        let mut report = ScanReport::default();

        for rule in rules.iter().filter(|r| r.is_valid()) {
            let source = match self.vault.resolve(&rule.source_folder) {
                Some(Entity::Folder(folder)) => folder,
                Some(Entity::File(_) | Entity::Other(_)) => {
                    log::warn!("Source folder {} is not a folder, skipping rule", rule.source_folder);
                    report.rules_skipped += 1;
                    continue;
                }
                None => {
                    log::warn!("Source folder {} not found, skipping rule", rule.source_folder);
                    report.rules_skipped += 1;
                    continue;
                }
            };
            report.rules_scanned += 1;

            let mut files = Vec::new();
            self.collect_markdown_files(&source, &mut files);

            for file in files {
                if in_nested_archive(&file, rule) {
                    continue;
                }
                report.files_seen += 1;

                match self.process_source_file(&file, rule, now) {
                    Ok(FileOutcome::Archived(record)) => {
                        log::info!("Archived {} → {}", record.source_path, record.destination);
                        report.archived.push(record);
                    }
                    Ok(FileOutcome::NotDue | FileOutcome::InPlace) => {}
                    Err(e) => {
                        log::warn!("Failed to archive {}: {}", file.path, e);
                        report.failures.push(FileFailure {
                            path: file.path.clone(),
                            file_name: file.name.clone(),
                            rule_name: rule.label(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        log::info!(
            "Archive scan completed ({} rules, {} files checked, {} archived, {} failed)",
            report.rules_scanned,
            report.files_seen,
            report.archived.len(),
            report.failures.len()
        );
        report
    }

    /// Markdown files below `folder`: a folder's own files first, then each
    /// subfolder in listing order. Unreadable folders are skipped.
    fn collect_markdown_files(&self, folder: &FolderEntry, files: &mut Vec<FileEntry>) {
        let children = match self.vault.list_children(folder) {
            Ok(children) => children,
            Err(e) => {
                log::warn!("Failed to list {}: {}", folder.path, e);
                return;
            }
        };

        let mut subfolders = Vec::new();
        for child in children {
            match child {
                Entity::File(file) if paths::is_markdown(&file.name) => files.push(file),
                Entity::File(_) | Entity::Other(_) => {}
                Entity::Folder(sub) => subfolders.push(sub),
            }
        }
        for sub in &subfolders {
            self.collect_markdown_files(sub, files);
        }
    }

    /// Archive one file if it is old enough.
    ///
    /// Folder creation failures and a copy that loses a race to another
    /// writer are not errors. Delete failures are.
    pub fn process_source_file(
        &self,
        file: &FileEntry,
        rule: &ArchiveRule,
        now: DateTime<Utc>,
    ) -> Result<FileOutcome, ArchiveError> {
        if !is_due(file, rule, now) {
            return Ok(FileOutcome::NotDue);
        }

        let destination = destination_path(file, rule)?;
        if paths::normalize(&destination) == paths::normalize(&file.path) {
            return Ok(FileOutcome::InPlace);
        }

        if rule.maintain_folder_structure {
            self.ensure_folder(paths::folder_from_path(&destination, PathKind::File));
        }

        let existing = self.vault.resolve(&destination);
        let replaced_existing = existing.is_some();
        if let Some(existing) = existing {
            self.vault.delete(&existing, true)?;
        }

        let copied = match self.vault.copy(file, &destination) {
            Ok(()) => true,
            Err(e) if e.is_already_exists() => {
                log::debug!("{} was recreated before the copy landed", destination);
                false
            }
            Err(source) => {
                return Err(ArchiveError::Copy {
                    path: file.path.clone(),
                    destination,
                    source,
                })
            }
        };

        self.vault.delete(&Entity::File(file.clone()), false)?;

        let pruned_folders = if rule.delete_empty_folders {
            self.delete_empty_folders(&file.path, rule)?
        } else {
            Vec::new()
        };

        Ok(FileOutcome::Archived(ArchiveRecord {
            source_path: file.path.clone(),
            destination,
            file_name: file.name.clone(),
            rule_name: rule.label(),
            replaced_existing,
            copied,
            pruned_folders,
        }))
    }

    fn ensure_folder(&self, path: &str) {
        if path.is_empty() {
            return;
        }
        match self.vault.create_folder(path) {
            Ok(()) => log::debug!("Created folder {}", path),
            Err(e) if e.is_already_exists() => {}
            Err(e) => log::debug!("Could not create folder {}: {}", path, e),
        }
    }

    /// Remove the now-empty folders between `file_path` and the rule's source
    /// folder, deepest first. The source folder itself is never touched.
    ///
    /// Returns the removed folder paths.
    pub fn delete_empty_folders(
        &self,
        file_path: &str,
        rule: &ArchiveRule,
    ) -> Result<Vec<String>, ArchiveError> {
        let relative = paths::path_in_source_folder(file_path, &rule.source_folder).ok_or_else(|| {
            ArchiveError::OutsideSource {
                path: file_path.to_string(),
                source_folder: rule.source_folder.clone(),
            }
        })?;

        let mut segments = paths::split_path_string(paths::folder_from_path(&relative, PathKind::File));
        let mut removed = Vec::new();

        while !segments.is_empty() {
            let path = paths::join_paths(&rule.source_folder, &segments.join("/"));
            if let Some(Entity::Folder(folder)) = self.vault.resolve(&path) {
                if !self.vault.list_children(&folder)?.is_empty() {
                    break;
                }
                match self.vault.delete(&Entity::Folder(folder), false) {
                    Ok(()) => removed.push(path),
                    // Holds something the listing did not show; leave it and everything above.
                    Err(VaultError::NotEmpty(_)) => break,
                    Err(e) => return Err(e.into()),
                }
            }
            segments.pop();
        }

        Ok(removed)
    }
}
