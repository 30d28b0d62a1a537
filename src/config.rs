use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::ConfigError;

/// Get the app data directory: <config dir>/auto-archive/
pub fn app_data_dir() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("auto-archive");
    fs::create_dir_all(&dir).ok();
    dir
}

// ── Data types ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rules: Vec<ArchiveRule>,
    pub settings: AppSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Directory served as the vault root
    pub vault_root: PathBuf,
    /// Minutes between periodic scans
    pub scan_interval_minutes: u32,
    /// Seconds to wait after startup before the first scan
    pub startup_delay_seconds: u32,
    /// Days to keep activity log entries (0 = forever)
    pub log_retention_days: u32,
}

fn default_vault_root() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vault")
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            vault_root: default_vault_root(),
            scan_interval_minutes: 10,
            startup_delay_seconds: 10,
            log_retention_days: 30,
        }
    }
}

/// Moves notes older than `days` from `source_folder` into `dest_folder`.
///
/// Field names are persisted in camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchiveRule {
    pub source_folder: String,
    pub dest_folder: String,
    /// Reproduce the path below `source_folder` under `dest_folder`
    pub maintain_folder_structure: bool,
    /// Remove folders left empty by archiving (never `source_folder` itself)
    pub delete_empty_folders: bool,
    pub days: u32,
}

impl Default for ArchiveRule {
    fn default() -> Self {
        Self {
            source_folder: String::new(),
            dest_folder: String::new(),
            maintain_folder_structure: false,
            delete_empty_folders: false,
            days: 1,
        }
    }
}

impl ArchiveRule {
    /// Both folders must be set; invalid rules are stored but never scanned.
    pub fn is_valid(&self) -> bool {
        !self.source_folder.trim().is_empty() && !self.dest_folder.trim().is_empty()
    }

    /// Age threshold, never less than one day.
    pub fn min_age_days(&self) -> u32 {
        self.days.max(1)
    }

    /// Short human-readable name used in logs and the activity table.
    pub fn label(&self) -> String {
        format!("{} → {}", self.source_folder, self.dest_folder)
    }
}

// ── Load / Save ─────────────────────────────────────────────

/// Read a file to string, handling BOM (UTF-8 BOM and UTF-16 LE/BE).
pub fn read_file_strip_bom(path: &Path) -> Result<String, ConfigError> {
    let raw = fs::read(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let utf16 = |bytes: &[u8], from: fn([u8; 2]) -> u16| {
        let units: Vec<u16> = bytes.chunks_exact(2).map(|c| from([c[0], c[1]])).collect();
        String::from_utf16(&units).map_err(|e| ConfigError::Encoding(e.to_string()))
    };

    // UTF-16 LE BOM: FF FE
    if let [0xFF, 0xFE, rest @ ..] = raw.as_slice() {
        return utf16(rest, u16::from_le_bytes);
    }

    // UTF-16 BE BOM: FE FF
    if let [0xFE, 0xFF, rest @ ..] = raw.as_slice() {
        return utf16(rest, u16::from_be_bytes);
    }

    // UTF-8 BOM: EF BB BF
    let text = String::from_utf8(raw).map_err(|e| ConfigError::Encoding(e.to_string()))?;
    Ok(text.strip_prefix('\u{FEFF}').unwrap_or(&text).to_string())
}

/// JSON-file backed configuration store.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<app data dir>/config.json`.
    pub fn open_default() -> Self {
        Self::new(app_data_dir().join("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, merged with defaults.
    ///
    /// A missing file is created with defaults; an unreadable or malformed one
    /// falls back to defaults without being overwritten.
    pub fn load(&self) -> AppConfig {
        if !self.path.exists() {
            let config = AppConfig::default();
            if let Err(e) = self.save(&config) {
                log::warn!("Failed to write default config: {}", e);
            }
            return config;
        }

        match read_file_strip_bom(&self.path)
            .and_then(|data| serde_json::from_str(&data).map_err(ConfigError::from))
        {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default config, {} is unusable: {}", self.path.display(), e);
                AppConfig::default()
            }
        }
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&self.path, json).map_err(|source| ConfigError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}

// ── Rule editing ────────────────────────────────────────────

/// An edit to the rule list, applied to the authoritative config and persisted.
#[derive(Debug, Clone)]
pub enum RuleEdit {
    Add(ArchiveRule),
    Update { index: usize, rule: ArchiveRule },
    Remove { index: usize },
    Move { from: usize, to: usize },
}

impl AppConfig {
    pub fn apply(&mut self, edit: RuleEdit) -> Result<(), ConfigError> {
        match edit {
            RuleEdit::Add(rule) => self.rules.push(rule),
            RuleEdit::Update { index, rule } => {
                let existing = self
                    .rules
                    .get_mut(index)
                    .ok_or(ConfigError::RuleNotFound(index))?;
                *existing = rule;
            }
            RuleEdit::Remove { index } => {
                if index >= self.rules.len() {
                    return Err(ConfigError::RuleNotFound(index));
                }
                self.rules.remove(index);
            }
            RuleEdit::Move { from, to } => {
                if from >= self.rules.len() {
                    return Err(ConfigError::RuleNotFound(from));
                }
                if to >= self.rules.len() {
                    return Err(ConfigError::RuleNotFound(to));
                }
                let rule = self.rules.remove(from);
                self.rules.insert(to, rule);
            }
        }
        Ok(())
    }
}

/// The authoritative configuration shared between the editing surface and
/// the scheduler. Scans only ever see cloned snapshots.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<Mutex<AppConfig>>,
    store: ConfigStore,
}

impl SharedConfig {
    pub fn new(config: AppConfig, store: ConfigStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(config)),
            store,
        }
    }

    pub fn load(store: ConfigStore) -> Self {
        let config = store.load();
        Self::new(config, store)
    }

    pub fn snapshot(&self) -> AppConfig {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply an edit and persist the result. Nothing changes if the edit is rejected.
    pub fn edit(&self, edit: RuleEdit) -> Result<(), ConfigError> {
        let mut config = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut updated = config.clone();
        updated.apply(edit)?;
        self.store.save(&updated)?;
        *config = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(source: &str, dest: &str) -> ArchiveRule {
        ArchiveRule {
            source_folder: source.to_string(),
            dest_folder: dest.to_string(),
            ..ArchiveRule::default()
        }
    }

    #[test]
    fn test_rule_validity() {
        assert!(rule("Notes", "Archive").is_valid());
        assert!(!rule("", "Archive").is_valid());
        assert!(!rule("   ", "Archive").is_valid());
        assert!(!rule("Notes", "\t").is_valid());
    }

    #[test]
    fn test_min_age_days_clamps_zero() {
        let mut r = rule("Notes", "Archive");
        r.days = 0;
        assert_eq!(r.min_age_days(), 1);
        r.days = 30;
        assert_eq!(r.min_age_days(), 30);
    }

    #[test]
    fn test_rule_uses_camel_case_fields() {
        let json = r#"{
            "sourceFolder": "Notes",
            "destFolder": "Archive",
            "maintainFolderStructure": true,
            "deleteEmptyFolders": true,
            "days": 7
        }"#;
        let parsed: ArchiveRule = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.source_folder, "Notes");
        assert_eq!(parsed.dest_folder, "Archive");
        assert!(parsed.maintain_folder_structure);
        assert!(parsed.delete_empty_folders);
        assert_eq!(parsed.days, 7);

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out["sourceFolder"], "Notes");
        assert_eq!(out["maintainFolderStructure"], true);
    }

    #[test]
    fn test_missing_fields_merge_with_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert!(config.rules.is_empty());
        assert_eq!(config.settings.scan_interval_minutes, 10);

        let config: AppConfig =
            serde_json::from_str(r#"{"rules":[{"sourceFolder":"Notes"}],"settings":{"scan_interval_minutes":5}}"#)
                .unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].dest_folder, "");
        assert_eq!(config.rules[0].days, 1);
        assert_eq!(config.settings.scan_interval_minutes, 5);
        assert_eq!(config.settings.log_retention_days, 30);
    }

    #[test]
    fn test_store_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let config = store.load();
        assert_eq!(config, AppConfig::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_store_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let mut config = AppConfig::default();
        config.rules.push(rule("Daily", "Archive/Daily"));
        store.save(&config).unwrap();
        assert_eq!(store.load(), config);
    }

    #[test]
    fn test_store_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let config = ConfigStore::new(&path).load();
        assert!(config.rules.is_empty());
        // The broken file is left for the user to fix.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_read_file_strip_bom() {
        let dir = tempfile::tempdir().unwrap();

        let utf8 = dir.path().join("utf8.json");
        fs::write(&utf8, b"\xEF\xBB\xBF{}").unwrap();
        assert_eq!(read_file_strip_bom(&utf8).unwrap(), "{}");

        let utf16 = dir.path().join("utf16.json");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "{}".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        fs::write(&utf16, bytes).unwrap();
        assert_eq!(read_file_strip_bom(&utf16).unwrap(), "{}");
    }

    #[test]
    fn test_apply_edits() {
        let mut config = AppConfig::default();
        config.apply(RuleEdit::Add(rule("A", "X"))).unwrap();
        config.apply(RuleEdit::Add(rule("B", "Y"))).unwrap();
        config.apply(RuleEdit::Move { from: 1, to: 0 }).unwrap();
        assert_eq!(config.rules[0].source_folder, "B");

        config
            .apply(RuleEdit::Update { index: 1, rule: rule("C", "Z") })
            .unwrap();
        assert_eq!(config.rules[1].source_folder, "C");

        config.apply(RuleEdit::Remove { index: 0 }).unwrap();
        assert_eq!(config.rules.len(), 1);

        assert!(matches!(
            config.apply(RuleEdit::Remove { index: 5 }),
            Err(ConfigError::RuleNotFound(5))
        ));
    }

    #[test]
    fn test_shared_config_persists_edits() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let shared = SharedConfig::load(store.clone());

        shared.edit(RuleEdit::Add(rule("Notes", "Archive"))).unwrap();
        assert_eq!(shared.snapshot().rules.len(), 1);
        assert_eq!(store.load().rules.len(), 1);

        // Rejected edits leave both copies untouched.
        assert!(shared.edit(RuleEdit::Remove { index: 3 }).is_err());
        assert_eq!(shared.snapshot().rules.len(), 1);
    }
}
