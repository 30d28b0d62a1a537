use thiserror::Error;

/// Failures reported by a [`crate::vault::Vault`].
#[derive(Error, Debug)]
pub enum VaultError {
    /// The target path is already occupied. Copy and folder creation races
    /// land here and are not escalated by the archiver.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Folder not empty: {0}")]
    NotEmpty(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl VaultError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, VaultError::AlreadyExists(_))
    }
}

/// Failures of a single archival step.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("{path} is not inside source folder {source_folder}")]
    OutsideSource { path: String, source_folder: String },

    /// Copy failed for something other than an occupied destination.
    /// The source file is left in place.
    #[error("Failed to copy {path} to {destination}: {source}")]
    Copy {
        path: String,
        destination: String,
        #[source]
        source: VaultError,
    },

    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Failures reading or writing the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid encoding: {0}")]
    Encoding(String),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No rule at index {0}")]
    RuleNotFound(usize),
}
