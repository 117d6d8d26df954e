use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("classroom capacity must be greater than zero")]
    ZeroCapacity,
    #[error("invalid time slot range '{start}' .. '{end}'")]
    InvalidSlotRange { start: String, end: String },
}

/// A rejected write. The previously persisted value is left untouched.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file format: '{0}'")]
    UnsupportedFormat(String),
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid value for '{key}': {reason}")]
    InvalidField { key: String, reason: String },
    #[error("expected {expected}, found {found}")]
    WrongShape {
        expected: &'static str,
        found: &'static str,
    },
    #[error("duplicate id '{id}' in {collection}")]
    DuplicateId { collection: &'static str, id: String },
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
    #[error("schedule was exported for class '{source_label}', importing into '{target_class}' needs confirmation")]
    ConfirmationRequired {
        source_label: String,
        target_class: String,
    },
    #[error("no target class selected")]
    NoTargetClass,
    #[error("failed to read '{path}': {reason}")]
    Read { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid value for {key}: '{value}'")]
    InvalidOverride { key: &'static str, value: String },
}
