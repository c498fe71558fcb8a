use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfError {
    #[error("Failed to read config file {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("line {line}: could not parse `{text}`")]
    Parse { line: usize, text: String },

    #[error("[{group}] group missing from file")]
    MissingGroup { group: String },

    #[error("[{group}] missing key `{key}`")]
    MissingKey { group: String, key: String },

    #[error("[{group}] {key}: expected {expected}, got `{value}`")]
    WrongType { group: String, key: String, expected: &'static str, value: String },

    #[error("unknown duration unit `{0}`")]
    UnknownUnit(String),
}

impl ConfError {
    /// Whether the error stops the whole file from being used.
    /// Only unreadable or unparsable files are fatal; field-level errors are not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfError::Io { .. } | ConfError::Parse { .. })
    }
}

pub type ConfResult<T> = Result<T, ConfError>;
