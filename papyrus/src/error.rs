use thiserror::Error;

#[derive(Error, Debug)]
pub enum PapyrusError {
    /// The store is set up in a way that cannot serve the request: unknown
    /// file, missing primary key, malformed `papyrus.yaml`.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request itself is malformed: bad key type, nested payload,
    /// multi-field condition, unknown sort direction.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl PapyrusError {
    /// True for the error classes that are raised before any I/O and
    /// therefore never leave a partially modified file behind.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PapyrusError::Configuration(_) | PapyrusError::Validation(_)
        )
    }

    /// A fresh copy of a rejection, so a builder can report it on every
    /// `execute`. Other classes are carried over by message.
    pub(crate) fn replay(&self) -> PapyrusError {
        match self {
            PapyrusError::Configuration(msg) => PapyrusError::Configuration(msg.clone()),
            PapyrusError::Validation(msg) => PapyrusError::Validation(msg.clone()),
            other => PapyrusError::Other(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PapyrusError>;
