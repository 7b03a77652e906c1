use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::GoodId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed sale record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
    #[error("good {good} is not present in the goods dictionary")]
    InvalidSelection { good: GoodId },
    #[error("transaction #{index} is out of range (corpus holds {len})")]
    UnknownTransaction { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not decode `{path}`: {source}")]
    Decode { path: PathBuf, source: serde_json::Error },
    #[error("could not encode `{path}`: {source}")]
    Encode { path: PathBuf, source: serde_json::Error },
    #[error("`{path}` is inconsistent: {message}")]
    Inconsistent { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl ApplicationError {
    /// Stable machine-readable class reported by the CLI.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::MalformedRecord { .. }) => "malformed_record",
            Self::Domain(DomainError::InvalidSelection { .. }) => "invalid_selection",
            Self::Domain(DomainError::UnknownTransaction { .. }) => "unknown_transaction",
            Self::Artifact(_) => "artifact",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Domain(DomainError::MalformedRecord { .. }) => 3,
            Self::Domain(_) => 4,
            Self::Artifact(_) => 5,
        }
    }
}
