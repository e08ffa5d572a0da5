//! Typed errors for store and split operations.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A context names a cluster or user that the document does not define.
    #[error("context '{context}' references unknown {kind} '{name}'")]
    MissingReference {
        context: String,
        kind: ReferenceKind,
        name: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid key component '{value}': {reason}")]
    InvalidKey { value: String, reason: &'static str },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("serialize document: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Cluster,
    User,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Cluster => write!(f, "cluster"),
            ReferenceKind::User => write!(f, "user"),
        }
    }
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        StoreError::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
