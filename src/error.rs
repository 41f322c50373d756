//! Error type shared by the in-memory store layer.

use thiserror::Error;

/// What kind of key a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Entity,
    Feature,
    Dataset,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyKind::Entity => write!(f, "entity"),
            KeyKind::Feature => write!(f, "feature"),
            KeyKind::Dataset => write!(f, "dataset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{0} is already registered")]
    DuplicateName(String),

    #[error("{kind} not found: {key}")]
    KeyNotFound { kind: KeyKind, key: String },

    #[error("no such feature in this sample store: {0}")]
    UnboundFeature(String),

    #[error("index mismatch: {0}")]
    IndexMismatch(String),

    #[error("duplicate {kind} key: {key}")]
    DuplicateKey { kind: KeyKind, key: String },

    #[error("invalid table: {0}")]
    InvalidTable(String),
}

impl Error {
    pub fn entity_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            kind: KeyKind::Entity,
            key: key.into(),
        }
    }

    pub fn feature_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            kind: KeyKind::Feature,
            key: key.into(),
        }
    }

    pub fn dataset_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            kind: KeyKind::Dataset,
            key: key.into(),
        }
    }

    pub fn index_mismatch(msg: impl Into<String>) -> Self {
        Self::IndexMismatch(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
