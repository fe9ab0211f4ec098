use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("storage quota exceeded: {needed} bytes requested, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why persisted state was discarded in favour of the catalog.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("persisted state unreadable: {0}")]
    Unreadable(#[from] StoreError),

    #[error("persisted state is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("persisted state does not have the threat record shape")]
    SchemaMismatch,

    #[error("persisted state references unknown threat {0:?}")]
    UnknownThreat(String),

    #[error("persisted state lists threat {0:?} more than once")]
    DuplicateThreat(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate threat id {0:?}")]
    DuplicateId(String),

    #[error("threat {threat:?} references unknown architecture node {node:?}")]
    UnknownComponent { threat: String, node: String },
}
