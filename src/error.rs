use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised while loading or persisting the catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog {path:?} is not a valid broadcast document: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {action} catalog {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fatal errors that abort an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read CSV {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV {path:?} has no {column:?} column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Why a single CSV row did not become a catalog entry. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("malformed row: {0}")]
    MalformedRow(String),

    #[error("duplicate CID {0}")]
    DuplicateIdentifier(String),

    #[error("unreachable CID {0}")]
    UnreachableIdentifier(String),
}

impl SkipReason {
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::MalformedRow(_) => "malformed",
            SkipReason::DuplicateIdentifier(_) => "duplicate",
            SkipReason::UnreachableIdentifier(_) => "unreachable",
        }
    }
}
