//! Error types for shopsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use shopsync_api::ApiError;

/// All errors that can arise from reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed after the client's own retries.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local JSON file could not be parsed or a record could not be encoded.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A local CSV table could not be read or written.
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A `.shopifyignore` line is not a valid glob.
    #[error("invalid ignore pattern in {path}: {source}")]
    Ignore {
        path: PathBuf,
        #[source]
        source: globset::Error,
    },

    /// Walking a local directory failed.
    #[error("failed to scan {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// No remote theme matches the selector.
    #[error("theme not found: {selector}")]
    ThemeNotFound { selector: String },

    /// The remote answered a create with no record.
    #[error("remote returned no record for {what}")]
    MissingRecord { what: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn json_err(path: impl Into<PathBuf>, source: serde_json::Error) -> SyncError {
    SyncError::Json {
        path: path.into(),
        source,
    }
}

pub(crate) fn csv_err(path: impl Into<PathBuf>, source: csv::Error) -> SyncError {
    SyncError::Csv {
        path: path.into(),
        source,
    }
}
