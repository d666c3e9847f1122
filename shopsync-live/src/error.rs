use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the live sync watcher.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("sync error: {0}")]
    Sync(#[from] shopsync_sync::SyncError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LiveError {
    LiveError::Io {
        path: path.into(),
        source,
    }
}
