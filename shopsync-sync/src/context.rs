//! Per-invocation sync state.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use shopsync_api::Client;

use crate::index::LocalFileIndex;
use crate::plan::BatchReport;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Transfer everything, skipping the same-content check.
    pub force: bool,
    /// Compute and report, but never write locally or send changes.
    pub dry_run: bool,
    /// Only consider state as of this instant; disables deletions.
    pub filter: Option<DateTime<Utc>>,
}

/// Everything a pull or push needs: the remote, the local root and options.
#[derive(Debug, Clone)]
pub struct SyncContext<'a> {
    pub client: &'a Client,
    pub index: &'a LocalFileIndex,
    pub root: PathBuf,
    pub options: SyncOptions,
}

impl<'a> SyncContext<'a> {
    pub fn new(
        client: &'a Client,
        index: &'a LocalFileIndex,
        root: impl Into<PathBuf>,
        options: SyncOptions,
    ) -> Self {
        Self {
            client,
            index,
            root: root.into(),
            options,
        }
    }

    /// Same context with a different time filter.
    pub fn at(&self, filter: Option<DateTime<Utc>>) -> Self {
        let mut ctx = self.clone();
        ctx.options.filter = filter;
        ctx
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn report(&self) -> BatchReport {
        BatchReport::new(self.options.dry_run)
    }

    /// Whether a record last updated at `updated_at` passes the time filter.
    pub fn included(&self, updated_at: Option<DateTime<Utc>>) -> bool {
        match self.options.filter {
            None => true,
            Some(at) => updated_at.is_some_and(|t| t <= at),
        }
    }

    /// Writes are unconditional when forced.
    pub fn write(&self, path: &Path, content: &[u8]) -> Result<crate::writer::WriteResult, crate::SyncError> {
        if self.options.force {
            crate::writer::write_file(path, content, self.options.dry_run)
        } else {
            crate::writer::write_if_changed(path, content, self.options.dry_run)
        }
    }
}
