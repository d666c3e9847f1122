//! Batch execution and reporting.
//!
//! Creates, updates and deletes of one kind each run as a concurrent batch on
//! the current task. Every action runs to completion; failures are recorded
//! in the [`BatchReport`] rather than cancelling their siblings.

use std::fmt;
use std::future::Future;

use futures::future::join_all;
use tracing::{error, info};

use crate::error::SyncError;
use crate::writer::WriteResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Reading the remote or local state for a whole kind.
    Fetch,
    Save,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Fetch => "FETCH",
            Action::Save => "SAVING",
            Action::Create => "CREATE",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        })
    }
}

/// One attempted action and how it ended.
#[derive(Debug)]
pub struct Outcome {
    pub action: Action,
    pub target: String,
    pub error: Option<SyncError>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub dry_run: bool,
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, action: Action, target: impl Into<String>, result: Result<(), SyncError>) {
        let target = target.into();
        match &result {
            Ok(()) => info!(%action, %target, dry_run = self.dry_run, "done"),
            Err(err) => error!(%action, %target, error = %err, "failed"),
        }
        self.outcomes.push(Outcome {
            action,
            target,
            error: result.err(),
        });
    }

    /// Record a local write, ignoring unchanged files.
    pub fn record_write(&mut self, action: Action, target: impl Into<String>, result: Result<WriteResult, SyncError>) {
        match result {
            Ok(write) if !write.is_change() => {}
            Ok(_) => self.record(action, target, Ok(())),
            Err(err) => self.record(action, target, Err(err)),
        }
    }

    /// Run every `(target, future)` concurrently and record each result.
    pub async fn run<I, Fut>(&mut self, action: Action, batch: I)
    where
        I: IntoIterator<Item = (String, Fut)>,
        Fut: Future<Output = Result<(), SyncError>>,
    {
        let (targets, futures): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
        let results = join_all(futures).await;
        for (target, result) in targets.into_iter().zip(results) {
            self.record(action, target, result);
        }
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.outcomes.extend(other.outcomes);
    }

    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn boom() -> SyncError {
        SyncError::MissingRecord { what: "x".into() }
    }

    #[tokio::test]
    async fn one_failure_does_not_cancel_siblings() {
        let mut report = BatchReport::new(false);
        type Job = std::pin::Pin<Box<dyn Future<Output = Result<(), SyncError>>>>;
        let batch: Vec<(String, Job)> = vec![
            ("a".to_string(), Box::pin(async { Ok(()) })),
            ("b".to_string(), Box::pin(async { Err(boom()) })),
            ("c".to_string(), Box::pin(async { Ok(()) })),
        ];
        report.run(Action::Update, batch).await;

        assert_eq!(report.count(Action::Update), 3);
        let failed: Vec<_> = report.failures().map(|o| o.target.as_str()).collect();
        assert_eq!(failed, ["b"]);
        assert!(!report.is_success());
    }

    #[test]
    fn unchanged_writes_are_not_recorded() {
        let mut report = BatchReport::new(false);
        report.record_write(
            Action::Save,
            "menus/main.md",
            Ok(WriteResult::Unchanged { path: PathBuf::from("menus/main.md") }),
        );
        assert!(report.is_empty());
        report.record_write(
            Action::Save,
            "menus/main.md",
            Ok(WriteResult::Written { path: PathBuf::from("menus/main.md") }),
        );
        assert_eq!(report.count(Action::Save), 1);
        assert!(report.is_success());
    }

    #[test]
    fn actions_render_as_log_verbs() {
        assert_eq!(Action::Save.to_string(), "SAVING");
        assert_eq!(Action::Delete.to_string(), "DELETE");
    }
}
