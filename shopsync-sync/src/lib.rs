//! shopsync-sync: two-way reconciliation between a local tree and a store.
//!
//! - [`index`]: local file listing with `.shopifyignore`
//! - [`same`]: the same-content predicate
//! - [`writer`]: atomic local writes
//! - [`plan`]: concurrent batches and the [`BatchReport`]
//! - [`kinds`]: pull/push per resource kind
//! - [`changeset`]: edit history as time buckets
//! - [`pipeline`]: dispatch over kinds, and history replay

pub mod changeset;
pub mod context;
pub mod error;
pub mod index;
pub mod kind;
pub mod kinds;
pub mod pipeline;
pub mod plan;
pub mod same;
pub mod writer;

pub use changeset::{change_sets, Bucket, ChangeId, ChangeSet};
pub use context::{SyncContext, SyncOptions};
pub use error::SyncError;
pub use index::{LocalFileIndex, IGNORE_FILE};
pub use kind::ResourceKind;
pub use kinds::assets::{THEME_DIR, THEME_DIRS};
pub use plan::{Action, BatchReport, Outcome};
pub use writer::WriteResult;
