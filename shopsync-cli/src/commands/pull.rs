//! `shopsync pull`: bring remote state into the output directory.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;

use shopsync_sync::{pipeline, ResourceKind, SyncOptions};

use super::{finish, Globals};

/// Arguments for `shopsync pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Kinds to pull (assets, menus, pages, blogs, scripts, redirects). Defaults to all.
    #[arg(value_name = "KIND")]
    pub kinds: Vec<ResourceKind>,

    /// Theme to pull assets from (defaults to the published theme).
    #[arg(long)]
    pub theme: Option<String>,

    /// Download every file even when the local copy looks current.
    #[arg(long)]
    pub force: bool,

    /// Report what would change without writing anything.
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Only pull what existed at this RFC 3339 timestamp.
    #[arg(long, value_name = "TIMESTAMP")]
    pub filter_created: Option<DateTime<Utc>>,
}

impl PullArgs {
    pub async fn run(self, globals: &Globals) -> Result<()> {
        let session = globals.session()?;
        let kinds = ResourceKind::or_all(&self.kinds);
        let theme = if kinds.contains(&ResourceKind::Assets) {
            Some(session.theme(self.theme.as_deref()).await?)
        } else {
            None
        };

        let ctx = session.context(SyncOptions {
            force: self.force,
            dry_run: self.dry_run,
            filter: self.filter_created,
        });
        let report = pipeline::pull(&ctx, theme.as_ref(), &kinds).await;
        finish(&report)
    }
}
