//! `shopsync init <theme>`: rebuild a theme's history as git commits.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use tracing::warn;

use shopsync_sync::{change_sets, pipeline, ChangeSet, ResourceKind, SyncOptions};

use super::{git, print_report, Globals};

/// Arguments for `shopsync init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Theme whose history is reconstructed.
    pub theme: String,

    /// Print each change set with its number of changes.
    #[arg(long, conflicts_with = "details")]
    pub simple: bool,

    /// Print every change in every change set.
    #[arg(long)]
    pub details: bool,

    /// Only print the change sets; do not replay them into git.
    #[arg(long)]
    pub no_git: bool,
}

fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn print_change_sets(set: &ChangeSet, simple: bool, details: bool) {
    for bucket in &set.buckets {
        if details {
            println!("{}", stamp(bucket.at));
            for change in &bucket.changes {
                println!("  {change}");
            }
        } else if simple {
            println!("{} ({})", stamp(bucket.at), bucket.changes.len());
        }
    }
    println!("{} change set(s)", set.buckets.len());
}

impl InitArgs {
    pub async fn run(self, globals: &Globals) -> Result<()> {
        let session = globals.session()?;
        let kinds = ResourceKind::ALL;

        println!("Initializing local environment...");
        let set = change_sets(&session.client, Some(self.theme.as_str()), &kinds)
            .await
            .with_context(|| format!("failed to reconstruct history of '{}'", self.theme))?;

        println!("Calculating change sets:");
        print_change_sets(&set, self.simple, self.details);

        if self.no_git {
            return Ok(());
        }
        std::fs::create_dir_all(&session.root)
            .with_context(|| format!("failed to create {}", session.root.display()))?;
        if !git::is_work_tree(&session.root) {
            println!(
                "{} is not inside a git work tree; skipping replay",
                session.root.display()
            );
            return Ok(());
        }

        let ctx = session.context(SyncOptions::default());
        for bucket in &set.buckets {
            let report = pipeline::replay(&ctx, &set, bucket, &kinds).await;
            print_report(&report);
            commit(&session.root, Some(bucket.until));
        }

        let report = pipeline::pull(&ctx, Some(&set.target), &kinds).await;
        print_report(&report);
        commit(&session.root, None);
        Ok(())
    }
}

/// Commit the tree as of `at` (now when absent). Failures only warn.
fn commit(root: &Path, at: Option<DateTime<Utc>>) {
    let message = format!("Sync with Shopify @ {}", stamp(at.unwrap_or_else(Utc::now)));
    if let Err(err) = git::commit(root, &message, at) {
        warn!(error = %err, "git commit failed");
    }
}
