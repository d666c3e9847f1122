//! `shopsync push`: send local changes up to the store.

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use shopsync_core::{Theme, ThemeRole};
use shopsync_sync::{pipeline, BatchReport, ResourceKind, SyncOptions};

use super::{finish, Globals, Session};

/// Arguments for `shopsync push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Kinds to push (assets, pages, blogs, scripts, redirects). Defaults to all.
    #[arg(value_name = "KIND")]
    pub kinds: Vec<ResourceKind>,

    /// Theme to push assets to; created when it does not exist yet.
    #[arg(long)]
    pub theme: Option<String>,

    /// Upload every file even when the remote copy looks current.
    #[arg(long)]
    pub force: bool,

    /// Report what would change without sending anything.
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

impl PushArgs {
    pub async fn run(self, globals: &Globals) -> Result<()> {
        let session = globals.session()?;
        // Menus are pull-only; drop them silently unless asked for by name.
        let mut kinds: Vec<ResourceKind> = ResourceKind::or_all(&self.kinds)
            .into_iter()
            .filter(|k| k.supports_push() || !self.kinds.is_empty())
            .collect();

        let theme = match &self.theme {
            _ if !kinds.contains(&ResourceKind::Assets) => None,
            Some(name) => find_or_create(&session, name, self.dry_run).await?,
            None => Some(session.theme(None).await?),
        };
        if theme.is_none() && kinds.contains(&ResourceKind::Assets) {
            warn!("theme does not exist yet; skipping assets in a dry run");
            kinds.retain(|k| *k != ResourceKind::Assets);
            if kinds.is_empty() {
                return finish(&BatchReport::new(self.dry_run));
            }
        }

        let ctx = session.context(SyncOptions {
            force: self.force,
            dry_run: self.dry_run,
            filter: None,
        });
        let report = pipeline::push(&ctx, theme.as_ref(), &kinds).await;
        finish(&report)
    }
}

/// The named theme, created as unpublished when missing. A dry run never
/// creates anything, so it yields `None` for a missing theme.
async fn find_or_create(session: &Session, name: &str, dry_run: bool) -> Result<Option<Theme>> {
    let existing = session
        .client
        .find_theme(Some(name))
        .await
        .context("failed to list themes")?;
    if existing.is_some() {
        return Ok(existing);
    }
    if dry_run {
        println!("[dry-run] CREATE theme {name}");
        return Ok(None);
    }
    let created = session
        .client
        .create_theme(name, ThemeRole::Unpublished, None)
        .await
        .with_context(|| format!("failed to create theme '{name}'"))?
        .with_context(|| format!("store returned no theme after creating '{name}'"))?;
    println!("CREATE theme {}", created.handle);
    Ok(Some(created))
}
