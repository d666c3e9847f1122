//! Dispatch over resource kinds.
//!
//! Kinds are processed one after another. A kind whose listing fails is
//! recorded as a failed `FETCH` and the remaining kinds still run.

use shopsync_api::Client;
use shopsync_core::Theme;
use tracing::{info, warn};

use crate::changeset::{Bucket, ChangeId, ChangeSet};
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::kind::ResourceKind;
use crate::kinds::{assets, blogs, menus, pages, tables};
use crate::plan::{Action, BatchReport};

fn need_theme() -> SyncError {
    SyncError::ThemeNotFound {
        selector: "<none>".into(),
    }
}

async fn pull_kind(
    ctx: &SyncContext<'_>,
    theme: Option<&Theme>,
    kind: ResourceKind,
) -> Result<BatchReport, SyncError> {
    match kind {
        ResourceKind::Assets => assets::pull(ctx, theme.ok_or_else(need_theme)?).await,
        ResourceKind::Menus => menus::pull(ctx).await,
        ResourceKind::Pages => pages::pull(ctx).await,
        ResourceKind::Blogs => blogs::pull(ctx).await,
        ResourceKind::Scripts => tables::pull_scripts(ctx).await,
        ResourceKind::Redirects => tables::pull_redirects(ctx).await,
    }
}

async fn push_kind(
    ctx: &SyncContext<'_>,
    theme: Option<&Theme>,
    kind: ResourceKind,
) -> Result<BatchReport, SyncError> {
    match kind {
        ResourceKind::Assets => assets::push(ctx, theme.ok_or_else(need_theme)?).await,
        ResourceKind::Menus => Ok(ctx.report()),
        ResourceKind::Pages => pages::push(ctx).await,
        ResourceKind::Blogs => blogs::push(ctx).await,
        ResourceKind::Scripts => tables::push_scripts(ctx).await,
        ResourceKind::Redirects => tables::push_redirects(ctx).await,
    }
}

/// Bring the local tree in line with the remote for each kind.
pub async fn pull(ctx: &SyncContext<'_>, theme: Option<&Theme>, kinds: &[ResourceKind]) -> BatchReport {
    let mut report = ctx.report();
    for kind in ResourceKind::or_all(kinds) {
        if ctx.options.filter.is_some() && !kind.supports_filter() {
            info!(%kind, "no history for this kind; skipping");
            continue;
        }
        info!(%kind, "pulling");
        match pull_kind(ctx, theme, kind).await {
            Ok(r) => report.merge(r),
            Err(err) => report.record(Action::Fetch, kind.as_str(), Err(err)),
        }
    }
    report
}

/// Bring the remote in line with the local tree for each kind.
pub async fn push(ctx: &SyncContext<'_>, theme: Option<&Theme>, kinds: &[ResourceKind]) -> BatchReport {
    let mut report = ctx.report();
    for kind in ResourceKind::or_all(kinds) {
        if !kind.supports_push() {
            if !kinds.is_empty() {
                warn!(%kind, "cannot be pushed; skipping");
            }
            continue;
        }
        info!(%kind, "pushing");
        match push_kind(ctx, theme, kind).await {
            Ok(r) => report.merge(r),
            Err(err) => report.record(Action::Fetch, kind.as_str(), Err(err)),
        }
    }
    report
}

/// Remote records of one kind, one line each.
pub async fn list(client: &Client, theme: Option<&Theme>, kind: ResourceKind) -> Result<Vec<String>, SyncError> {
    match kind {
        ResourceKind::Assets => assets::list(client, theme.ok_or_else(need_theme)?).await,
        ResourceKind::Menus => menus::list(client).await,
        ResourceKind::Pages => pages::list(client).await,
        ResourceKind::Blogs => blogs::list(client).await,
        ResourceKind::Scripts => tables::list_scripts(client).await,
        ResourceKind::Redirects => tables::list_redirects(client).await,
    }
}

/// Non-asset kinds touched by `bucket`.
fn bucket_kinds(bucket: &Bucket) -> Vec<ResourceKind> {
    let mut kinds: Vec<ResourceKind> = bucket
        .changes
        .iter()
        .filter_map(|change| match change {
            ChangeId::Asset { .. } => None,
            ChangeId::Document(key) if key.starts_with("pages/") => Some(ResourceKind::Pages),
            ChangeId::Document(_) => Some(ResourceKind::Blogs),
            ChangeId::Menu(_) => Some(ResourceKind::Menus),
            ChangeId::Script(_) => Some(ResourceKind::Scripts),
        })
        .collect();
    kinds.sort();
    kinds.dedup();
    kinds
}

/// Pull the state as of the end of `bucket` into the local tree.
///
/// Asset snapshots come from each theme the bucket touched; other kinds are
/// pulled only when the bucket contains changes for them.
pub async fn replay(ctx: &SyncContext<'_>, set: &ChangeSet, bucket: &Bucket, kinds: &[ResourceKind]) -> BatchReport {
    let at = ctx.at(Some(bucket.until));
    let kinds = ResourceKind::or_all(kinds);
    let mut report = at.report();

    if kinds.contains(&ResourceKind::Assets) {
        for theme_id in bucket.replay_themes(&set.target) {
            let theme = set
                .themes
                .iter()
                .find(|t| t.id == theme_id)
                .unwrap_or(&set.target);
            match assets::pull(&at, theme).await {
                Ok(r) => report.merge(r),
                Err(err) => report.record(Action::Fetch, format!("assets of {}", theme.handle), Err(err)),
            }
        }
    }

    let others: Vec<ResourceKind> = bucket_kinds(bucket)
        .into_iter()
        .filter(|k| kinds.contains(k))
        .collect();
    if !others.is_empty() {
        report.merge(pull(&at, None, &others).await);
    }
    report
}
