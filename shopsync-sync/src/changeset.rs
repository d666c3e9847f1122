//! Reconstructing a store's edit history as time-ordered buckets.
//!
//! Every timestamped change (asset versions, page and article updates, menu
//! and script updates) becomes a [`ChangeId`] in a bucket keyed by its time.
//! Buckets within [`MERGE_WINDOW`] of each other merge as long as no key is
//! edited twice, so each bucket can be replayed as one snapshot.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shopsync_api::Client;
use shopsync_core::{Asset, ResourceId, Theme};
use tracing::{debug, info};

use crate::error::SyncError;
use crate::kind::ResourceKind;
use crate::kinds::{menus, pages};

/// Adjacent buckets closer than this merge.
pub const MERGE_WINDOW: Duration = Duration::from_secs(60);

/// One recorded change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeId {
    Asset {
        theme_id: ResourceId,
        theme_handle: String,
        key: String,
        version: Option<u32>,
    },
    /// A page or article body, e.g. `pages/about.html`.
    Document(String),
    /// A menu, e.g. `menus/main-menu`.
    Menu(String),
    /// A script tag, by `src`.
    Script(String),
}

impl ChangeId {
    /// The identity used for conflict checks: theme and version stripped.
    pub fn cleaned(&self) -> String {
        match self {
            ChangeId::Asset { key, .. } => key.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeId::Asset {
                theme_id,
                theme_handle,
                key,
                version,
            } => {
                write!(f, "{theme_id}~{theme_handle}~{key}")?;
                if let Some(v) = version {
                    write!(f, "@{v}")?;
                }
                Ok(())
            }
            ChangeId::Document(key) | ChangeId::Menu(key) => f.write_str(key),
            ChangeId::Script(src) => write!(f, "script:{src}"),
        }
    }
}

/// Changes that happened together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub at: DateTime<Utc>,
    /// Latest time folded into this bucket; replay snapshots here.
    pub until: DateTime<Utc>,
    pub changes: Vec<ChangeId>,
}

impl Bucket {
    /// Themes whose assets must be pulled to replay this bucket into `target`.
    ///
    /// A related theme counts when it shares the target's handle or when the
    /// bucket predates the target itself.
    pub fn replay_themes(&self, target: &Theme) -> BTreeSet<ResourceId> {
        let before_target = target.created_at.is_some_and(|c| self.at < c);
        self.changes
            .iter()
            .filter_map(|change| match change {
                ChangeId::Asset {
                    theme_id,
                    theme_handle,
                    ..
                } if *theme_handle == target.handle || before_target => Some(*theme_id),
                _ => None,
            })
            .collect()
    }

    pub fn has_assets(&self) -> bool {
        self.changes.iter().any(|c| matches!(c, ChangeId::Asset { .. }))
    }
}

/// The target theme, the related themes and the merged history.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub target: Theme,
    pub themes: Vec<Theme>,
    pub buckets: Vec<Bucket>,
}

/// One theme with its asset listing (including version history).
#[derive(Debug, Clone)]
pub struct ThemeAssets {
    pub theme: Theme,
    pub assets: Vec<Asset>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Whether `theme` may have contributed to `target`'s history: the target
/// itself, or an older theme from the same store listing.
pub fn is_candidate(theme: &Theme, target: &Theme) -> bool {
    theme.id == target.id
        || (theme.theme_store_id == target.theme_store_id
            && theme.created_at.unwrap_or_default() <= target.created_at.unwrap_or_default())
}

/// Drop everything from a related theme that postdates the target. Version 1
/// always survives; an asset left with no versions at all is dropped.
pub fn prune(mut related: ThemeAssets, target: &Theme) -> ThemeAssets {
    if related.theme.id == target.id {
        return related;
    }
    let limit = target.created_at.unwrap_or_default();
    related.assets.retain_mut(|asset| {
        if !asset.created_at.is_some_and(|c| c <= limit) {
            return false;
        }
        if asset.versions.is_empty() {
            return true;
        }
        asset
            .versions
            .retain(|v| v.version == 1 || v.created_at.is_some_and(|c| c <= limit));
        !asset.versions.is_empty()
    });
    related
}

/// Record every asset version of `themes` at its effective time.
pub fn add_assets(raw: &mut BTreeMap<DateTime<Utc>, Vec<ChangeId>>, themes: &[ThemeAssets]) {
    for entry in themes {
        for asset in &entry.assets {
            let change = |version| ChangeId::Asset {
                theme_id: entry.theme.id,
                theme_handle: entry.theme.handle.clone(),
                key: asset.key.clone(),
                version,
            };
            if asset.versions.is_empty() {
                raw.entry(asset.updated_at.unwrap_or_else(epoch))
                    .or_default()
                    .push(change(None));
            }
            for version in &asset.versions {
                let at = asset.version_created_at(version).unwrap_or_else(epoch);
                raw.entry(at).or_default().push(change(Some(version.version)));
            }
        }
    }
}

/// Fold time-sorted buckets together.
///
/// A bucket joins the previous surviving one when it starts within
/// [`MERGE_WINDOW`] of that bucket's latest change and touches no key
/// already in it.
pub fn merge(raw: BTreeMap<DateTime<Utc>, Vec<ChangeId>>) -> Vec<Bucket> {
    let window = chrono::Duration::from_std(MERGE_WINDOW).unwrap_or_else(|_| chrono::Duration::zero());
    let mut merged: Vec<(Bucket, HashSet<String>)> = Vec::new();
    for (at, changes) in raw {
        let cleaned: HashSet<String> = changes.iter().map(ChangeId::cleaned).collect();
        if let Some((last, seen)) = merged.last_mut() {
            if at - last.until <= window && seen.is_disjoint(&cleaned) {
                last.until = at;
                last.changes.extend(changes);
                seen.extend(cleaned);
                continue;
            }
        }
        merged.push((
            Bucket {
                at,
                until: at,
                changes,
            },
            cleaned,
        ));
    }
    merged.into_iter().map(|(bucket, _)| bucket).collect()
}

/// Build the change set for the theme chosen by `selector`.
pub async fn change_sets(
    client: &Client,
    selector: Option<&str>,
    kinds: &[ResourceKind],
) -> Result<ChangeSet, SyncError> {
    let themes = client.list_themes().await?;
    let target = themes
        .iter()
        .find(|t| t.matches(selector))
        .cloned()
        .ok_or_else(|| SyncError::ThemeNotFound {
            selector: selector.unwrap_or("<published>").to_string(),
        })?;

    let mut raw: BTreeMap<DateTime<Utc>, Vec<ChangeId>> = BTreeMap::new();
    let mut related = Vec::new();

    if kinds.contains(&ResourceKind::Assets) {
        for theme in themes.iter().filter(|t| is_candidate(t, &target)) {
            info!(theme = %theme.handle, "reading asset history");
            let assets = client.list_assets_with_versions(theme.id).await?;
            let entry = prune(
                ThemeAssets {
                    theme: theme.clone(),
                    assets,
                },
                &target,
            );
            if entry.assets.is_empty() {
                debug!(theme = %theme.handle, "no assets predate the target");
                continue;
            }
            related.push(entry);
        }
        add_assets(&mut raw, &related);
    }

    if kinds.contains(&ResourceKind::Pages) {
        for page in client.list_pages().await? {
            let at = page.updated_at.unwrap_or_else(epoch);
            raw.entry(at).or_default().push(ChangeId::Document(format!(
                "{}/{}.html",
                pages::PAGES_DIR,
                page.storage_key()
            )));
        }
    }

    if kinds.contains(&ResourceKind::Blogs) {
        for blog in client.list_blogs().await? {
            for article in client.list_articles(blog.id).await? {
                let at = article.updated_at.unwrap_or_else(epoch);
                raw.entry(at).or_default().push(ChangeId::Document(format!(
                    "{}/{}.html",
                    blog.storage_key(),
                    article.storage_key()
                )));
            }
        }
    }

    if kinds.contains(&ResourceKind::Menus) {
        for menu in menus::list_menus(client).await? {
            let at = menu.updated_at.unwrap_or_else(epoch);
            raw.entry(at).or_default().push(ChangeId::Menu(menu.storage_key()));
        }
    }

    if kinds.contains(&ResourceKind::Scripts) {
        for tag in client.list_script_tags().await? {
            let at = tag.updated_at.unwrap_or_else(epoch);
            raw.entry(at).or_default().push(ChangeId::Script(tag.src));
        }
    }

    let buckets = merge(raw);
    info!(target = %target.handle, buckets = buckets.len(), "history collected");
    Ok(ChangeSet {
        target,
        themes: related.into_iter().map(|r| r.theme).collect(),
        buckets,
    })
}
