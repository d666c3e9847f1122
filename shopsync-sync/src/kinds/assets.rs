//! Theme assets under `<root>/theme/`.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use shopsync_api::{AssetPayload, Client};
use shopsync_core::{Asset, ResourceId, Theme};
use tracing::debug;

use crate::context::SyncContext;
use crate::error::{io_err, SyncError};
use crate::plan::{Action, BatchReport};
use crate::same::{canonical_json, is_asset_same};
use crate::writer::{remove_file, write_file};

/// Local directory holding the theme files.
pub const THEME_DIR: &str = "theme";

/// Top-level theme directories that are synchronized.
pub const THEME_DIRS: [&str; 7] = [
    "assets", "layout", "sections", "templates", "config", "locales", "snippets",
];

/// Keys uploaded one at a time, in this order, after every other upload.
/// Settings data is validated against the schema, so the schema goes first.
pub const ORDERED_UPLOADS: [&str; 2] = ["config/settings_schema.json", "config/settings_data.json"];

/// Assets that existed at `at`, each paired with the version to fetch.
///
/// Without a time every asset is kept at its current version. With one, an
/// asset is kept when some version predates `at` or, lacking history, when it
/// was last updated by then.
pub fn select_at(assets: Vec<Asset>, at: Option<DateTime<Utc>>) -> Vec<(Asset, Option<u32>)> {
    let Some(at) = at else {
        return assets.into_iter().map(|a| (a, None)).collect();
    };
    assets
        .into_iter()
        .filter_map(|asset| match asset.version_at(at) {
            Some(version) => Some((asset, Some(version))),
            None if asset.updated_at.is_some_and(|t| t <= at) => Some((asset, None)),
            None => None,
        })
        .collect()
}

pub async fn pull(ctx: &SyncContext<'_>, theme: &Theme) -> Result<BatchReport, SyncError> {
    let options = &ctx.options;
    let dir = ctx.root.join(THEME_DIR);
    let assets = if options.filter.is_some() {
        ctx.client.list_assets_with_versions(theme.id).await?
    } else {
        ctx.client.list_assets(theme.id).await?
    };

    let mut stale = ctx.index.list_files(&dir, &THEME_DIRS)?;
    let mut fetch = Vec::new();
    for (asset, version) in select_at(assets, options.filter) {
        stale.remove(&asset.key);
        if ctx.index.is_ignored(&dir, &asset.key)? {
            continue;
        }
        let path = dir.join(&asset.key);
        let same = !options.force
            && version.is_none()
            && is_asset_same(&path, asset.checksum.as_deref(), asset.updated_at, asset.size)?;
        if same {
            debug!(key = %asset.key, "up to date");
        } else {
            fetch.push((asset, version));
        }
    }

    let mut report = ctx.report();
    report
        .run(
            Action::Save,
            fetch.into_iter().map(|(asset, version)| {
                let path = dir.join(&asset.key);
                (asset.key.clone(), async move {
                    save_asset(ctx, theme.id, &asset, version, &path).await
                })
            }),
        )
        .await;

    if options.filter.is_none() {
        for key in stale {
            report.record_write(Action::Delete, key.clone(), remove_file(&dir.join(&key), options.dry_run));
        }
    }
    Ok(report)
}

async fn save_asset(
    ctx: &SyncContext<'_>,
    theme_id: ResourceId,
    asset: &Asset,
    version: Option<u32>,
    path: &Path,
) -> Result<(), SyncError> {
    if ctx.options.dry_run {
        return Ok(());
    }
    let bytes = ctx
        .client
        .download_asset(theme_id, asset, version)
        .await?
        .ok_or_else(|| SyncError::MissingRecord {
            what: format!("asset {}", asset.key),
        })?;
    let bytes = if asset.key.ends_with(".json") {
        canonical_json(&bytes).unwrap_or(bytes)
    } else {
        bytes
    };
    write_file(path, &bytes, false)?;
    Ok(())
}

/// What a push has to send.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AssetPushPlan {
    pub creates: Vec<String>,
    pub updates: Vec<String>,
    pub deletes: Vec<String>,
}

impl AssetPushPlan {
    /// Split uploads into the concurrent batch and the ordered tail.
    fn take_ordered(list: &mut Vec<String>) -> Vec<String> {
        let ordered: Vec<String> = list
            .iter()
            .filter(|k| ORDERED_UPLOADS.contains(&k.as_str()))
            .cloned()
            .collect();
        list.retain(|k| !ORDERED_UPLOADS.contains(&k.as_str()));
        ordered
    }
}

/// Compare local files under `dir` with the remote listing.
///
/// Ignored keys are neither uploaded nor deleted remotely.
pub fn plan_push(
    ctx: &SyncContext<'_>,
    dir: &Path,
    remote: &[Asset],
    local: &BTreeSet<String>,
) -> Result<AssetPushPlan, SyncError> {
    let mut plan = AssetPushPlan::default();
    let mut seen = BTreeSet::new();
    for asset in remote {
        seen.insert(asset.key.as_str());
        if local.contains(&asset.key) {
            let path = dir.join(&asset.key);
            if ctx.options.force
                || !is_asset_same(&path, asset.checksum.as_deref(), asset.updated_at, asset.size)?
            {
                plan.updates.push(asset.key.clone());
            }
        } else if !ctx.index.is_ignored(dir, &asset.key)? {
            plan.deletes.push(asset.key.clone());
        }
    }
    plan.creates = local
        .iter()
        .filter(|key| !seen.contains(key.as_str()))
        .cloned()
        .collect();
    Ok(plan)
}

/// Upload one local file.
pub async fn upload(client: &Client, theme_id: ResourceId, dir: &Path, key: &str) -> Result<(), SyncError> {
    let path = dir.join(key);
    let bytes = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
    client
        .put_asset(theme_id, key, &AssetPayload::from_bytes(bytes))
        .await?;
    Ok(())
}

pub async fn push(ctx: &SyncContext<'_>, theme: &Theme) -> Result<BatchReport, SyncError> {
    let dir = ctx.root.join(THEME_DIR);
    let remote = ctx.client.list_assets(theme.id).await?;
    let local = ctx.index.list_files(&dir, &THEME_DIRS)?;
    let mut plan = plan_push(ctx, &dir, &remote, &local)?;
    let dry_run = ctx.options.dry_run;

    let send = |key: String| {
        let dir = dir.as_path();
        async move {
            if dry_run {
                return Ok(());
            }
            upload(ctx.client, theme.id, dir, &key).await
        }
    };

    let ordered_creates = AssetPushPlan::take_ordered(&mut plan.creates);
    let ordered_updates = AssetPushPlan::take_ordered(&mut plan.updates);

    let mut report = ctx.report();
    report
        .run(Action::Create, plan.creates.iter().map(|k| (k.clone(), send(k.clone()))))
        .await;
    report
        .run(Action::Update, plan.updates.iter().map(|k| (k.clone(), send(k.clone()))))
        .await;

    for key in ORDERED_UPLOADS {
        let action = if ordered_creates.iter().any(|k| k == key) {
            Action::Create
        } else if ordered_updates.iter().any(|k| k == key) {
            Action::Update
        } else {
            continue;
        };
        let result = send(key.to_string()).await;
        report.record(action, key, result);
    }

    report
        .run(
            Action::Delete,
            plan.deletes.iter().map(|key| {
                (key.clone(), async move {
                    if dry_run {
                        return Ok(());
                    }
                    ctx.client.delete_asset(theme.id, key).await?;
                    Ok(())
                })
            }),
        )
        .await;
    Ok(report)
}

/// Remote keys, one per line.
pub async fn list(client: &Client, theme: &Theme) -> Result<Vec<String>, SyncError> {
    Ok(client
        .list_assets(theme.id)
        .await?
        .into_iter()
        .map(|a| a.key)
        .collect())
}
