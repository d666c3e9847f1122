//! Redirects and script tags as CSV tables at the local root.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use shopsync_api::Client;
use shopsync_core::{Redirect, ScriptTag};
use tracing::warn;

use crate::context::SyncContext;
use crate::error::{csv_err, SyncError};
use crate::plan::{Action, BatchReport};

pub const REDIRECTS_FILE: &str = "redirects.csv";
pub const SCRIPTS_FILE: &str = "scripts.csv";

const REDIRECTS_HEADER: [&str; 2] = ["Redirect from", "Redirect to"];
const SCRIPTS_HEADER: [&str; 3] = ["src", "event", "scope"];

fn to_csv<const N: usize>(path: &Path, header: [&str; N], rows: Vec<[String; N]>) -> Result<Vec<u8>, SyncError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header).map_err(|e| csv_err(path, e))?;
    for row in rows {
        writer.write_record(&row).map_err(|e| csv_err(path, e))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv_err(path, csv::Error::from(e.into_error())))
}

/// Data rows of the table at `path`, or `None` when the file is absent.
fn read_rows(path: &Path) -> Result<Option<Vec<Vec<String>>>, SyncError> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_err(path, e))?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_err(path, e))?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(Some(rows))
}

fn cell(row: &[String], i: usize) -> String {
    row.get(i).cloned().unwrap_or_default()
}

// -- redirects ---------------------------------------------------------------

pub fn redirects_csv(path: &Path, redirects: &[Redirect]) -> Result<Vec<u8>, SyncError> {
    let rows = redirects
        .iter()
        .map(|r| [r.path.clone(), r.target.clone()])
        .collect();
    to_csv(path, REDIRECTS_HEADER, rows)
}

/// Rows whose source is not an absolute path or whose target is empty are
/// skipped, as are repeats of an earlier source.
pub fn read_redirects(path: &Path) -> Result<Option<Vec<Redirect>>, SyncError> {
    let Some(rows) = read_rows(path)? else {
        return Ok(None);
    };
    let mut seen = BTreeSet::new();
    let mut redirects = Vec::new();
    for row in rows {
        let (from, to) = (cell(&row, 0), cell(&row, 1));
        if !from.starts_with('/') || to.is_empty() {
            warn!(path = %path.display(), from = %from, "skipping invalid redirect row");
            continue;
        }
        if !seen.insert(from.clone()) {
            warn!(path = %path.display(), from = %from, "duplicate redirect row");
            continue;
        }
        redirects.push(Redirect {
            id: None,
            path: from,
            target: to,
        });
    }
    Ok(Some(redirects))
}

pub async fn pull_redirects(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let mut report = ctx.report();
    if ctx.options.filter.is_some() {
        warn!("redirects have no history; skipping");
        return Ok(report);
    }
    let path = ctx.root.join(REDIRECTS_FILE);
    let redirects = ctx.client.list_redirects().await?;
    let csv = redirects_csv(&path, &redirects)?;
    report.record_write(Action::Save, REDIRECTS_FILE, ctx.write(&path, &csv));
    Ok(report)
}

pub async fn push_redirects(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let mut report = ctx.report();
    let path = ctx.root.join(REDIRECTS_FILE);
    let Some(local) = read_redirects(&path)? else {
        warn!(path = %path.display(), "no redirects table; skipping");
        return Ok(report);
    };

    let mut remote: HashMap<String, Redirect> = ctx
        .client
        .list_redirects()
        .await?
        .into_iter()
        .map(|r| (r.path.clone(), r))
        .collect();
    let mut creates = Vec::new();
    let mut updates = Vec::new();
    for row in local {
        match remote.remove(&row.path) {
            Some(existing) if ctx.options.force || existing.target != row.target => {
                updates.push(Redirect { id: existing.id, ..row });
            }
            Some(_) => {}
            None => creates.push(row),
        }
    }
    let mut deletes: Vec<Redirect> = remote.into_values().collect();
    deletes.sort_by(|a, b| a.path.cmp(&b.path));

    let dry_run = ctx.options.dry_run;
    let missing = |r: &Redirect| SyncError::MissingRecord {
        what: format!("id of redirect {}", r.path),
    };
    report
        .run(
            Action::Create,
            creates.iter().map(|r| {
                (r.path.clone(), async move {
                    if !dry_run {
                        ctx.client.create_redirect(r).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    report
        .run(
            Action::Update,
            updates.iter().map(|r| {
                (r.path.clone(), async move {
                    if !dry_run {
                        ctx.client.update_redirect(r.id.ok_or_else(|| missing(r))?, r).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    report
        .run(
            Action::Delete,
            deletes.iter().map(|r| {
                (r.path.clone(), async move {
                    if !dry_run {
                        ctx.client.delete_redirect(r.id.ok_or_else(|| missing(r))?).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    Ok(report)
}

pub async fn list_redirects(client: &Client) -> Result<Vec<String>, SyncError> {
    Ok(client
        .list_redirects()
        .await?
        .iter()
        .map(|r| format!("{} (302) => {}", r.path, r.target))
        .collect())
}

// -- script tags -------------------------------------------------------------

pub fn scripts_csv(path: &Path, tags: &[ScriptTag]) -> Result<Vec<u8>, SyncError> {
    let rows = tags
        .iter()
        .map(|t| {
            [
                t.src.clone(),
                t.event.clone(),
                t.display_scope.clone().unwrap_or_default(),
            ]
        })
        .collect();
    to_csv(path, SCRIPTS_HEADER, rows)
}

/// Rows whose `src` is not a URL or path are skipped. An empty scope means
/// the remote default.
pub fn read_scripts(path: &Path) -> Result<Option<Vec<ScriptTag>>, SyncError> {
    let Some(rows) = read_rows(path)? else {
        return Ok(None);
    };
    let mut seen = BTreeSet::new();
    let mut tags = Vec::new();
    for row in rows {
        let src = cell(&row, 0);
        if !src.contains('/') {
            warn!(path = %path.display(), src = %src, "skipping invalid script row");
            continue;
        }
        if !seen.insert(src.clone()) {
            warn!(path = %path.display(), src = %src, "duplicate script row");
            continue;
        }
        let event = cell(&row, 1);
        let scope = cell(&row, 2);
        tags.push(ScriptTag {
            id: None,
            src,
            event: if event.is_empty() { "onload".into() } else { event },
            display_scope: (!scope.is_empty()).then_some(scope),
            updated_at: None,
        });
    }
    Ok(Some(tags))
}

pub async fn pull_scripts(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let path = ctx.root.join(SCRIPTS_FILE);
    let tags: Vec<ScriptTag> = ctx
        .client
        .list_script_tags()
        .await?
        .into_iter()
        .filter(|t| ctx.included(t.updated_at))
        .collect();
    let csv = scripts_csv(&path, &tags)?;
    let mut report = ctx.report();
    report.record_write(Action::Save, SCRIPTS_FILE, ctx.write(&path, &csv));
    Ok(report)
}

fn same_script(a: &ScriptTag, b: &ScriptTag) -> bool {
    let scope = |t: &ScriptTag| t.display_scope.clone().filter(|s| !s.is_empty());
    a.event == b.event && scope(a) == scope(b)
}

pub async fn push_scripts(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let mut report = ctx.report();
    let path = ctx.root.join(SCRIPTS_FILE);
    let Some(local) = read_scripts(&path)? else {
        warn!(path = %path.display(), "no scripts table; skipping");
        return Ok(report);
    };

    let mut remote: HashMap<String, ScriptTag> = ctx
        .client
        .list_script_tags()
        .await?
        .into_iter()
        .map(|t| (t.src.clone(), t))
        .collect();
    let mut creates = Vec::new();
    let mut updates = Vec::new();
    for row in local {
        match remote.remove(&row.src) {
            Some(existing) if ctx.options.force || !same_script(&existing, &row) => {
                updates.push(ScriptTag { id: existing.id, ..row });
            }
            Some(_) => {}
            None => creates.push(row),
        }
    }
    let mut deletes: Vec<ScriptTag> = remote.into_values().collect();
    deletes.sort_by(|a, b| a.src.cmp(&b.src));

    let dry_run = ctx.options.dry_run;
    let missing = |t: &ScriptTag| SyncError::MissingRecord {
        what: format!("id of script {}", t.src),
    };
    report
        .run(
            Action::Create,
            creates.iter().map(|t| {
                (t.src.clone(), async move {
                    if !dry_run {
                        ctx.client.create_script_tag(t).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    report
        .run(
            Action::Update,
            updates.iter().map(|t| {
                (t.src.clone(), async move {
                    if !dry_run {
                        ctx.client.update_script_tag(t.id.ok_or_else(|| missing(t))?, t).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    report
        .run(
            Action::Delete,
            deletes.iter().map(|t| {
                (t.src.clone(), async move {
                    if !dry_run {
                        ctx.client.delete_script_tag(t.id.ok_or_else(|| missing(t))?).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    Ok(report)
}

pub async fn list_scripts(client: &Client) -> Result<Vec<String>, SyncError> {
    Ok(client
        .list_script_tags()
        .await?
        .iter()
        .map(|t| format!("<script src=\"{}\"></script>", t.src))
        .collect())
}
