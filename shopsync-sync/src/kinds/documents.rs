//! Pages and blog articles as `<key>.html` bodies with `<key>.json` sidecars.
//!
//! Published records live at `<dir>/<handle>`, unpublished ones at
//! `<dir>/drafts/<handle>`. The sidecar carries every field except the
//! identifiers, with `body_html` replaced by `{"file": "<handle>.html"}`
//! pointing at the body next to it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::{json, Value};
use shopsync_core::{handle_name, Page};

use crate::context::SyncContext;
use crate::error::{io_err, json_err, SyncError};
use crate::plan::{Action, BatchReport};
use crate::writer::remove_file;

/// Fields left out of page sidecars.
pub const PAGE_STRIP: &[&str] = &["id", "key", "handle", "shop_id", "admin_graphql_api_id"];

/// Fields left out of article sidecars.
pub const ARTICLE_STRIP: &[&str] = &["id", "key", "handle", "shop_id", "admin_graphql_api_id", "blog_id"];

/// Fields that never count as a content difference.
const VOLATILE: &[&str] = &[
    "id",
    "key",
    "handle",
    "shop_id",
    "admin_graphql_api_id",
    "blog_id",
    "published_at",
    "created_at",
    "updated_at",
    "deleted_at",
];

const DRAFTS: &str = "drafts/";

/// Sidecar JSON and HTML body for `doc`.
pub fn sidecar(doc: &Page, strip: &[&str]) -> serde_json::Result<(Vec<u8>, Vec<u8>)> {
    let mut value = serde_json::to_value(doc)?;
    if let Some(map) = value.as_object_mut() {
        for key in strip {
            map.remove(*key);
        }
        map.remove("published");
        map.insert("body_html".into(), json!({ "file": format!("{}.html", doc.handle) }));
    }
    let mut json = serde_json::to_vec_pretty(&value)?;
    json.push(b'\n');
    let html = doc.body_html.clone().unwrap_or_default().into_bytes();
    Ok((json, html))
}

/// Read `<dir>/<key>.json` and resolve its body reference. `None` if absent.
pub fn read_document(dir: &Path, key: &str) -> Result<Option<Page>, SyncError> {
    let path = dir.join(format!("{key}.json"));
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(&path, err)),
    };
    let mut value: Value = serde_json::from_str(&text).map_err(|e| json_err(&path, e))?;

    let body_file = value
        .get("body_html")
        .and_then(|b| b.get("file"))
        .and_then(Value::as_str)
        .map(str::to_owned);
    if let (Some(file), Some(map)) = (body_file, value.as_object_mut()) {
        let body_path = path.parent().unwrap_or(dir).join(file);
        match std::fs::read_to_string(&body_path) {
            Ok(body) => {
                map.insert("body_html".into(), Value::String(body));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                map.remove("body_html");
            }
            Err(err) => return Err(io_err(&body_path, err)),
        }
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| json_err(&path, e))
}

/// Storage keys of every local sidecar under `<root>/<dir_key>`.
pub fn local_keys(ctx: &SyncContext<'_>, dir_key: &str) -> Result<BTreeSet<String>, SyncError> {
    let prefix = format!("{dir_key}/");
    Ok(ctx
        .index
        .list_files(&ctx.root, &[dir_key])?
        .into_iter()
        .filter_map(|rel| {
            rel.strip_prefix(&prefix)?
                .strip_suffix(".json")
                .map(str::to_owned)
        })
        .collect())
}

/// Write every included document under `<root>/<dir_key>` and remove local
/// pairs with no remote counterpart (unless a time filter is set).
pub fn pull_documents(
    ctx: &SyncContext<'_>,
    dir_key: &str,
    docs: &[Page],
    strip: &[&str],
) -> Result<BatchReport, SyncError> {
    let dir = ctx.root.join(dir_key);
    let prefix = format!("{dir_key}/");
    let mut stale: BTreeSet<String> = ctx
        .index
        .list_files(&ctx.root, &[dir_key])?
        .into_iter()
        .filter_map(|rel| rel.strip_prefix(&prefix).map(str::to_owned))
        .collect();

    let mut report = ctx.report();
    for doc in docs.iter().filter(|d| ctx.included(d.updated_at)) {
        let key = doc.storage_key();
        let json_key = format!("{key}.json");
        let html_key = format!("{key}.html");
        stale.remove(&json_key);
        stale.remove(&html_key);

        let (json, html) = sidecar(doc, strip).map_err(|e| json_err(dir.join(&json_key), e))?;
        let result = ctx.write(&dir.join(&json_key), &json).and_then(|json_write| {
            let html_write = ctx.write(&dir.join(&html_key), &html)?;
            Ok(if json_write.is_change() { json_write } else { html_write })
        });
        report.record_write(Action::Save, format!("{dir_key}/{html_key}"), result);
    }

    if ctx.options.filter.is_none() {
        for rel in stale {
            report.record_write(
                Action::Delete,
                format!("{dir_key}/{rel}"),
                remove_file(&dir.join(&rel), ctx.options.dry_run),
            );
        }
    }
    Ok(report)
}

/// A document to send, with the local key it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub key: String,
    pub doc: Page,
}

#[derive(Debug, Default, PartialEq)]
pub struct DocumentPlan {
    pub creates: Vec<DocumentChange>,
    pub updates: Vec<DocumentChange>,
    pub deletes: Vec<Page>,
}

fn comparable(doc: &Page) -> Value {
    let mut value = serde_json::to_value(doc).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        for key in VOLATILE {
            map.remove(*key);
        }
        let published = doc.published.unwrap_or(doc.published_at.is_some());
        map.insert("published".into(), Value::Bool(published));
    }
    value
}

/// Reconcile local keys under `dir` against the remote records.
///
/// When both `<handle>` and `drafts/<handle>` exist locally the published
/// one wins. Remote records with neither are deleted.
pub fn plan_push(
    dir: &Path,
    local: &BTreeSet<String>,
    remote: &[Page],
    force: bool,
) -> Result<DocumentPlan, SyncError> {
    let mut pending = local.clone();
    let mut plan = DocumentPlan::default();

    for current in remote {
        let handle = current.handle.as_str();
        let draft = format!("{DRAFTS}{handle}");
        let published = pending.contains(handle);
        if !published && !pending.contains(&draft) {
            plan.deletes.push(current.clone());
            continue;
        }
        let key = if published { handle.to_string() } else { draft.clone() };
        pending.remove(handle);
        pending.remove(&draft);

        let Some(mut doc) = read_document(dir, &key)? else {
            continue;
        };
        doc.id = current.id;
        doc.handle = handle.to_string();
        doc.set_published(published);
        if force || comparable(&doc) != comparable(current) {
            plan.updates.push(DocumentChange { key, doc });
        }
    }

    let mut creates: BTreeMap<String, (String, bool)> = BTreeMap::new();
    for key in pending {
        let (name, published) = match key.strip_prefix(DRAFTS) {
            Some(name) => (name.to_string(), false),
            None => (key.clone(), true),
        };
        let entry = creates.entry(handle_name(&name)).or_insert((key.clone(), published));
        if published && !entry.1 {
            *entry = (key, true);
        }
    }
    for (handle, (key, published)) in creates {
        let Some(mut doc) = read_document(dir, &key)? else {
            continue;
        };
        doc.id = None;
        doc.handle = handle;
        doc.set_published(published);
        plan.creates.push(DocumentChange { key, doc });
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn page(id: u64, handle: &str, published: bool) -> Page {
        Page {
            id: Some(id),
            handle: handle.into(),
            title: Some(handle.to_uppercase()),
            body_html: Some(format!("<p>{handle}</p>")),
            published_at: published.then(|| Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            ..Default::default()
        }
    }

    fn write_local(dir: &Path, doc: &Page) {
        let key = doc.storage_key();
        let (json, html) = sidecar(doc, PAGE_STRIP).unwrap();
        let json_path = dir.join(format!("{key}.json"));
        fs::create_dir_all(json_path.parent().unwrap()).unwrap();
        fs::write(json_path, json).unwrap();
        fs::write(dir.join(format!("{key}.html")), html).unwrap();
    }

    #[test]
    fn sidecar_strips_ids_and_points_at_body() {
        let mut doc = page(5, "about", true);
        doc.extra.insert("admin_graphql_api_id".into(), json!("gid://x"));
        doc.extra.insert("template_suffix".into(), json!("wide"));
        let (json, html) = sidecar(&doc, PAGE_STRIP).unwrap();
        let value: Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["body_html"], json!({ "file": "about.html" }));
        assert_eq!(value["template_suffix"], json!("wide"));
        assert!(value.get("id").is_none());
        assert!(value.get("handle").is_none());
        assert!(value.get("admin_graphql_api_id").is_none());
        assert_eq!(html, b"<p>about</p>");
    }

    #[test]
    fn read_document_resolves_body_file() {
        let tmp = TempDir::new().unwrap();
        let doc = page(1, "faq", false);
        write_local(tmp.path(), &doc);
        let back = read_document(tmp.path(), "drafts/faq").unwrap().unwrap();
        assert_eq!(back.body_html.as_deref(), Some("<p>faq</p>"));
        assert_eq!(back.title.as_deref(), Some("FAQ"));
        assert!(read_document(tmp.path(), "missing").unwrap().is_none());
    }

    #[test]
    fn unchanged_local_copy_plans_nothing() {
        let tmp = TempDir::new().unwrap();
        let remote = vec![page(1, "about", true), page(2, "faq", false)];
        for doc in &remote {
            write_local(tmp.path(), doc);
        }
        let local: BTreeSet<String> = ["about".into(), "drafts/faq".into()].into();
        let plan = plan_push(tmp.path(), &local, &remote, false).unwrap();
        assert_eq!(plan, DocumentPlan::default());

        let forced = plan_push(tmp.path(), &local, &remote, true).unwrap();
        assert_eq!(forced.updates.len(), 2);
    }

    #[test]
    fn published_copy_wins_over_draft() {
        let tmp = TempDir::new().unwrap();
        let remote = vec![page(1, "sale", false)];
        write_local(tmp.path(), &page(1, "sale", false));
        write_local(tmp.path(), &page(1, "sale", true));
        let local: BTreeSet<String> = ["sale".into(), "drafts/sale".into()].into();

        let plan = plan_push(tmp.path(), &local, &remote, false).unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].key, "sale");
        assert_eq!(plan.updates[0].doc.published, Some(true));
        assert!(plan.creates.is_empty());
    }

    #[test]
    fn new_and_removed_documents() {
        let tmp = TempDir::new().unwrap();
        write_local(tmp.path(), &page(9, "new", false));
        let local: BTreeSet<String> = ["drafts/new".into()].into();
        let remote = vec![page(3, "gone", true)];

        let plan = plan_push(tmp.path(), &local, &remote, false).unwrap();
        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.creates.len(), 1);
        let created = &plan.creates[0].doc;
        assert_eq!(created.id, None);
        assert_eq!(created.handle, "new");
        assert_eq!(created.published, Some(false));
    }
}
