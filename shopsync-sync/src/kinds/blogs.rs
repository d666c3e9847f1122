//! Blogs and their articles under `<root>/blogs/<blog handle>/`.
//!
//! Only blogs with a local directory are pushed. A blog missing remotely is
//! created first; remote blogs are never deleted.

use std::collections::{BTreeSet, HashMap};

use shopsync_api::Client;
use shopsync_core::{Blog, ResourceId};

use crate::context::SyncContext;
use crate::error::{io_err, SyncError};
use crate::kinds::documents::{self, DocumentPlan, ARTICLE_STRIP};
use crate::plan::{Action, BatchReport};

pub const BLOGS_DIR: &str = "blogs";

fn missing(what: String) -> SyncError {
    SyncError::MissingRecord { what }
}

pub async fn pull(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let mut report = ctx.report();
    for blog in ctx.client.list_blogs().await? {
        let articles = ctx.client.list_articles(blog.id).await?;
        report.merge(documents::pull_documents(
            ctx,
            &blog.storage_key(),
            &articles,
            ARTICLE_STRIP,
        )?);
    }
    Ok(report)
}

/// Blog handles with a directory under `<root>/blogs`.
fn local_blogs(ctx: &SyncContext<'_>) -> Result<BTreeSet<String>, SyncError> {
    let dir = ctx.root.join(BLOGS_DIR);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(err) => return Err(io_err(&dir, err)),
    };
    let mut handles = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        if entry.path().is_dir() {
            handles.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(handles)
}

pub async fn push(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let remote: HashMap<String, Blog> = ctx
        .client
        .list_blogs()
        .await?
        .into_iter()
        .map(|b| (b.handle.clone(), b))
        .collect();

    let mut report = ctx.report();
    for handle in local_blogs(ctx)? {
        let dir_key = format!("{BLOGS_DIR}/{handle}");
        let (blog_id, articles) = match remote.get(&handle) {
            Some(blog) => (Some(blog.id), ctx.client.list_articles(blog.id).await?),
            None if ctx.options.dry_run => {
                report.record(Action::Create, dir_key.clone(), Ok(()));
                (None, Vec::new())
            }
            None => match ctx.client.create_blog(&handle, &handle).await {
                Ok(Some(blog)) => {
                    report.record(Action::Create, dir_key.clone(), Ok(()));
                    (Some(blog.id), Vec::new())
                }
                Ok(None) => {
                    report.record(Action::Create, dir_key, Err(missing(format!("blog {handle}"))));
                    continue;
                }
                Err(err) => {
                    report.record(Action::Create, dir_key, Err(err.into()));
                    continue;
                }
            },
        };

        let local = documents::local_keys(ctx, &dir_key)?;
        let plan = documents::plan_push(&ctx.root.join(&dir_key), &local, &articles, ctx.options.force)?;
        report.merge(send_articles(ctx, &dir_key, blog_id, plan).await);
    }
    Ok(report)
}

async fn send_articles(
    ctx: &SyncContext<'_>,
    dir_key: &str,
    blog_id: Option<ResourceId>,
    plan: DocumentPlan,
) -> BatchReport {
    let dry_run = ctx.options.dry_run;
    let target = |key: &str| format!("{dir_key}/{key}.html");
    let blog = || blog_id.ok_or_else(|| missing(format!("blog id for {dir_key}")));

    let mut report = ctx.report();
    report
        .run(
            Action::Create,
            plan.creates.iter().map(|change| {
                (target(&change.key), async move {
                    if !dry_run {
                        ctx.client.create_article(blog()?, &change.doc).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    report
        .run(
            Action::Update,
            plan.updates.iter().map(|change| {
                (target(&change.key), async move {
                    if !dry_run {
                        let id = change
                            .doc
                            .id
                            .ok_or_else(|| missing(format!("id of article {}", change.doc.handle)))?;
                        ctx.client.update_article(blog()?, id, &change.doc).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    report
        .run(
            Action::Delete,
            plan.deletes.iter().map(|article| {
                (target(&article.storage_key()), async move {
                    if !dry_run {
                        let id = article
                            .id
                            .ok_or_else(|| missing(format!("id of article {}", article.handle)))?;
                        ctx.client.delete_article(blog()?, id).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    report
}

pub async fn list(client: &Client) -> Result<Vec<String>, SyncError> {
    let mut lines = Vec::new();
    for blog in client.list_blogs().await? {
        for article in client.list_articles(blog.id).await? {
            lines.push(format!("{}/{}.html", blog.storage_key(), article.storage_key()));
        }
    }
    Ok(lines)
}
