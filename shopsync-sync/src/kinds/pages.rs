//! Content pages under `<root>/pages/`.

use shopsync_api::Client;

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::kinds::documents::{self, PAGE_STRIP};
use crate::plan::{Action, BatchReport};

pub const PAGES_DIR: &str = "pages";

fn missing_id(handle: &str) -> SyncError {
    SyncError::MissingRecord {
        what: format!("id of page {handle}"),
    }
}

pub async fn pull(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let pages = ctx.client.list_pages().await?;
    documents::pull_documents(ctx, PAGES_DIR, &pages, PAGE_STRIP)
}

pub async fn push(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let remote = ctx.client.list_pages().await?;
    let local = documents::local_keys(ctx, PAGES_DIR)?;
    let plan = documents::plan_push(&ctx.root.join(PAGES_DIR), &local, &remote, ctx.options.force)?;
    let dry_run = ctx.options.dry_run;
    let target = |key: &str| format!("{PAGES_DIR}/{key}.html");

    let mut report = ctx.report();
    report
        .run(
            Action::Create,
            plan.creates.iter().map(|change| {
                (target(&change.key), async move {
                    if !dry_run {
                        ctx.client.create_page(&change.doc).await?;
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
                        let id = change.doc.id.ok_or_else(|| missing_id(&change.doc.handle))?;
                        ctx.client.update_page(id, &change.doc).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    report
        .run(
            Action::Delete,
            plan.deletes.iter().map(|page| {
                (target(&page.storage_key()), async move {
                    if !dry_run {
                        let id = page.id.ok_or_else(|| missing_id(&page.handle))?;
                        ctx.client.delete_page(id).await?;
                    }
                    Ok(())
                })
            }),
        )
        .await;
    Ok(report)
}

pub async fn list(client: &Client) -> Result<Vec<String>, SyncError> {
    Ok(client
        .list_pages()
        .await?
        .iter()
        .map(|p| format!("{PAGES_DIR}/{}.html", p.storage_key()))
        .collect())
}
