//! Navigation menus, pulled as markdown link lists under `<root>/menus/`.

use std::collections::HashMap;

use futures::future::join_all;
use shopsync_api::{ApiError, Client};
use shopsync_core::{Menu, MenuItem, ResourceId};
use tracing::warn;

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::plan::{Action, BatchReport};
use crate::writer::remove_file;

pub const MENUS_DIR: &str = "menus";

/// Maps article ids to the handle of the blog that holds them.
pub type ArticleBlogs = HashMap<ResourceId, String>;

/// Menus, or nothing when the credentials may not read them.
pub async fn list_menus(client: &Client) -> Result<Vec<Menu>, SyncError> {
    match client.list_menus().await {
        Ok(menus) => Ok(menus),
        Err(err) if is_forbidden(&err) => {
            warn!(error = %err, "menus are not readable with these credentials; skipping");
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}

fn is_forbidden(err: &ApiError) -> bool {
    err.status().is_some_and(|s| matches!(s.as_u16(), 401 | 403))
}

fn uses_articles(items: &[MenuItem]) -> bool {
    items
        .iter()
        .any(|item| item.kind == "article" || uses_articles(&item.children))
}

async fn article_blogs(client: &Client) -> Result<ArticleBlogs, SyncError> {
    let mut map = ArticleBlogs::new();
    for blog in client.list_blogs().await? {
        for article in client.list_articles(blog.id).await? {
            if let Some(id) = article.id {
                map.insert(id, blog.handle.clone());
            }
        }
    }
    Ok(map)
}

fn is_url(subject: &str) -> bool {
    let rest = subject
        .strip_prefix("https:")
        .or_else(|| subject.strip_prefix("http:"))
        .or_else(|| subject.strip_prefix("mailto:"))
        .unwrap_or(subject);
    rest.starts_with('/')
}

/// Link target of a menu entry, or `None` when it cannot be resolved.
pub fn menu_url(item: &MenuItem, blogs: &ArticleBlogs) -> Option<String> {
    let subject = item.subject.as_deref().filter(|s| !s.is_empty())?;
    if is_url(subject) {
        return Some(subject.to_string());
    }
    match item.kind.as_str() {
        "blog" | "collection" | "page" | "product" => Some(format!("/{}s/{subject}", item.kind)),
        "shop_policy" => Some(format!("/policies/{subject}")),
        "article" => {
            let blog = blogs.get(&item.subject_id?)?;
            Some(format!("/blogs/{blog}/{subject}"))
        }
        _ => None,
    }
}

fn render_items(out: &mut String, items: &[MenuItem], depth: usize, blogs: &ArticleBlogs) {
    for item in items {
        out.push_str(&"  ".repeat(depth));
        match menu_url(item, blogs) {
            Some(url) => out.push_str(&format!("- [{}]({url})\n", item.title)),
            None => out.push_str(&format!("- {}\n", item.title)),
        }
        render_items(out, &item.children, depth + 1, blogs);
    }
}

/// Markdown for a menu: a `# title` heading, then one list entry per item
/// with nested entries indented by two spaces per level.
pub fn render_menu(menu: &Menu, blogs: &ArticleBlogs) -> String {
    let title = menu.title.as_deref().unwrap_or(&menu.handle);
    let mut out = format!("# {title}\n");
    render_items(&mut out, &menu.items, 0, blogs);
    out
}

pub async fn pull(ctx: &SyncContext<'_>) -> Result<BatchReport, SyncError> {
    let dir = ctx.root.join(MENUS_DIR);
    let summaries: Vec<Menu> = list_menus(ctx.client)
        .await?
        .into_iter()
        .filter(|m| ctx.included(m.updated_at))
        .collect();

    let details = join_all(summaries.iter().map(|m| ctx.client.get_menu(m.id))).await;
    let mut menus = Vec::with_capacity(summaries.len());
    let mut report = ctx.report();
    for (summary, detail) in summaries.into_iter().zip(details) {
        match detail {
            Ok(Some(menu)) => menus.push(menu),
            Ok(None) => menus.push(summary),
            Err(err) => report.record(Action::Fetch, summary.storage_key(), Err(err.into())),
        }
    }

    let blogs = if menus.iter().any(|m| uses_articles(&m.items)) {
        article_blogs(ctx.client).await?
    } else {
        ArticleBlogs::new()
    };

    let mut stale = ctx.index.list_files(&dir, &[""])?;
    for menu in &menus {
        let name = format!("{}.md", menu.handle);
        stale.remove(&name);
        let path = dir.join(&name);
        let markdown = render_menu(menu, &blogs);
        report.record_write(Action::Save, format!("{MENUS_DIR}/{name}"), ctx.write(&path, markdown.as_bytes()));
    }

    if ctx.options.filter.is_none() {
        for name in stale.into_iter().filter(|n| n.ends_with(".md")) {
            report.record_write(
                Action::Delete,
                format!("{MENUS_DIR}/{name}"),
                remove_file(&dir.join(&name), ctx.options.dry_run),
            );
        }
    }
    Ok(report)
}

pub async fn list(client: &Client) -> Result<Vec<String>, SyncError> {
    Ok(list_menus(client)
        .await?
        .iter()
        .map(Menu::storage_key)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(title: &str, kind: &str, subject: Option<&str>, children: Vec<MenuItem>) -> MenuItem {
        MenuItem {
            title: title.into(),
            kind: kind.into(),
            subject: subject.map(str::to_owned),
            subject_id: None,
            children,
        }
    }

    #[test]
    fn urls_by_item_type() {
        let blogs = ArticleBlogs::from([(77, "news".to_string())]);
        let mut article = item("Launch", "article", Some("launch"), vec![]);
        article.subject_id = Some(77);

        assert_eq!(menu_url(&item("Hats", "collection", Some("hats"), vec![]), &blogs).as_deref(), Some("/collections/hats"));
        assert_eq!(menu_url(&item("Refunds", "shop_policy", Some("refund-policy"), vec![]), &blogs).as_deref(), Some("/policies/refund-policy"));
        assert_eq!(menu_url(&item("Ext", "http", Some("https://example.com/x"), vec![]), &blogs).as_deref(), Some("https://example.com/x"));
        assert_eq!(menu_url(&item("Mail", "http", Some("mailto:/a"), vec![]), &blogs).as_deref(), Some("mailto:/a"));
        assert_eq!(menu_url(&article, &blogs).as_deref(), Some("/blogs/news/launch"));
        assert_eq!(menu_url(&item("Search", "search", Some("q"), vec![]), &blogs), None);
        assert_eq!(menu_url(&item("Home", "frontpage", None, vec![]), &blogs), None);

        article.subject_id = Some(1);
        assert_eq!(menu_url(&article, &blogs), None);
    }

    #[test]
    fn renders_nested_markdown() {
        let menu = Menu {
            id: 1,
            handle: "main-menu".into(),
            title: Some("Main".into()),
            updated_at: None,
            items: vec![
                item("Home", "frontpage", None, vec![]),
                item(
                    "Shop",
                    "collection",
                    Some("all"),
                    vec![item("Hats", "http", Some("/collections/hats"), vec![])],
                ),
            ],
        };
        assert_eq!(
            render_menu(&menu, &ArticleBlogs::new()),
            "# Main\n- Home\n- [Shop](/collections/all)\n  - [Hats](/collections/hats)\n"
        );
    }

    #[test]
    fn article_lookup_only_when_needed() {
        let nested = vec![item("A", "link", None, vec![item("B", "article", Some("b"), vec![])])];
        assert!(uses_articles(&nested));
        assert!(!uses_articles(&[item("A", "page", Some("a"), vec![])]));
    }
}
