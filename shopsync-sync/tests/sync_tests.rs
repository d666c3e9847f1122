//! Pull and push against a mock shop.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shopsync_api::{Client, RetryPolicy};
use shopsync_core::{Config, Page, Theme, ThemeRole};
use shopsync_sync::kinds::documents::{sidecar, ARTICLE_STRIP, PAGE_STRIP};
use shopsync_sync::same::md5_hex;
use shopsync_sync::{
    change_sets, pipeline, Action, LocalFileIndex, ResourceKind, SyncContext, SyncOptions, IGNORE_FILE,
};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/admin/api/2024-01";

fn client_for(server: &MockServer) -> Client {
    let mut cfg = Config::for_host(server.uri());
    cfg.access_token = Some("tok".into());
    Client::new(&cfg).expect("client").with_retry(RetryPolicy::immediate(2))
}

fn dawn() -> Theme {
    Theme {
        id: 1,
        name: "Dawn".into(),
        handle: "dawn".into(),
        role: ThemeRole::Main,
        created_at: None,
        updated_at: None,
        theme_store_id: None,
    }
}

fn options() -> SyncOptions {
    SyncOptions::default()
}

fn touch(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

async fn mount_get(server: &MockServer, p: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{API}/{p}")))
        .respond_with(ok(body))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn asset_pull_writes_deletes_and_is_idempotent() {
    let server = MockServer::start().await;
    let html = "<html></html>";
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .and(query_param_is_missing("asset[key]"))
        .respond_with(ok(json!({ "assets": [
            { "key": "layout/theme.liquid", "size": html.len(), "checksum": md5_hex(html.as_bytes()) },
            { "key": "config/settings_data.json", "size": 17, "checksum": "0000" },
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .and(query_param("asset[key]", "layout/theme.liquid"))
        .respond_with(ok(json!({ "asset": { "key": "layout/theme.liquid", "value": html } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .and(query_param("asset[key]", "config/settings_data.json"))
        .respond_with(ok(json!({ "asset": { "key": "config/settings_data.json", "value": "{\"current\":\"/a\"}" } })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "theme/assets/old.js", "gone soon");
    touch(tmp.path(), "theme/assets/local.map", "kept");
    touch(tmp.path(), &format!("theme/{IGNORE_FILE}"), "*.map\n");

    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let theme = dawn();

    let report = pipeline::pull(&ctx, Some(&theme), &[ResourceKind::Assets]).await;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.count(Action::Save), 2);
    assert_eq!(report.count(Action::Delete), 1);

    let root = tmp.path().join("theme");
    assert_eq!(fs::read_to_string(root.join("layout/theme.liquid")).unwrap(), html);
    assert_eq!(
        fs::read_to_string(root.join("config/settings_data.json")).unwrap(),
        "{\n  \"current\": \"/a\"\n}\n"
    );
    assert!(!root.join("assets/old.js").exists());
    assert!(root.join("assets/local.map").exists());

    let again = pipeline::pull(&ctx, Some(&theme), &[ResourceKind::Assets]).await;
    assert!(again.is_empty(), "second pull should be a no-op: {again:?}");
}

#[tokio::test]
async fn asset_push_orders_settings_last() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .respond_with(ok(json!({ "assets": [{ "key": "assets/gone.js", "size": 1 }] })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .respond_with(ok(json!({ "asset": { "key": "x" } })))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .and(query_param("asset[key]", "assets/gone.js"))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "theme/config/settings_data.json", "{}");
    touch(tmp.path(), "theme/config/settings_schema.json", "[]");
    touch(tmp.path(), "theme/assets/a.css", "body{}");
    touch(tmp.path(), "theme/snippets/b.liquid", "{{ x }}");

    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let report = pipeline::push(&ctx, Some(&dawn()), &[ResourceKind::Assets]).await;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.count(Action::Create), 4);
    assert_eq!(report.count(Action::Delete), 1);

    let requests = server.received_requests().await.unwrap();
    let put_keys: Vec<String> = requests
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["asset"]["key"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        put_keys[2..],
        ["config/settings_schema.json".to_string(), "config/settings_data.json".to_string()]
    );
}

#[tokio::test]
async fn dry_run_push_sends_nothing() {
    let server = MockServer::start().await;
    mount_get(&server, "themes/1/assets.json", json!({ "assets": [{ "key": "assets/gone.js" }] })).await;
    Mock::given(method("PUT"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "theme/assets/new.css", "a{}");

    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(
        &client,
        &index,
        tmp.path(),
        SyncOptions {
            dry_run: true,
            ..options()
        },
    );
    let report = pipeline::push(&ctx, Some(&dawn()), &[ResourceKind::Assets]).await;
    assert!(report.dry_run);
    assert_eq!(report.count(Action::Create), 1);
    assert_eq!(report.count(Action::Delete), 1);
}

#[tokio::test]
async fn filtered_pull_fetches_history_and_never_deletes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .and(query_param_is_missing("asset[key]"))
        .respond_with(ok(json!({ "assets": [
            { "key": "assets/a.css", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-03-15T00:00:00Z" },
            { "key": "assets/late.css", "created_at": "2024-04-01T00:00:00Z", "updated_at": "2024-04-01T00:00:00Z" },
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets/versions.json")))
        .and(query_param("asset[key]", "assets/a.css"))
        .respond_with(ok(json!({ "versions": [
            { "version": 1, "created_at": "2024-05-01T00:00:00Z" },
            { "version": 2, "created_at": "2024-02-01T00:00:00Z" },
            { "version": 3, "created_at": "2024-03-15T00:00:00Z" },
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets/versions.json")))
        .and(query_param("asset[key]", "assets/late.css"))
        .respond_with(ok(json!({ "versions": [{ "version": 1, "created_at": "2024-04-01T00:00:00Z" }] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .and(query_param("asset[key]", "assets/a.css"))
        .and(query_param("asset[version]", "2"))
        .respond_with(ok(json!({ "asset": { "key": "assets/a.css", "value": "body{color:red}" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .and(query_param("asset[key]", "assets/late.css"))
        .respond_with(ok(json!({ "asset": { "key": "assets/late.css", "value": "late{}" } })))
        .expect(0)
        .mount(&server)
        .await;

    let mut early = page_json(1, "early", true);
    early["updated_at"] = json!("2024-02-10T00:00:00Z");
    let mut late = page_json(2, "late", true);
    late["updated_at"] = json!("2024-03-20T00:00:00Z");
    mount_get(&server, "pages.json", json!({ "pages": [early, late] })).await;

    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "theme/assets/old.js", "still here");
    touch(tmp.path(), "pages/unrelated.json", "{}");

    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(
        &client,
        &index,
        tmp.path(),
        SyncOptions {
            filter: Some("2024-03-01T00:00:00Z".parse().unwrap()),
            ..options()
        },
    );
    let report = pipeline::pull(&ctx, Some(&dawn()), &[ResourceKind::Assets, ResourceKind::Pages]).await;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.count(Action::Delete), 0);

    let theme_dir = tmp.path().join("theme");
    assert_eq!(fs::read_to_string(theme_dir.join("assets/a.css")).unwrap(), "body{color:red}");
    assert!(!theme_dir.join("assets/late.css").exists());
    assert!(theme_dir.join("assets/old.js").exists());

    let pages = tmp.path().join("pages");
    assert!(pages.join("early.html").exists());
    assert!(!pages.join("late.html").exists());
    assert!(!pages.join("late.json").exists());
    assert!(pages.join("unrelated.json").exists());
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

fn page_json(id: u64, handle: &str, published: bool) -> Value {
    json!({
        "id": id,
        "handle": handle,
        "title": handle,
        "body_html": format!("<p>{handle}</p>"),
        "published_at": if published { json!("2024-03-01T10:00:00Z") } else { Value::Null },
        "shop_id": 99,
        "template_suffix": "",
    })
}

#[tokio::test]
async fn page_pull_writes_sidecars_under_drafts() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "pages.json",
        json!({ "pages": [page_json(1, "about", true), page_json(2, "faq", false)] }),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "pages/stale.json", "{}");
    touch(tmp.path(), "pages/stale.html", "");

    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let report = pipeline::pull(&ctx, None, &[ResourceKind::Pages]).await;
    assert!(report.is_success(), "{report:?}");

    let pages = tmp.path().join("pages");
    assert_eq!(fs::read_to_string(pages.join("about.html")).unwrap(), "<p>about</p>");
    assert_eq!(fs::read_to_string(pages.join("drafts/faq.html")).unwrap(), "<p>faq</p>");
    let sidecar: Value = serde_json::from_str(&fs::read_to_string(pages.join("about.json")).unwrap()).unwrap();
    assert_eq!(sidecar["body_html"], json!({ "file": "about.html" }));
    assert!(sidecar.get("shop_id").is_none());
    assert!(!pages.join("stale.json").exists());
    assert!(!pages.join("stale.html").exists());

    let again = pipeline::pull(&ctx, None, &[ResourceKind::Pages]).await;
    assert!(again.is_empty(), "{again:?}");
}

fn write_page(root: &Path, page: &Page) {
    let (json, html) = sidecar(page, PAGE_STRIP).unwrap();
    let key = page.storage_key();
    touch(root, &format!("pages/{key}.json"), std::str::from_utf8(&json).unwrap());
    touch(root, &format!("pages/{key}.html"), std::str::from_utf8(&html).unwrap());
}

#[tokio::test]
async fn page_push_prefers_published_copy() {
    let server = MockServer::start().await;
    mount_get(&server, "pages.json", json!({ "pages": [page_json(5, "sale", false)] })).await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/pages/5.json")))
        .and(body_partial_json(json!({ "page": { "published": true, "body_html": "<p>live</p>" } })))
        .respond_with(ok(json!({ "page": page_json(5, "sale", true) })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/pages.json")))
        .and(body_partial_json(json!({ "page": { "handle": "new", "published": false } })))
        .respond_with(ok(json!({ "page": page_json(6, "new", false) })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let mut draft: Page = serde_json::from_value(page_json(5, "sale", false)).unwrap();
    write_page(tmp.path(), &draft);
    draft.published_at = Some("2024-03-02T00:00:00Z".parse().unwrap());
    draft.body_html = Some("<p>live</p>".into());
    write_page(tmp.path(), &draft);
    write_page(tmp.path(), &serde_json::from_value(page_json(0, "new", false)).unwrap());

    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let report = pipeline::push(&ctx, None, &[ResourceKind::Pages]).await;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.count(Action::Update), 1);
    assert_eq!(report.count(Action::Create), 1);
    assert_eq!(report.count(Action::Delete), 0);
}

// ---------------------------------------------------------------------------
// Tables and menus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn redirects_round_trip_through_csv() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "redirects.json",
        json!({ "redirects": [
            { "id": 1, "path": "/old", "target": "/new" },
            { "id": 2, "path": "/legacy", "target": "/" },
        ]}),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/redirects/1.json")))
        .and(body_partial_json(json!({ "redirect": { "target": "/newer" } })))
        .respond_with(ok(json!({ "redirect": { "id": 1, "path": "/old", "target": "/newer" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/redirects.json")))
        .respond_with(ok(json!({ "redirect": { "id": 3, "path": "/added", "target": "/x" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/redirects/2.json")))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());

    let pulled = pipeline::pull(&ctx, None, &[ResourceKind::Redirects]).await;
    assert!(pulled.is_success());
    let csv = tmp.path().join("redirects.csv");
    assert_eq!(
        fs::read_to_string(&csv).unwrap(),
        "Redirect from,Redirect to\n/old,/new\n/legacy,/\n"
    );

    fs::write(&csv, "Redirect from,Redirect to\n/old,/newer\n/added,/x\nnot-a-path,/y\n").unwrap();
    let pushed = pipeline::push(&ctx, None, &[ResourceKind::Redirects]).await;
    assert!(pushed.is_success(), "{pushed:?}");
    assert_eq!(pushed.count(Action::Update), 1);
    assert_eq!(pushed.count(Action::Create), 1);
    assert_eq!(pushed.count(Action::Delete), 1);
}

#[tokio::test]
async fn missing_table_skips_push() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok(json!({ "script_tags": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let report = pipeline::push(&ctx, None, &[ResourceKind::Scripts]).await;
    assert!(report.is_empty());
}

#[tokio::test]
async fn scripts_push_creates_updates_and_deletes_by_src() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "script_tags.json",
        json!({ "script_tags": [
            { "id": 1, "src": "https://cdn.example.com/same.js", "event": "onload" },
            { "id": 2, "src": "https://cdn.example.com/changed.js", "event": "onload" },
            { "id": 3, "src": "/gone.js", "event": "onload" },
        ]}),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/script_tags/2.json")))
        .and(body_partial_json(json!({ "script_tag": {
            "src": "https://cdn.example.com/changed.js",
            "event": "onclick",
            "display_scope": "online_store",
        }})))
        .respond_with(ok(json!({ "script_tag": { "id": 2, "src": "https://cdn.example.com/changed.js", "event": "onclick" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/script_tags/1.json")))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/script_tags.json")))
        .and(body_partial_json(json!({ "script_tag": { "src": "/new.js", "event": "onload" } })))
        .respond_with(ok(json!({ "script_tag": { "id": 4, "src": "/new.js", "event": "onload" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/script_tags/3.json")))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    touch(
        tmp.path(),
        "scripts.csv",
        "src,event,scope\n\
         https://cdn.example.com/same.js,onload,\n\
         https://cdn.example.com/changed.js,onclick,online_store\n\
         /new.js,,\n",
    );

    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let report = pipeline::push(&ctx, None, &[ResourceKind::Scripts]).await;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.count(Action::Create), 1);
    assert_eq!(report.count(Action::Update), 1);
    assert_eq!(report.count(Action::Delete), 1);
}

#[tokio::test]
async fn blog_push_creates_missing_blog_before_its_articles() {
    let server = MockServer::start().await;
    mount_get(&server, "blogs.json", json!({ "blogs": [] })).await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/blogs.json")))
        .and(body_partial_json(json!({ "blog": { "handle": "news", "title": "news" } })))
        .respond_with(ok(json!({ "blog": { "id": 5, "handle": "news", "title": "news" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/blogs/5/articles.json")))
        .and(body_partial_json(json!({ "article": { "handle": "hello", "body_html": "<p>hello</p>" } })))
        .respond_with(ok(json!({ "article": page_json(8, "hello", true) })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let article: Page = serde_json::from_value(page_json(0, "hello", true)).unwrap();
    let (json, html) = sidecar(&article, ARTICLE_STRIP).unwrap();
    touch(tmp.path(), "blogs/news/hello.json", std::str::from_utf8(&json).unwrap());
    touch(tmp.path(), "blogs/news/hello.html", std::str::from_utf8(&html).unwrap());

    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let report = pipeline::push(&ctx, None, &[ResourceKind::Blogs]).await;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.count(Action::Create), 2);

    let posts: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(
        posts,
        [format!("{API}/blogs.json"), format!("{API}/blogs/5/articles.json")]
    );
}

#[tokio::test]
async fn menus_pull_as_markdown() {
    let server = MockServer::start().await;
    mount_get(&server, "menus.json", json!({ "menus": [{ "id": 3, "handle": "main-menu" }] })).await;
    mount_get(
        &server,
        "menus/3.json",
        json!({ "menu": { "id": 3, "handle": "main-menu", "title": "Main", "items": [
            { "title": "Home", "type": "frontpage" },
            { "title": "Catalog", "type": "collection", "subject": "all", "items": [
                { "title": "Terms", "type": "shop_policy", "subject": "terms-of-service" }
            ]}
        ]}}),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let report = pipeline::pull(&ctx, None, &[ResourceKind::Menus]).await;
    assert!(report.is_success(), "{report:?}");
    assert_eq!(
        fs::read_to_string(tmp.path().join("menus/main-menu.md")).unwrap(),
        "# Main\n- Home\n- [Catalog](/collections/all)\n  - [Terms](/policies/terms-of-service)\n"
    );
}

#[tokio::test]
async fn failing_kind_does_not_stop_the_rest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/pages.json")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_get(&server, "redirects.json", json!({ "redirects": [] })).await;

    let tmp = TempDir::new().unwrap();
    let client = client_for(&server);
    let index = LocalFileIndex::new();
    let ctx = SyncContext::new(&client, &index, tmp.path(), options());
    let report = pipeline::pull(&ctx, None, &[ResourceKind::Pages, ResourceKind::Redirects]).await;
    assert!(!report.is_success());
    assert_eq!(report.failures().count(), 1);
    assert!(tmp.path().join("redirects.csv").exists());
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_asset_edits_share_one_bucket() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "themes.json",
        json!({ "themes": [{ "id": 1, "name": "Dawn", "role": "main", "created_at": "2024-01-01T00:00:00Z" }] }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .respond_with(ok(json!({ "assets": [
            { "key": "assets/a.css", "updated_at": "2024-02-01T12:00:00Z" },
            { "key": "assets/b.css", "updated_at": "2024-02-01T12:00:30Z" },
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets/versions.json")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let set = change_sets(&client, None, &[ResourceKind::Assets]).await.unwrap();
    assert_eq!(set.target.handle, "dawn");
    assert_eq!(set.buckets.len(), 1);
    let bucket = &set.buckets[0];
    assert_eq!(bucket.changes.len(), 2);
    assert_eq!(bucket.until - bucket.at, chrono::Duration::seconds(30));
}

#[tokio::test]
async fn versions_of_one_key_stay_in_separate_buckets() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "themes.json",
        json!({ "themes": [{ "id": 1, "name": "Dawn", "role": "main", "created_at": "2024-01-01T00:00:00Z" }] }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/themes/1/assets.json")))
        .respond_with(ok(json!({ "assets": [{
            "key": "assets/a.css",
            "created_at": "2024-02-01T12:00:00Z",
            "updated_at": "2024-02-01T12:00:30Z",
        }]})))
        .mount(&server)
        .await;
    mount_get(
        &server,
        "themes/1/assets/versions.json",
        json!({ "versions": [
            { "version": 1, "created_at": "2024-02-01T12:00:00Z" },
            { "version": 2, "created_at": "2024-02-01T12:00:30Z" },
        ]}),
    )
    .await;

    let client = client_for(&server);
    let set = change_sets(&client, None, &[ResourceKind::Assets]).await.unwrap();
    let versions: Vec<Vec<String>> = set
        .buckets
        .iter()
        .map(|b| b.changes.iter().map(ToString::to_string).collect())
        .collect();
    assert_eq!(
        versions,
        [vec!["1~dawn~assets/a.css@1".to_string()], vec!["1~dawn~assets/a.css@2".to_string()]]
    );
}
