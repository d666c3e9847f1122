//! Typed accessors for every remote resource kind.
//!
//! Collections are paged 250 records at a time using `since_id`, which the
//! API treats as "records with an id strictly greater than this".

use std::collections::BTreeSet;

use base64::Engine;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use shopsync_core::{
    Article, Asset, AssetVersion, Blog, Menu, Page, Redirect, ResourceId, ScriptTag, Theme,
    ThemeRole,
};
use tracing::{debug, warn};

use crate::client::{Body, Client};
use crate::error::{decode_err, ApiError};

/// Records per page; a shorter page means the collection is exhausted.
pub const PAGE_SIZE: usize = 250;

/// Content to upload for an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPayload {
    Text(String),
    Binary(Vec<u8>),
}

impl AssetPayload {
    /// Text when the bytes are valid UTF-8, otherwise binary.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => AssetPayload::Text(text),
            Err(err) => AssetPayload::Binary(err.into_bytes()),
        }
    }
}

fn field<T: DeserializeOwned>(body: Option<Body>, name: &str, context: &str) -> Result<Option<T>, ApiError> {
    let Some(body) = body else {
        return Ok(None);
    };
    let mut value = body.into_json(context)?;
    match value.get_mut(name).map(Value::take) {
        None | Some(Value::Null) => Ok(None),
        Some(inner) => serde_json::from_value(inner)
            .map(Some)
            .map_err(|source| decode_err(context, source)),
    }
}

fn wrap<T: Serialize>(name: &str, record: &T, context: &str) -> Result<Value, ApiError> {
    let inner = serde_json::to_value(record).map_err(|source| decode_err(context, source))?;
    let mut outer = serde_json::Map::new();
    outer.insert(name.to_string(), inner);
    Ok(Value::Object(outer))
}

fn asset_query(key: &str) -> String {
    format!("asset[key]={}", urlencoding::encode(key))
}

/// Drop `X` whenever `X.liquid` is also present; the former is compiled output.
pub fn suppress_compiled(assets: Vec<Asset>) -> Vec<Asset> {
    let keys: BTreeSet<String> = assets.iter().map(|a| a.key.clone()).collect();
    assets
        .into_iter()
        .filter(|a| !keys.contains(&format!("{}.liquid", a.key)))
        .collect()
}

impl Client {
    /// Page through `tail` (e.g. `pages.json`), reading records from `name`.
    pub async fn paginate<T, F>(&self, tail: &str, name: &str, id_of: F) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Option<ResourceId>,
    {
        let base = self.api_path(tail);
        let sep = if base.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut since_id: Option<ResourceId> = None;
        loop {
            let path = match since_id {
                Some(id) => format!("{base}{sep}limit={PAGE_SIZE}&since_id={id}"),
                None => format!("{base}{sep}limit={PAGE_SIZE}"),
            };
            let page: Vec<T> = field(self.get(&path).await?, name, &path)?.unwrap_or_default();
            let count = page.len();
            let max_seen = page.iter().filter_map(&id_of).chain(since_id).max();
            items.extend(page);
            debug!(path = %path, count, "page");
            if count < PAGE_SIZE {
                break;
            }
            if max_seen == since_id {
                warn!(path = %path, "full page without advancing ids; stopping");
                break;
            }
            since_id = max_seen;
        }
        Ok(items)
    }

    // -- themes ------------------------------------------------------------

    pub async fn list_themes(&self) -> Result<Vec<Theme>, ApiError> {
        let path = self.api_path("themes.json");
        let themes: Vec<Theme> = field(self.get(&path).await?, "themes", &path)?.unwrap_or_default();
        Ok(themes.into_iter().map(Theme::with_handle).collect())
    }

    /// Resolve a theme: no selector → the published theme, numeric → id,
    /// anything else → normalized handle.
    pub async fn find_theme(&self, selector: Option<&str>) -> Result<Option<Theme>, ApiError> {
        Ok(self
            .list_themes()
            .await?
            .into_iter()
            .find(|theme| theme.matches(selector)))
    }

    pub async fn create_theme(
        &self,
        name: &str,
        role: ThemeRole,
        src: Option<&str>,
    ) -> Result<Option<Theme>, ApiError> {
        let path = self.api_path("themes.json");
        let mut theme = json!({ "name": name, "role": role.to_string() });
        if let Some(src) = src {
            theme["src"] = Value::from(src);
        }
        let body = self.post(&path, &json!({ "theme": theme })).await?;
        Ok(field::<Theme>(body, "theme", &path)?.map(Theme::with_handle))
    }

    pub async fn update_theme(
        &self,
        id: ResourceId,
        name: Option<&str>,
        role: Option<ThemeRole>,
    ) -> Result<Option<Theme>, ApiError> {
        let path = self.api_path(&format!("themes/{id}.json"));
        let mut theme = json!({ "id": id });
        if let Some(name) = name {
            theme["name"] = Value::from(name);
        }
        if let Some(role) = role {
            theme["role"] = Value::from(role.to_string());
        }
        let body = self.put(&path, &json!({ "theme": theme })).await?;
        Ok(field::<Theme>(body, "theme", &path)?.map(Theme::with_handle))
    }

    pub async fn delete_theme(&self, id: ResourceId) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("themes/{id}.json"))).await?;
        Ok(())
    }

    // -- assets ------------------------------------------------------------

    pub async fn list_assets(&self, theme_id: ResourceId) -> Result<Vec<Asset>, ApiError> {
        let path = self.api_path(&format!("themes/{theme_id}/assets.json"));
        let assets: Vec<Asset> = field(self.get(&path).await?, "assets", &path)?.unwrap_or_default();
        Ok(suppress_compiled(assets))
    }

    /// Version history of one asset; empty when the endpoint has none.
    pub async fn asset_versions(
        &self,
        theme_id: ResourceId,
        key: &str,
    ) -> Result<Vec<AssetVersion>, ApiError> {
        let path = format!(
            "{}?{}",
            self.api_path(&format!("themes/{theme_id}/assets/versions.json")),
            asset_query(key)
        );
        Ok(field(self.get(&path).await?, "versions", &path)?.unwrap_or_default())
    }

    /// List assets and fill in each one's version history concurrently.
    /// A failed history lookup leaves that asset without versions.
    pub async fn list_assets_with_versions(&self, theme_id: ResourceId) -> Result<Vec<Asset>, ApiError> {
        let assets = self.list_assets(theme_id).await?;
        let histories = join_all(
            assets
                .iter()
                .map(|asset| self.asset_versions(theme_id, &asset.key)),
        )
        .await;
        Ok(assets
            .into_iter()
            .zip(histories)
            .map(|(mut asset, history)| {
                match history {
                    Ok(versions) => asset.versions = versions,
                    Err(err) => debug!(key = %asset.key, error = %err, "no version history"),
                }
                asset
            })
            .collect())
    }

    pub async fn get_asset(
        &self,
        theme_id: ResourceId,
        key: &str,
        version: Option<u32>,
    ) -> Result<Option<Asset>, ApiError> {
        let mut path = format!(
            "{}?{}",
            self.api_path(&format!("themes/{theme_id}/assets.json")),
            asset_query(key)
        );
        if let Some(version) = version {
            path.push_str(&format!("&asset[version]={version}"));
        }
        field(self.get(&path).await?, "asset", &path)
    }

    /// Raw bytes of an asset, optionally at a historical version.
    ///
    /// Current binary assets come from their public URL when one is listed;
    /// everything else is read through the API.
    pub async fn download_asset(
        &self,
        theme_id: ResourceId,
        asset: &Asset,
        version: Option<u32>,
    ) -> Result<Option<Vec<u8>>, ApiError> {
        if version.is_none() {
            if let Some(url) = asset.public_url.as_deref() {
                return self.get_raw(url).await;
            }
        }
        let Some(remote) = self.get_asset(theme_id, &asset.key, version).await? else {
            return Ok(None);
        };
        if let Some(value) = remote.value {
            return Ok(Some(value.into_bytes()));
        }
        match remote.attachment {
            Some(attachment) => base64::engine::general_purpose::STANDARD
                .decode(attachment.trim())
                .map(Some)
                .map_err(|source| ApiError::Attachment {
                    key: asset.key.clone(),
                    source,
                }),
            None => Ok(Some(Vec::new())),
        }
    }

    pub async fn put_asset(
        &self,
        theme_id: ResourceId,
        key: &str,
        payload: &AssetPayload,
    ) -> Result<Option<Asset>, ApiError> {
        let path = self.api_path(&format!("themes/{theme_id}/assets.json"));
        let asset = match payload {
            AssetPayload::Text(text) => json!({ "key": key, "value": text }),
            AssetPayload::Binary(bytes) => json!({
                "key": key,
                "attachment": base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
        };
        let body = self.put(&path, &json!({ "asset": asset })).await?;
        field(body, "asset", &path)
    }

    pub async fn delete_asset(&self, theme_id: ResourceId, key: &str) -> Result<(), ApiError> {
        let path = format!(
            "{}?{}",
            self.api_path(&format!("themes/{theme_id}/assets.json")),
            asset_query(key)
        );
        self.delete(&path).await?;
        Ok(())
    }

    // -- pages -------------------------------------------------------------

    pub async fn list_pages(&self) -> Result<Vec<Page>, ApiError> {
        self.paginate("pages.json", "pages", |p: &Page| p.id).await
    }

    pub async fn create_page(&self, page: &Page) -> Result<Option<Page>, ApiError> {
        let path = self.api_path("pages.json");
        let body = self.post(&path, &wrap("page", page, &path)?).await?;
        field(body, "page", &path)
    }

    pub async fn update_page(&self, id: ResourceId, page: &Page) -> Result<Option<Page>, ApiError> {
        let path = self.api_path(&format!("pages/{id}.json"));
        let body = self.put(&path, &wrap("page", page, &path)?).await?;
        field(body, "page", &path)
    }

    pub async fn delete_page(&self, id: ResourceId) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("pages/{id}.json"))).await?;
        Ok(())
    }

    // -- blogs and articles ------------------------------------------------

    pub async fn list_blogs(&self) -> Result<Vec<Blog>, ApiError> {
        self.paginate("blogs.json", "blogs", |b: &Blog| Some(b.id)).await
    }

    pub async fn create_blog(&self, handle: &str, title: &str) -> Result<Option<Blog>, ApiError> {
        let path = self.api_path("blogs.json");
        let body = self
            .post(&path, &json!({ "blog": { "handle": handle, "title": title } }))
            .await?;
        field(body, "blog", &path)
    }

    pub async fn list_articles(&self, blog_id: ResourceId) -> Result<Vec<Article>, ApiError> {
        self.paginate(&format!("blogs/{blog_id}/articles.json"), "articles", |a: &Article| a.id)
            .await
    }

    pub async fn create_article(&self, blog_id: ResourceId, article: &Article) -> Result<Option<Article>, ApiError> {
        let path = self.api_path(&format!("blogs/{blog_id}/articles.json"));
        let body = self.post(&path, &wrap("article", article, &path)?).await?;
        field(body, "article", &path)
    }

    pub async fn update_article(
        &self,
        blog_id: ResourceId,
        id: ResourceId,
        article: &Article,
    ) -> Result<Option<Article>, ApiError> {
        let path = self.api_path(&format!("blogs/{blog_id}/articles/{id}.json"));
        let body = self.put(&path, &wrap("article", article, &path)?).await?;
        field(body, "article", &path)
    }

    pub async fn delete_article(&self, blog_id: ResourceId, id: ResourceId) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("blogs/{blog_id}/articles/{id}.json")))
            .await?;
        Ok(())
    }

    // -- menus -------------------------------------------------------------

    pub async fn list_menus(&self) -> Result<Vec<Menu>, ApiError> {
        self.paginate("menus.json", "menus", |m: &Menu| Some(m.id)).await
    }

    /// Full menu including nested items.
    pub async fn get_menu(&self, id: ResourceId) -> Result<Option<Menu>, ApiError> {
        let path = self.api_path(&format!("menus/{id}.json"));
        field(self.get(&path).await?, "menu", &path)
    }

    // -- script tags -------------------------------------------------------

    pub async fn list_script_tags(&self) -> Result<Vec<ScriptTag>, ApiError> {
        self.paginate("script_tags.json", "script_tags", |s: &ScriptTag| s.id)
            .await
    }

    pub async fn create_script_tag(&self, tag: &ScriptTag) -> Result<Option<ScriptTag>, ApiError> {
        let path = self.api_path("script_tags.json");
        let body = self.post(&path, &wrap("script_tag", tag, &path)?).await?;
        field(body, "script_tag", &path)
    }

    pub async fn update_script_tag(&self, id: ResourceId, tag: &ScriptTag) -> Result<Option<ScriptTag>, ApiError> {
        let path = self.api_path(&format!("script_tags/{id}.json"));
        let body = self.put(&path, &wrap("script_tag", tag, &path)?).await?;
        field(body, "script_tag", &path)
    }

    pub async fn delete_script_tag(&self, id: ResourceId) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("script_tags/{id}.json")))
            .await?;
        Ok(())
    }

    // -- redirects ---------------------------------------------------------

    pub async fn list_redirects(&self) -> Result<Vec<Redirect>, ApiError> {
        self.paginate("redirects.json", "redirects", |r: &Redirect| r.id)
            .await
    }

    pub async fn create_redirect(&self, redirect: &Redirect) -> Result<Option<Redirect>, ApiError> {
        let path = self.api_path("redirects.json");
        let body = self.post(&path, &wrap("redirect", redirect, &path)?).await?;
        field(body, "redirect", &path)
    }

    pub async fn update_redirect(&self, id: ResourceId, redirect: &Redirect) -> Result<Option<Redirect>, ApiError> {
        let path = self.api_path(&format!("redirects/{id}.json"));
        let body = self.put(&path, &wrap("redirect", redirect, &path)?).await?;
        field(body, "redirect", &path)
    }

    pub async fn delete_redirect(&self, id: ResourceId) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("redirects/{id}.json"))).await?;
        Ok(())
    }
}
