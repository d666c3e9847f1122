//! Domain types mirrored from the storefront admin API.
//!
//! Every remote record is a read-only mirror fetched per operation. Fields the
//! sync engine never inspects are preserved in `extra` so that sidecar files
//! round-trip the full record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::handle::handle_name;

/// Numeric identifier assigned by the remote API.
pub type ResourceId = u64;

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

/// Publication role of a theme. Exactly one theme is `Main` at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeRole {
    Main,
    #[default]
    Unpublished,
    Demo,
    Development,
    #[serde(other)]
    Other,
}

impl fmt::Display for ThemeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeRole::Main => write!(f, "main"),
            ThemeRole::Unpublished => write!(f, "unpublished"),
            ThemeRole::Demo => write!(f, "demo"),
            ThemeRole::Development => write!(f, "development"),
            ThemeRole::Other => write!(f, "other"),
        }
    }
}

/// A named bundle of storefront template files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: ResourceId,
    pub name: String,
    /// Derived from `name` via [`handle_name`]; the API does not send it.
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub role: ThemeRole,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub theme_store_id: Option<u64>,
}

impl Theme {
    /// Fill in the derived handle.
    pub fn with_handle(mut self) -> Self {
        self.handle = handle_name(&self.name);
        self
    }

    pub fn is_main(&self) -> bool {
        self.role == ThemeRole::Main
    }

    /// Whether `selector` names this theme: an empty selector matches the
    /// published theme, a numeric selector matches the id, anything else is
    /// compared by normalized handle.
    pub fn matches(&self, selector: Option<&str>) -> bool {
        match selector.map(str::trim).filter(|s| !s.is_empty()) {
            None => self.is_main(),
            Some(s) => {
                s.parse::<ResourceId>().map(|id| id == self.id).unwrap_or(false)
                    || self.handle == handle_name(s)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// One historical revision of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetVersion {
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A single file within a theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Asset {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<AssetVersion>,
    /// Text payload; only present on single-asset reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Base64 payload for binary assets; only present on single-asset reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl Asset {
    /// Effective creation time of a version.
    ///
    /// Version 1 reports when the asset was first opened rather than when it
    /// was created, so the asset's own `created_at` stands in for it.
    pub fn version_created_at(&self, version: &AssetVersion) -> Option<DateTime<Utc>> {
        if version.version == 1 {
            self.created_at
        } else {
            version.created_at
        }
    }

    /// Highest version whose effective creation time is at or before `at`.
    pub fn version_at(&self, at: DateTime<Utc>) -> Option<u32> {
        self.versions
            .iter()
            .filter(|v| self.version_created_at(v).is_some_and(|t| t <= at))
            .map(|v| v.version)
            .max()
    }
}

// ---------------------------------------------------------------------------
// Pages, blogs and articles
// ---------------------------------------------------------------------------

/// A content page. Blog articles share the same shape (see [`Article`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Write-only flag understood by the API on create/update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Blog articles use the page shape plus `blog_id`.
pub type Article = Page;

impl Page {
    /// Local storage key: the handle, under `drafts/` when unpublished.
    pub fn storage_key(&self) -> String {
        if self.published_at.is_some() {
            self.handle.clone()
        } else {
            format!("drafts/{}", self.handle)
        }
    }

    /// Set the publish flag; an unpublished payload never carries `published_at`.
    pub fn set_published(&mut self, published: bool) {
        self.published = Some(published);
        if !published {
            self.published_at = None;
        }
    }
}

/// A blog; its articles are listed separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    pub id: ResourceId,
    pub handle: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Blog {
    /// Local directory key: `blogs/<handle>`.
    pub fn storage_key(&self) -> String {
        format!("blogs/{}", self.handle)
    }
}

// ---------------------------------------------------------------------------
// Menus
// ---------------------------------------------------------------------------

/// One navigation entry; entries nest arbitrarily deep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub subject_id: Option<ResourceId>,
    #[serde(rename = "items", default)]
    pub children: Vec<MenuItem>,
}

/// A navigation menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: ResourceId,
    pub handle: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

impl Menu {
    /// Local storage key (without extension): `menus/<handle>`.
    pub fn storage_key(&self) -> String {
        format!("menus/{}", self.handle)
    }
}

// ---------------------------------------------------------------------------
// Script tags and redirects
// ---------------------------------------------------------------------------

/// A remote script injected into storefront pages. Keyed by `src`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    pub src: String,
    #[serde(default)]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A URL redirect. Keyed by `path`; the API keeps no timestamps for these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    pub path: String,
    pub target: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
