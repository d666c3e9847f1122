//! shopsync core library: storefront domain types, handle normalization,
//! credentials/config loading, errors.
//!
//! - [`types`]: themes, assets, pages/articles, blogs, menus, script tags, redirects
//! - [`handle`]: [`handle_name`] slug normalization
//! - [`config`]: `~/.shopsync/config.yaml` + environment overrides
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod handle;
pub mod types;

pub use config::{Config, RetrySettings};
pub use error::ConfigError;
pub use handle::handle_name;
pub use types::{
    Article, Asset, AssetVersion, Blog, Menu, MenuItem, Page, Redirect, ResourceId, ScriptTag,
    Theme, ThemeRole,
};
