//! Credentials and client settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.shopsync/
//!   config.yaml      (map of section name → settings)
//! ```
//!
//! ```yaml
//! default:
//!   host: my-shop.myshopify.com
//!   access_token: shpat_xxx
//!   retry:
//!     max_attempts: 5
//! ```
//!
//! Environment variables override file values. Every loader has an `_at`
//! form taking an explicit home directory and environment lookup; tests must
//! only use the `_at` forms.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SECTION: &str = "default";
pub const DEFAULT_API_VERSION: &str = "2024-01";

pub const ENV_CONFIG: &str = "SHOPSYNC_CONFIG";
pub const ENV_SECTION: &str = "SHOPSYNC_SECTION";
pub const ENV_HOST: &str = "SHOPIFY_HOST";
pub const ENV_KEY: &str = "SHOPIFY_KEY";
pub const ENV_PASSWORD: &str = "SHOPIFY_PASSWORD";
pub const ENV_ACCESS_TOKEN: &str = "SHOPIFY_ACCESS_TOKEN";
pub const ENV_STOREFRONT: &str = "SHOPIFY_STOREFRONT_ACCESS_TOKEN";

/// Retry knobs for the transport client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Upper bound on attempts per request (rate limits, 5xx and redirects).
    pub max_attempts: u32,
    /// Delay when the server sends no `Retry-After`.
    pub default_delay_ms: u64,
    /// Cap applied to `Retry-After`.
    pub max_delay_ms: u64,
    /// Delay before re-issuing a request against a redirected host.
    pub redirect_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            default_delay_ms: 1_000,
            max_delay_ms: 10_000,
            redirect_delay_ms: 500,
        }
    }
}

/// One section of `config.yaml`, as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SectionFile {
    pub host: Option<String>,
    pub key: Option<String>,
    pub password: Option<String>,
    pub access_token: Option<String>,
    pub storefront_token: Option<String>,
    pub api_version: Option<String>,
    pub retry: Option<RetrySettings>,
}

/// Fully resolved settings used to construct the API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub section: String,
    pub host: String,
    pub key: Option<String>,
    pub password: Option<String>,
    pub access_token: Option<String>,
    pub storefront_token: Option<String>,
    pub api_version: String,
    pub retry: RetrySettings,
}

impl Config {
    /// Settings for a host with no credentials; used by tests and tooling.
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            section: DEFAULT_SECTION.to_string(),
            host: host.into(),
            key: None,
            password: None,
            access_token: None,
            storefront_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            retry: RetrySettings::default(),
        }
    }
}

/// `<home>/.shopsync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".shopsync").join("config.yaml")
}

/// Parse every section of a config file. A missing file yields an empty map.
pub fn read_sections(path: &Path) -> Result<BTreeMap<String, SectionFile>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve settings rooted at `home`, reading overrides through `env`.
///
/// Precedence: environment > config section > defaults. A missing config
/// file is fine as long as a host is supplied somewhere; asking for a named
/// section that the file does not contain is an error.
pub fn load_at(
    home: &Path,
    section: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let path = env(ENV_CONFIG)
        .map(PathBuf::from)
        .unwrap_or_else(|| config_path_at(home));
    let section = section
        .map(str::to_string)
        .or_else(|| env(ENV_SECTION))
        .unwrap_or_else(|| DEFAULT_SECTION.to_string());

    let mut sections = read_sections(&path)?;
    let file = match sections.remove(&section) {
        Some(file) => file,
        None if section == DEFAULT_SECTION || sections.is_empty() => SectionFile::default(),
        None => return Err(ConfigError::UnknownSection { section, path }),
    };

    let pick = |var: &str, value: Option<String>| env(var).filter(|v| !v.is_empty()).or(value);
    let host = pick(ENV_HOST, file.host)
        .map(|h| h.trim().trim_end_matches('/').to_string())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ConfigError::MissingHost {
            section: section.clone(),
        })?;

    Ok(Config {
        host,
        key: pick(ENV_KEY, file.key),
        password: pick(ENV_PASSWORD, file.password),
        access_token: pick(ENV_ACCESS_TOKEN, file.access_token),
        storefront_token: pick(ENV_STOREFRONT, file.storefront_token),
        api_version: file
            .api_version
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        retry: file.retry.unwrap_or_default(),
        section,
    })
}

/// `load_at` convenience wrapper using `dirs::home_dir()` and the process environment.
pub fn load(section: Option<&str>) -> Result<Config, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    load_at(&home, section, |var| std::env::var(var).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(home: &Path, yaml: &str) {
        let path = config_path_at(home);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, yaml).unwrap();
    }

    #[test]
    fn missing_file_and_no_env_is_missing_host() {
        let home = TempDir::new().unwrap();
        let err = load_at(home.path(), None, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingHost { .. }), "got: {err}");
    }

    #[test]
    fn env_alone_is_enough() {
        let home = TempDir::new().unwrap();
        let env: HashMap<&str, &str> = [(ENV_HOST, "shop.example.com/"), (ENV_ACCESS_TOKEN, "tok")]
            .into_iter()
            .collect();
        let cfg = load_at(home.path(), None, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.host, "shop.example.com");
        assert_eq!(cfg.access_token.as_deref(), Some("tok"));
        assert_eq!(cfg.api_version, DEFAULT_API_VERSION);
        assert_eq!(cfg.retry, RetrySettings::default());
    }

    #[test]
    fn section_values_and_env_override() {
        let home = TempDir::new().unwrap();
        write_config(
            home.path(),
            "default:\n  host: a.example.com\n  key: k\n  password: p\nstaging:\n  host: b.example.com\n  api_version: 2023-07\n  retry:\n    max_attempts: 3\n",
        );

        let cfg = load_at(home.path(), Some("staging"), no_env).unwrap();
        assert_eq!(cfg.host, "b.example.com");
        assert_eq!(cfg.api_version, "2023-07");
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.default_delay_ms, 1_000);

        let cfg = load_at(home.path(), None, |k| {
            (k == ENV_PASSWORD).then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(cfg.host, "a.example.com");
        assert_eq!(cfg.key.as_deref(), Some("k"));
        assert_eq!(cfg.password.as_deref(), Some("from-env"));
    }

    #[test]
    fn unknown_named_section_is_an_error() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "default:\n  host: a.example.com\n");
        let err = load_at(home.path(), Some("prod"), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection { .. }), "got: {err}");
    }
}
