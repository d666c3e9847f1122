//! The transport client every accessor goes through.

use std::sync::{RwLock, RwLockReadGuard};
use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use shopsync_core::Config;
use tracing::{debug, info, warn};

use crate::cache::{anchor_from_headers, cache_key, ResponseCache};
use crate::error::{decode_err, ApiError};
use crate::retry::{is_retryable, RetryPolicy};

/// Freshness window for ordinary reads.
pub const DEFAULT_GET_TTL: Duration = Duration::from_secs(1);

const ACCESS_TOKEN: HeaderName = HeaderName::from_static("x-shopify-access-token");
const STOREFRONT_TOKEN: HeaderName = HeaderName::from_static("x-shopify-storefront-access-token");

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl Body {
    pub fn into_json(self, context: &str) -> Result<Value, ApiError> {
        match self {
            Body::Json(value) => Ok(value),
            Body::Text(_) | Body::Bytes(_) => Err(ApiError::UnexpectedBody {
                context: context.to_string(),
            }),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Body::Json(value) => value.to_string().into_bytes(),
            Body::Text(text) => text.into_bytes(),
            Body::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    /// Scheme and authority, e.g. `https://shop.myshopify.com`. Moves on redirect.
    base: RwLock<String>,
    api_version: String,
    auth: HeaderMap,
    cache: ResponseCache,
    retry: RetryPolicy,
}

impl Client {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            base: RwLock::new(normalize_base(&config.host)),
            api_version: config.api_version.clone(),
            auth: auth_headers(config)?,
            cache: ResponseCache::new(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Current scheme and authority requests are sent to.
    pub fn base(&self) -> String {
        self.base_guard().clone()
    }

    /// `/admin/api/<version>/<tail>`
    pub fn api_path(&self, tail: &str) -> String {
        format!("/admin/api/{}/{}", self.api_version, tail.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> Result<Option<Body>, ApiError> {
        self.request(Method::GET, path, None, DEFAULT_GET_TTL).await
    }

    pub async fn get_with_ttl(&self, path: &str, ttl: Duration) -> Result<Option<Body>, ApiError> {
        self.request(Method::GET, path, None, ttl).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Option<Body>, ApiError> {
        self.request(Method::POST, path, Some(body), Duration::ZERO).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Option<Body>, ApiError> {
        self.request(Method::PUT, path, Some(body), Duration::ZERO).await
    }

    pub async fn delete(&self, path: &str) -> Result<Option<Body>, ApiError> {
        self.request(Method::DELETE, path, None, Duration::ZERO).await
    }

    /// Uncached GET returning the body bytes exactly as sent.
    pub async fn get_raw(&self, path: &str) -> Result<Option<Vec<u8>>, ApiError> {
        let body = self.execute(Method::GET, path, None, Duration::ZERO, true).await?;
        Ok(body.map(Body::into_bytes))
    }

    /// Issue one logical request.
    ///
    /// `path` is either relative to the shop host or an absolute `http(s)://`
    /// URL. Credentials are only attached when the URL points at the shop
    /// host. Returns `Ok(None)` on 404.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        ttl: Duration,
    ) -> Result<Option<Body>, ApiError> {
        self.execute(method, path, body, ttl, false).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        ttl: Duration,
        raw: bool,
    ) -> Result<Option<Body>, ApiError> {
        let key = cache_key(&method, path);
        if method == Method::GET && !raw {
            if let Some(hit) = self.cache.lookup(&key, ttl, Utc::now()) {
                debug!(%method, path, "cache hit");
                return Ok(Some(hit));
            }
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let url = self.url_for(path);
            debug!(%method, %url, attempt, "request");

            let mut req = self
                .http
                .request(method.clone(), &url)
                .header(ACCEPT, "*/*");
            if url.starts_with(self.base_guard().as_str()) {
                req = req.headers(self.auth.clone());
            }
            if let Some(body) = body {
                req = req.header(CONTENT_TYPE, "application/json").json(body);
            }
            let res = req.send().await.map_err(|source| ApiError::Transport {
                method: method.to_string(),
                path: path.to_string(),
                source,
            })?;
            let status = res.status();

            if is_retryable(status) {
                if attempt >= self.retry.max_attempts {
                    return Err(self.exhausted(&method, path, attempt, status));
                }
                let delay = self.retry.delay_for(res.headers().get(RETRY_AFTER), Utc::now());
                warn!(%method, path, status = status.as_u16(), delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
                continue;
            }

            if status.is_redirection() && status != StatusCode::NOT_MODIFIED {
                let location = res
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let Some(origin) = location.as_deref().and_then(origin_of) else {
                    return Err(ApiError::BadRedirect {
                        method: method.to_string(),
                        path: path.to_string(),
                        location,
                    });
                };
                if attempt >= self.retry.max_attempts {
                    return Err(self.exhausted(&method, path, attempt, status));
                }
                info!(from = %self.base(), to = %origin, "shop host moved");
                self.set_base(origin);
                tokio::time::sleep(self.retry.redirect_delay).await;
                continue;
            }

            if method != Method::GET {
                self.cache.invalidate(&cache_key(&Method::GET, path));
            }

            if status == StatusCode::NOT_FOUND {
                debug!(%method, path, "not found");
                return Ok(None);
            }

            if status.is_client_error() {
                let text = res.text().await.ok().filter(|t| !t.is_empty());
                return Err(ApiError::Status {
                    method: method.to_string(),
                    path: path.to_string(),
                    status,
                    body: text,
                });
            }

            let anchor = anchor_from_headers(res.headers(), Utc::now());
            let decoded = decode(res, &method, path, raw).await?;
            if method == Method::GET && status.is_success() && !raw {
                self.cache.store(key, decoded.clone(), anchor);
            }
            return Ok(Some(decoded));
        }
    }

    fn exhausted(&self, method: &Method, path: &str, attempts: u32, status: StatusCode) -> ApiError {
        ApiError::RetriesExhausted {
            method: method.to_string(),
            path: path.to_string(),
            attempts,
            status,
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_guard(), path.trim_start_matches('/'))
        }
    }

    fn base_guard(&self) -> RwLockReadGuard<'_, String> {
        match self.base.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn set_base(&self, origin: String) {
        let mut guard = match self.base.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = origin;
    }
}

fn normalize_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn origin_of(location: &str) -> Option<String> {
    let url = reqwest::Url::parse(location).ok()?;
    url.host_str()?;
    Some(url.origin().ascii_serialization())
}

fn auth_headers(config: &Config) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = config.access_token.as_deref() {
        headers.insert(ACCESS_TOKEN, HeaderValue::from_str(token)?);
    } else if let (Some(key), Some(password)) = (config.key.as_deref(), config.password.as_deref()) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{key}:{password}"));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    if let Some(token) = config.storefront_token.as_deref() {
        headers.insert(STOREFRONT_TOKEN, HeaderValue::from_str(token)?);
    }
    Ok(headers)
}

async fn decode(res: Response, method: &Method, path: &str, raw: bool) -> Result<Body, ApiError> {
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let bytes = res.bytes().await.map_err(|source| ApiError::Transport {
        method: method.to_string(),
        path: path.to_string(),
        source,
    })?;

    if raw {
        return Ok(Body::Bytes(bytes.to_vec()));
    }
    if content_type.contains("json") {
        if bytes.is_empty() {
            return Ok(Body::Json(Value::Null));
        }
        let value = serde_json::from_slice(&bytes)
            .map_err(|source| decode_err(format!("{method} {path}"), source))?;
        return Ok(Body::Json(value));
    }
    if content_type.starts_with("text/")
        || content_type.contains("javascript")
        || content_type.contains("xml")
    {
        return Ok(Body::Text(String::from_utf8_lossy(&bytes).into_owned()));
    }
    Ok(Body::Bytes(bytes.to_vec()))
}
