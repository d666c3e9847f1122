//! Short-lived response cache keyed by method and path.
//!
//! Each entry carries a freshness anchor taken from the response's
//! `Last-Modified` header, else its `Date` header, else the time it arrived.
//! An entry is fresh while `now - anchor < ttl`. The first lookup that finds an
//! entry stale moves its anchor so that the entry stays servable for
//! [`STALE_GRACE`] longer, then reports a miss. Only that caller refreshes; the
//! callers in between keep getting the stale body instead of piling onto the
//! same endpoint.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, DATE, LAST_MODIFIED};

use crate::client::Body;

/// How long a stale entry keeps being served after the first miss.
pub const STALE_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
struct CacheEntry {
    body: Body,
    anchor: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

pub fn cache_key(method: &reqwest::Method, path: &str) -> String {
    format!("{method} {path}")
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Return the cached body when fresh. A zero `ttl` never reads the cache.
    pub fn lookup(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> Option<Body> {
        if ttl.is_zero() {
            return None;
        }
        let ttl = chrono::Duration::from_std(ttl).ok()?;
        let mut entries = self.entries();
        let entry = entries.get_mut(key)?;
        if now - entry.anchor < ttl {
            return Some(entry.body.clone());
        }
        let grace = chrono::Duration::from_std(STALE_GRACE).unwrap_or_default();
        entry.anchor = now + grace - ttl;
        None
    }

    pub fn store(&self, key: String, body: Body, anchor: DateTime<Utc>) {
        self.entries().insert(key, CacheEntry { body, anchor });
    }

    pub fn invalidate(&self, key: &str) {
        self.entries().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Freshness anchor for a response: `Last-Modified`, else `Date`, else `received`.
pub fn anchor_from_headers(headers: &HeaderMap, received: DateTime<Utc>) -> DateTime<Utc> {
    [LAST_MODIFIED, DATE]
        .iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|text| DateTime::parse_from_rfc2822(text).ok())
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or(received)
}
