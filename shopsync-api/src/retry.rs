//! Retry timing for rate-limited and failing requests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use shopsync_core::RetrySettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub default_delay: Duration,
    pub max_delay: Duration,
    pub redirect_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(s: &RetrySettings) -> Self {
        Self {
            max_attempts: s.max_attempts.max(1),
            default_delay: Duration::from_millis(s.default_delay_ms),
            max_delay: Duration::from_millis(s.max_delay_ms),
            redirect_delay: Duration::from_millis(s.redirect_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Policy with no sleeping at all, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            default_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            redirect_delay: Duration::ZERO,
        }
    }

    /// Delay before the next attempt.
    ///
    /// `Retry-After` may be a number of seconds (fractional allowed) or an
    /// HTTP date; either is capped at `max_delay`. Without a usable header the
    /// default delay applies.
    pub fn delay_for(&self, retry_after: Option<&HeaderValue>, now: DateTime<Utc>) -> Duration {
        let Some(text) = retry_after.and_then(|v| v.to_str().ok()).map(str::trim) else {
            return self.default_delay;
        };
        let requested = if let Ok(secs) = text.parse::<f64>() {
            (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
        } else {
            DateTime::parse_from_rfc2822(text)
                .ok()
                .map(|at| (at.with_timezone(&Utc) - now).to_std().unwrap_or_default())
        };
        match requested {
            Some(delay) => delay.min(self.max_delay),
            None => self.default_delay,
        }
    }
}

/// Statuses that are retried after a delay.
pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
