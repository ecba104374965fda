use axum::http::HeaderMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Response header carrying the seconds left before the server drops the session
pub const SESSION_TIMEOUT_HEADER: &str = "session-timeout";

/// Length of the warning window before expiry
pub const DEFAULT_WARNING_WINDOW: Duration = Duration::from_secs(60);

/// Client-side view of the server session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Absolute instant at which the server session expires
    pub expiration: Option<Instant>,
    /// True once the warning window has been entered
    pub is_warning: bool,
    /// Bumped on every accepted hint and on reset
    pub generation: u64,
}

impl SessionState {
    /// Whole seconds left until expiry, rounded half-up like `Math.round`.
    ///
    /// Negative once the expiration has passed; `None` without an expiration.
    pub fn remaining_secs(&self, now: Instant) -> Option<i64> {
        let expiration = self.expiration?;
        let millis = if expiration >= now {
            (expiration - now).as_millis() as i64
        } else {
            -((now - expiration).as_millis() as i64)
        };
        Some(round_half_up(millis, 1000))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }
}

fn round_half_up(value: i64, unit: i64) -> i64 {
    (value + unit / 2).div_euclid(unit)
}

/// Read the session-timeout hint from response headers.
///
/// Missing or empty headers yield `None`, as do values that are not a
/// non-negative integer (the latter are logged).
pub fn parse_timeout_hint(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(SESSION_TIMEOUT_HEADER)?;
    let raw = match value.to_str() {
        Ok(raw) => raw.trim(),
        Err(_) => {
            warn!("Ignoring non-ASCII {} header", SESSION_TIMEOUT_HEADER);
            return None;
        }
    };
    if raw.is_empty() {
        return None;
    }

    match raw.parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!(
                "Ignoring malformed {} header: {:?}",
                SESSION_TIMEOUT_HEADER, raw
            );
            None
        }
    }
}
