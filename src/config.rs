// Engine configuration.
// Every value has a compile-time default; `from_env` lets a deployment override them.

use serde::Deserialize;
use std::time::Duration;

/// ========== LOGGING ==========

/// Default filter when `PEERCALL_LOG` is unset
#[cfg(debug_assertions)]
pub const DEFAULT_LOG_FILTER: &str = "peercall=debug,webrtc=warn";

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_FILTER: &str = "peercall=warn,webrtc=error";

pub const LOG_ENV: &str = "PEERCALL_LOG";

/// ========== DEFAULTS ==========

/// Traversal-assist servers used in direct mode
pub const DEFAULT_STUN_URLS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:global.stun.twilio.com:3478",
];

/// How long inbound tracks of one stream are collected before the stream is handed out
pub const TRACK_DEBOUNCE: Duration = Duration::from_millis(500);

/// How long a `Disconnected` connection may stay that way before recovery starts
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const BACKOFF_CAP: Duration = Duration::from_secs(16);
pub const CREDENTIAL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stun_urls: Vec<String>,
    /// Endpoint returning `{urls, username, credential}` for relay mode
    pub credential_url: Option<String>,
    pub credential_timeout: Duration,
    pub track_debounce: Duration,
    pub grace_period: Duration,
    pub max_reconnect_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stun_urls: DEFAULT_STUN_URLS.iter().map(|u| u.to_string()).collect(),
            credential_url: None,
            credential_timeout: CREDENTIAL_TIMEOUT,
            track_debounce: TRACK_DEBOUNCE,
            grace_period: GRACE_PERIOD,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            backoff_base: BACKOFF_BASE,
            backoff_cap: BACKOFF_CAP,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `PEERCALL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(urls) = lookup("PEERCALL_STUN_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
            cfg.stun_urls = urls;
        }
        if let Some(url) = lookup("PEERCALL_CREDENTIAL_URL").filter(|u| !u.trim().is_empty()) {
            cfg.credential_url = Some(url.trim().to_string());
        }
        if let Some(n) = lookup("PEERCALL_MAX_RECONNECT_ATTEMPTS").and_then(|v| v.parse().ok()) {
            cfg.max_reconnect_attempts = n;
        }
        if let Some(ms) = lookup("PEERCALL_GRACE_PERIOD_MS").and_then(|v| v.parse().ok()) {
            cfg.grace_period = Duration::from_millis(ms);
        }
        if let Some(ms) = lookup("PEERCALL_TRACK_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
            cfg.track_debounce = Duration::from_millis(ms);
        }
        cfg
    }
}
