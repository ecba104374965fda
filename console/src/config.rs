//! Console configuration
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Controller API configuration
    pub api: ApiConfig,

    /// Idle session configuration
    pub idle: IdleConfig,

    /// Demo configuration
    pub demo: DemoConfig,
}

/// Controller API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Controller base URL
    pub base_url: String,
    /// Bearer token (optional)
    pub token: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Idle session configuration
#[derive(Debug, Clone)]
pub struct IdleConfig {
    /// Warning window before session expiry
    pub warning_window: Duration,
    /// Countdown recomputation period
    pub tick: Duration,
}

/// Demo mode configuration: runs a local stub controller
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Whether demo mode is enabled
    pub enabled: bool,
    /// Stub bind address
    pub host: String,
    /// Stub port (0 picks a free one)
    pub port: u16,
    /// Session timeout the stub advertises, in seconds
    pub session_timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8013".to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            warning_window: Duration::from_secs(60),
            tick: Duration::from_secs(1),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 0,
            session_timeout: 1800, // 30 minutes
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // API config
        if let Some(url) = lookup("CONSOLE_URL")
            && !url.is_empty()
        {
            config.api.base_url = url;
        }
        if let Some(token) = lookup("CONSOLE_TOKEN")
            && !token.is_empty()
        {
            config.api.token = Some(token);
        }
        if let Some(val) = lookup("CONSOLE_REQUEST_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.api.request_timeout = Duration::from_secs(secs);
        }

        // Idle config
        if let Some(val) = lookup("IDLE_WARNING_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.idle.warning_window = Duration::from_secs(secs);
        }
        if let Some(val) = lookup("IDLE_TICK_MILLIS")
            && let Ok(millis) = val.parse::<u64>()
            && millis > 0
        {
            config.idle.tick = Duration::from_millis(millis);
        }

        // Demo config
        if let Some(val) = lookup("DEMO_ENABLED") {
            config.demo.enabled = parse_flag(&val);
        }
        if let Some(host) = lookup("DEMO_HOST")
            && !host.is_empty()
        {
            config.demo.host = host;
        }
        if let Some(val) = lookup("DEMO_PORT")
            && let Ok(port) = val.parse()
        {
            config.demo.port = port;
        }
        if let Some(val) = lookup("DEMO_SESSION_TIMEOUT_SECS")
            && let Ok(secs) = val.parse()
        {
            config.demo.session_timeout = secs;
        }

        config
    }
}
