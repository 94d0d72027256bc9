//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::routing::policy::Renderer;

/// Root configuration for the dispatch engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Detailed failure payloads when true.
    pub debug: bool,

    /// Page title composition.
    pub title: TitleConfig,

    /// Renderer seed and view naming.
    pub rendering: RenderingConfig,

    /// Process-wide cache seeds.
    pub cache: CacheConfig,

    /// Seed for the inheritable `error404_url` field.
    pub error404_url: String,

    /// Parameter arity policy.
    pub parameters: ParametersConfig,

    /// Alias → URL map used for every redirect target.
    pub url_alias: IndexMap<String, String>,

    /// Global maintenance switch.
    pub offline: OfflineConfig,

    /// Authentication gate and session settings.
    pub authentication: AuthenticationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route configuration tree. The table itself is the root node.
    pub routes: toml::Table,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            debug: true,
            title: TitleConfig::default(),
            rendering: RenderingConfig::default(),
            cache: CacheConfig::default(),
            error404_url: "error404".to_string(),
            parameters: ParametersConfig::default(),
            url_alias: default_aliases(),
            offline: OfflineConfig::default(),
            authentication: AuthenticationConfig::default(),
            observability: ObservabilityConfig::default(),
            routes: toml::Table::new(),
        }
    }
}

fn default_aliases() -> IndexMap<String, String> {
    let mut aliases = IndexMap::new();
    aliases.insert("index".to_string(), "/".to_string());
    aliases.insert("error404".to_string(), "/not-found".to_string());
    aliases
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// One element of the page title layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitlePart {
    Title,
    Divisor,
    SiteName,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TitleConfig {
    pub site_name: String,
    pub divisor: String,
    /// Order in which title, divisor and site name are joined.
    pub template: Vec<TitlePart>,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            site_name: "Route Dispatch".to_string(),
            divisor: " | ".to_string(),
            template: vec![TitlePart::Title, TitlePart::Divisor, TitlePart::SiteName],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Renderer used when no node on the path declares one.
    pub default_renderer: Option<Renderer>,

    /// Extension appended to derived view paths.
    pub view_extension: String,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            default_renderer: None,
            view_extension: "html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub status: bool,
    pub expire_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            status: true,
            expire_secs: 172_800,
        }
    }
}

/// Parameter arity policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParametersConfig {
    /// Treat too few or too many trailing segments as a redirect.
    pub force: bool,

    /// Alias or URL to redirect to on an arity violation.
    pub redirect_on_fail: String,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            force: true,
            redirect_on_fail: "error404".to_string(),
        }
    }
}

/// Global maintenance switch, applied before resolution.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OfflineConfig {
    pub status: bool,
    pub message: String,
    /// Alias or URL to redirect to instead of answering 503.
    pub redirect_to: Option<String>,
    /// Answer with the message even when `redirect_to` is set.
    pub force_message: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    /// Message returned with a 401 when no fail URL applies.
    pub fail_message: String,

    /// Error tag returned with a 401.
    pub exception_tag: String,

    /// Name of the cookie carrying the session id.
    pub session_cookie: String,

    /// Lifetime of a granted tag.
    pub cookie_expire_secs: u64,

    /// Bind grants to the client IP they were issued for.
    pub ip_check: bool,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            fail_message: "Authentication required.".to_string(),
            exception_tag: "deniedAuth".to_string(),
            session_cookie: "sid".to_string(),
            cookie_expire_secs: 86_400,
            ip_check: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
