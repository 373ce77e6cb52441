//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the file named by `GATEWAY_CONFIG`), then applies `GATEWAY_BIND`,
//! `GATEWAY_LOG_LEVEL`, `GATEWAY_API_URL` and `GATEWAY_SERVICE_<NAME>`
//! overrides.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::locale::LocaleSet;
use crate::logger;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const SERVICE_ENV_PREFIX: &str = "GATEWAY_SERVICE_";

/// Locale-related settings.
#[derive(Debug, Clone)]
pub struct LocalesConfig {
    /// Supported locales in declared order, default included.
    pub set: LocaleSet,
    /// Directory holding `{locale}.json` translation bundles.
    pub messages_dir: PathBuf,
    /// Cookie recording the client's last explicit locale choice.
    pub cookie: String,
    /// Header an upstream proxy may use to pin the locale.
    pub header: String,
}

/// Authentication backend settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL, no trailing slash.
    pub api_base_url: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Settings for the `gatectl` client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Credential store file (already expanded, no `~`).
    pub store_path: PathBuf,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub bind: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub locales: LocalesConfig,
    /// Path prefixes never rewritten with a locale.
    pub excluded: Vec<String>,
    pub auth: AuthConfig,
    /// External services reached through protected actions, by name.
    pub services: HashMap<String, String>,
    pub client: ClientConfig,
}

impl Config {
    pub fn service_url(&self, name: &str) -> Option<&str> {
        self.services.get(name).map(String::as_str)
    }
}

/// Env-sourced overrides. Tests build this directly instead of mutating env.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub api_base_url: Option<String>,
    pub services: HashMap<String, String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        let services = env::vars()
            .filter_map(|(k, v)| {
                let name = k.strip_prefix(SERVICE_ENV_PREFIX)?;
                (!name.is_empty()).then(|| (name.to_ascii_lowercase(), v))
            })
            .collect();
        Self {
            bind: env::var("GATEWAY_BIND").ok(),
            log_level: env::var("GATEWAY_LOG_LEVEL").ok(),
            api_base_url: env::var("GATEWAY_API_URL").ok(),
            services,
        }
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    gateway: RawGateway,
    #[serde(default)]
    locales: RawLocales,
    #[serde(default)]
    routing: RawRouting,
    #[serde(default)]
    auth: RawAuth,
    #[serde(default)]
    services: HashMap<String, String>,
    #[serde(default)]
    client: RawClient,
}

#[derive(Deserialize)]
struct RawGateway {
    name: String,
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize)]
struct RawLocales {
    #[serde(default = "default_supported")]
    supported: Vec<String>,
    #[serde(rename = "default", default = "default_locale")]
    default_locale: String,
    #[serde(default = "default_messages_dir")]
    messages_dir: String,
    #[serde(default = "default_locale_cookie")]
    cookie: String,
    #[serde(default = "default_locale_header")]
    header: String,
}

impl Default for RawLocales {
    fn default() -> Self {
        Self {
            supported: default_supported(),
            default_locale: default_locale(),
            messages_dir: default_messages_dir(),
            cookie: default_locale_cookie(),
            header: default_locale_header(),
        }
    }
}

#[derive(Deserialize)]
struct RawRouting {
    #[serde(default = "default_excluded")]
    excluded: Vec<String>,
}

impl Default for RawRouting {
    fn default() -> Self {
        Self { excluded: default_excluded() }
    }
}

#[derive(Deserialize)]
struct RawAuth {
    #[serde(default = "default_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawAuth {
    fn default() -> Self {
        Self { api_base_url: default_api_base_url(), timeout_seconds: default_timeout_seconds() }
    }
}

#[derive(Deserialize)]
struct RawClient {
    #[serde(default = "default_store_path")]
    store: String,
}

impl Default for RawClient {
    fn default() -> Self {
        Self { store: default_store_path() }
    }
}

fn default_bind() -> String { "127.0.0.1:3000".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_supported() -> Vec<String> { vec!["zh".to_string(), "en".to_string()] }
fn default_locale() -> String { "en".to_string() }
fn default_messages_dir() -> String { "config/messages".to_string() }
fn default_locale_cookie() -> String { "NEXT_LOCALE".to_string() }
fn default_locale_header() -> String { "x-next-intl-locale".to_string() }
fn default_api_base_url() -> String { "http://localhost:8000".to_string() }
fn default_timeout_seconds() -> u64 { 10 }
fn default_store_path() -> String { "~/.mainpage/credentials.json".to_string() }

fn default_excluded() -> Vec<String> {
    ["api", "_next/static", "_next/image", "favicon.ico"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `path`, else `$GATEWAY_CONFIG`, else `config/default.toml`,
/// then apply env-var overrides.
pub fn load(path: Option<&Path>) -> Result<Config, AppError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => env::var_os("GATEWAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
    };
    load_from(&path, &Overrides::from_env())
}

/// Load from an explicit path with explicit overrides.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let g = parsed.gateway;

    let log_level = overrides.log_level.clone().unwrap_or(g.log_level);
    // Plain levels are validated here; full EnvFilter directives pass through.
    if !log_level.contains(['=', ',']) {
        logger::parse_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;
    }

    let set = LocaleSet::new(&parsed.locales.supported, &parsed.locales.default_locale)?;

    let api_base_url = overrides
        .api_base_url
        .clone()
        .unwrap_or(parsed.auth.api_base_url)
        .trim_end_matches('/')
        .to_string();
    if api_base_url.is_empty() {
        return Err(AppError::Config("auth.api_base_url must not be empty".into()));
    }

    let mut services = parsed.services;
    services.extend(overrides.services.clone());

    Ok(Config {
        name: g.name,
        bind: overrides.bind.clone().unwrap_or(g.bind),
        log_level,
        log_file: g.log_file.as_deref().map(expand_home),
        locales: LocalesConfig {
            set,
            messages_dir: expand_home(&parsed.locales.messages_dir),
            cookie: parsed.locales.cookie,
            header: parsed.locales.header,
        },
        excluded: parsed.routing.excluded,
        auth: AuthConfig { api_base_url, timeout_seconds: parsed.auth.timeout_seconds },
        services,
        client: ClientConfig { store_path: expand_home(&parsed.client.store) },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// `zh`/`en` config pointing at `messages_dir`, no external calls.
#[cfg(test)]
impl Config {
    pub fn test_default(messages_dir: &Path) -> Self {
        Self {
            name: "test".into(),
            bind: "127.0.0.1:0".into(),
            log_level: "info".into(),
            log_file: None,
            locales: LocalesConfig {
                set: LocaleSet::new(["zh", "en"], "en").unwrap(),
                messages_dir: messages_dir.to_path_buf(),
                cookie: default_locale_cookie(),
                header: default_locale_header(),
            },
            excluded: default_excluded(),
            auth: AuthConfig {
                api_base_url: "http://localhost:0".into(),
                timeout_seconds: 1,
            },
            services: HashMap::new(),
            client: ClientConfig { store_path: messages_dir.join("credentials.json") },
        }
    }
}
