use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use axum_extra::extract::cookie::Key;
use time::Duration;
use url::Url;

use super::store::DEFAULT_SESSION_TTL;
use crate::assistant::AssistantConfig;
use crate::error::Error;
use crate::heartbeat::LanguageConfig;
use crate::oauth::OAuthConfig;
use crate::pipeline::{FivetranCredentials, PipelineConfig};
use crate::upstream::{UpstreamSettings, default_url};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
const CLIENT_ID_PLACEHOLDER: &str = "YOUR_GITHUB_CLIENT_ID";

/// Live upstream integration or fixed simulated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Live,
    Simulated,
}

impl FromStr for BackendMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "simulated" | "simulation" | "stub" => Ok(Self::Simulated),
            other => Err(Error::Config(format!(
                "unknown backend mode '{other}' (expected 'live' or 'simulated')"
            ))),
        }
    }
}

/// Cookie and session settings shared by config and runtime state.
#[derive(Clone)]
pub(crate) struct AppSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl: Duration,
    pub(crate) secure_cookies: bool,
}

impl AppSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__analyst_session".into(),
            session_ttl: DEFAULT_SESSION_TTL,
            secure_cookies: true,
        }
    }
}

/// Application configuration.
///
/// Every upstream credential is optional: a missing one disables only the
/// endpoints that need it. Use [`from_env()`](AppConfig::from_env) for
/// convention-based setup, or [`new()`](AppConfig::new) with `with_*` methods.
pub struct AppConfig {
    pub(super) oauth: Option<OAuthConfig>,
    pub(super) github_api_url: Url,
    pub(super) assistant: AssistantConfig,
    pub(super) language: LanguageConfig,
    pub(super) pipeline: PipelineConfig,
    pub(super) heartbeat_backend: BackendMode,
    pub(super) pipeline_backend: BackendMode,
    pub(super) upstream: UpstreamSettings,
    pub(super) settings: AppSettings,
    pub(super) bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    /// Configuration with no upstream credentials and default endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self {
            oauth: None,
            github_api_url: default_url("https://api.github.com"),
            assistant: AssistantConfig::default(),
            language: LanguageConfig::default(),
            pipeline: PipelineConfig::default(),
            heartbeat_backend: BackendMode::Simulated,
            pipeline_backend: BackendMode::Live,
            upstream: UpstreamSettings::default(),
            settings: AppSettings::defaults(),
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|e| panic!("invalid built-in bind address: {e}")),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Credentials (all optional)
    /// - `GITHUB_CLIENT_ID`, `GITHUB_CLIENT_SECRET`: GitHub OAuth app
    /// - `GOOGLE_API_KEY`: Gemini chat and Natural Language API
    /// - `FIVETRAN_API_KEY`, `FIVETRAN_API_SECRET`: pipeline status
    ///
    /// # Other settings
    /// - `GITHUB_REDIRECT_URI`, `GITHUB_SCOPES` (comma-separated)
    /// - `GITHUB_AUTH_URL`, `GITHUB_TOKEN_URL`, `GITHUB_API_URL`, `GEMINI_API_URL`,
    ///   `LANGUAGE_API_URL`, `FIVETRAN_API_URL`: endpoint overrides
    /// - `GEMINI_MODEL`, `FIVETRAN_CONNECTOR_ID`
    /// - `HEARTBEAT_BACKEND`, `PIPELINE_BACKEND`: `live` or `simulated`
    /// - `COOKIE_KEY`: cookie encryption key (at least 64 bytes); ephemeral if unset
    /// - `DEV_MODE`: `"1"`/`"true"` disables the `Secure` cookie attribute
    /// - `SESSION_TTL_HOURS`, `UPSTREAM_TIMEOUT_SECS`
    /// - `UPSTREAM_ACCEPT_INVALID_CERTS`: disable TLS validation (never the default)
    /// - `BIND_ADDR` (default `127.0.0.1:5000`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is present but malformed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env()`](AppConfig::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let env = Env(&lookup);
        let mut config = Self::new();

        if let Some(client_id) = env
            .var("GITHUB_CLIENT_ID")
            .filter(|id| id != CLIENT_ID_PLACEHOLDER)
        {
            let mut oauth = OAuthConfig::new(client_id);
            if let Some(secret) = env.var("GITHUB_CLIENT_SECRET") {
                oauth = oauth.with_client_secret(secret);
            }
            if let Some(url) = env.url("GITHUB_REDIRECT_URI")? {
                oauth = oauth.with_redirect_uri(url);
            }
            if let Some(url) = env.url("GITHUB_AUTH_URL")? {
                oauth = oauth.with_auth_url(url);
            }
            if let Some(url) = env.url("GITHUB_TOKEN_URL")? {
                oauth = oauth.with_token_url(url);
            }
            if let Some(scopes) = env.var("GITHUB_SCOPES") {
                oauth = oauth.with_scopes(
                    scopes
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                );
            }
            config = config.with_oauth(oauth);
        }
        if let Some(url) = env.url("GITHUB_API_URL")? {
            config = config.with_github_api_url(url);
        }

        if let Some(key) = env.var("GOOGLE_API_KEY") {
            config.assistant = config.assistant.with_api_key(key.clone());
            config.language = config.language.with_api_key(key);
        }
        if let Some(model) = env.var("GEMINI_MODEL") {
            config.assistant = config.assistant.with_model(model);
        }
        if let Some(url) = env.url("GEMINI_API_URL")? {
            config.assistant = config.assistant.with_api_url(url);
        }
        if let Some(url) = env.url("LANGUAGE_API_URL")? {
            config.language = config.language.with_api_url(url);
        }

        if let (Some(key), Some(secret)) =
            (env.var("FIVETRAN_API_KEY"), env.var("FIVETRAN_API_SECRET"))
        {
            config.pipeline = config
                .pipeline
                .with_credentials(FivetranCredentials::new(key, secret));
        }
        if let Some(connector_id) = env.var("FIVETRAN_CONNECTOR_ID") {
            config.pipeline = config.pipeline.with_connector_id(connector_id);
        }
        if let Some(url) = env.url("FIVETRAN_API_URL")? {
            config.pipeline = config.pipeline.with_api_url(url);
        }

        if let Some(mode) = env.parse::<BackendMode>("HEARTBEAT_BACKEND")? {
            config = config.with_heartbeat_backend(mode);
        }
        if let Some(mode) = env.parse::<BackendMode>("PIPELINE_BACKEND")? {
            config = config.with_pipeline_backend(mode);
        }

        if let Some(key) = env.var("COOKIE_KEY") {
            let key = Key::try_from(key.as_bytes()).map_err(|_| {
                Error::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?;
            config = config.with_cookie_key(key);
        }
        if env.flag("DEV_MODE")? {
            config = config.with_secure_cookies(false);
        }
        if let Some(hours) = env.parse::<u32>("SESSION_TTL_HOURS")? {
            config = config.with_session_ttl(Duration::hours(i64::from(hours)));
        }

        if let Some(secs) = env.parse::<u64>("UPSTREAM_TIMEOUT_SECS")? {
            config.upstream.timeout = StdDuration::from_secs(secs);
        }
        config.upstream.accept_invalid_certs = env.flag("UPSTREAM_ACCEPT_INVALID_CERTS")?;

        if let Some(addr) = env.parse::<SocketAddr>("BIND_ADDR")? {
            config.bind_addr = addr;
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_oauth(mut self, oauth: OAuthConfig) -> Self {
        self.oauth = Some(oauth);
        self
    }

    #[must_use]
    pub fn with_github_api_url(mut self, url: Url) -> Self {
        self.github_api_url = url;
        self
    }

    #[must_use]
    pub fn with_assistant(mut self, assistant: AssistantConfig) -> Self {
        self.assistant = assistant;
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: LanguageConfig) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn with_heartbeat_backend(mut self, mode: BackendMode) -> Self {
        self.heartbeat_backend = mode;
        self
    }

    #[must_use]
    pub fn with_pipeline_backend(mut self, mode: BackendMode) -> Self {
        self.pipeline_backend = mode;
        self
    }

    #[must_use]
    pub fn with_upstream(mut self, upstream: UpstreamSettings) -> Self {
        self.upstream = upstream;
        self
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.settings.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Session lifetime; use the same value for the session store.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.settings.session_ttl
    }
}

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn var(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn url(&self, name: &str) -> Result<Option<Url>, Error> {
        self.parse::<Url>(name)
    }

    fn parse<T>(&self, name: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.var(name)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|e| Error::Config(format!("{name}: {e}")))
            })
            .transpose()
    }

    fn flag(&self, name: &str) -> Result<bool, Error> {
        match self.var(name).map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("0" | "false" | "no" | "off") => Ok(false),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some(other) => Err(Error::Config(format!("{name}: expected a boolean, got '{other}'"))),
        }
    }
}
