use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{AppConfig, AppSettings, BackendMode};
use super::pages::Pages;
use super::traits::SessionStore;
use crate::assistant::Assistant;
use crate::error::Error;
use crate::github::GitHubClient;
use crate::heartbeat::{HeartbeatBackend, LanguageClient};
use crate::oauth::GitHubOAuth;
use crate::pipeline::{FivetranClient, PipelineBackend};
use crate::upstream::UpstreamClient;

/// Process-wide upstream clients, built once at startup.
///
/// Optional integrations are explicit here (`Option`, backend enums) rather
/// than checked ad hoc in handlers.
pub(crate) struct Services {
    pub(crate) oauth: Option<GitHubOAuth>,
    pub(crate) github: GitHubClient,
    pub(crate) assistant: Assistant,
    pub(crate) heartbeat: HeartbeatBackend,
    pub(crate) pipeline: PipelineBackend,
    pub(crate) pages: Pages,
}

impl Services {
    pub(crate) fn new(config: AppConfig) -> Result<(Self, AppSettings), Error> {
        let upstream = UpstreamClient::new(&config.upstream)?;

        match &config.oauth {
            Some(oauth) if oauth.client_secret.is_some() => {
                tracing::info!(client_id = %oauth.client_id(), "GitHub OAuth configured");
            }
            Some(_) => tracing::warn!("GITHUB_CLIENT_SECRET missing, sign-in will fail"),
            None => tracing::warn!("GITHUB_CLIENT_ID missing, sign-in disabled"),
        }
        if config.assistant.is_configured() {
            tracing::info!(model = %config.assistant.model, "AI assistant configured");
        } else {
            tracing::warn!("GOOGLE_API_KEY missing, AI assistant disabled");
        }

        let pipeline = match config.pipeline_backend {
            BackendMode::Live => {
                if config.pipeline.has_credentials() {
                    tracing::info!(connector = %config.pipeline.connector_id, "Fivetran configured");
                } else {
                    tracing::warn!("Fivetran API credentials missing, /pipeline_status will fail");
                }
                PipelineBackend::Live(FivetranClient::new(config.pipeline, upstream.clone()))
            }
            BackendMode::Simulated => {
                tracing::info!("Pipeline status backend: simulated");
                PipelineBackend::Simulated
            }
        };

        let heartbeat = match config.heartbeat_backend {
            BackendMode::Live => {
                tracing::info!("Project heartbeat backend: live");
                HeartbeatBackend::Live(LanguageClient::new(config.language, upstream.clone()))
            }
            BackendMode::Simulated => {
                tracing::info!("Project heartbeat backend: simulated");
                HeartbeatBackend::Simulated
            }
        };

        let services = Self {
            oauth: config
                .oauth
                .map(|oauth| GitHubOAuth::new(oauth, upstream.clone())),
            github: GitHubClient::new(upstream.clone()).with_api_url(config.github_api_url),
            assistant: Assistant::new(config.assistant, upstream),
            heartbeat,
            pipeline,
            pages: Pages::new()?,
        };

        Ok((services, config.settings))
    }
}

/// Shared state for route handlers.
pub(crate) struct AppState<S> {
    pub(crate) services: Arc<Services>,
    pub(crate) session_store: Arc<S>,
    pub(crate) settings: AppSettings,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            services: self.services.clone(),
            session_store: self.session_store.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<S: SessionStore> FromRef<AppState<S>> for Key {
    fn from_ref(state: &AppState<S>) -> Self {
        state.settings.cookie_key.clone()
    }
}
