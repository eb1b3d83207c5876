//! Data-pipeline status from a Fivetran connector.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::Error;
use crate::upstream::{UpstreamClient, default_url, endpoint};

/// Placeholder for fields the upstream response does not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Connector queried when none is configured.
pub const DEFAULT_CONNECTOR_ID: &str = "inductive_stubbly";

/// Fivetran API key pair (HTTP basic auth).
#[derive(Clone)]
pub struct FivetranCredentials {
    api_key: String,
    api_secret: String,
}

impl FivetranCredentials {
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for FivetranCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FivetranCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub(crate) credentials: Option<FivetranCredentials>,
    pub(crate) connector_id: String,
    pub(crate) api_url: Url,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            connector_id: DEFAULT_CONNECTOR_ID.into(),
            api_url: default_url("https://api.fivetran.com"),
        }
    }
}

impl PipelineConfig {
    /// Fivetran API key and secret.
    #[must_use]
    pub fn with_credentials(mut self, credentials: FivetranCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Connector to report on (default `inductive_stubbly`).
    #[must_use]
    pub fn with_connector_id(mut self, connector_id: impl Into<String>) -> Self {
        self.connector_id = connector_id.into();
        self
    }

    /// Override the Fivetran API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    /// Whether live status can be requested at all.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

/// Sync summary returned by `/pipeline_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub sync_state: String,
    pub succeeded_at: String,
    pub failed_at: String,
}

impl PipelineStatus {
    /// Fixed status served by the simulated backend.
    #[must_use]
    pub fn simulated() -> Self {
        Self {
            sync_state: "scheduled".into(),
            succeeded_at: NOT_AVAILABLE.into(),
            failed_at: NOT_AVAILABLE.into(),
        }
    }

    /// Reshape a `GET /v1/connectors/{id}` body.
    #[must_use]
    pub fn from_connector_response(body: &JsonValue) -> Self {
        let data = body.get("data");
        let field = |value: Option<&JsonValue>| match value {
            None | Some(JsonValue::Null) => NOT_AVAILABLE.to_string(),
            Some(JsonValue::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        Self {
            sync_state: field(
                data.and_then(|d| d.get("status"))
                    .and_then(|s| s.get("sync_state")),
            ),
            succeeded_at: field(data.and_then(|d| d.get("succeeded_at"))),
            failed_at: field(data.and_then(|d| d.get("failed_at"))),
        }
    }
}

/// Live Fivetran REST client.
pub struct FivetranClient {
    config: PipelineConfig,
    upstream: UpstreamClient,
}

impl FivetranClient {
    #[must_use]
    pub fn new(config: PipelineConfig, upstream: UpstreamClient) -> Self {
        Self { config, upstream }
    }

    /// Current status of the configured connector.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationMissing`] without credentials (no request is sent),
    /// otherwise the upstream errors of [`UpstreamClient::send_json`].
    pub async fn connector_status(&self) -> Result<PipelineStatus, Error> {
        let credentials = self
            .config
            .credentials
            .as_ref()
            .ok_or(Error::ConfigurationMissing("Fivetran API credentials"))?;

        let url = endpoint(
            &self.config.api_url,
            &["v1", "connectors", &self.config.connector_id],
        )?;
        let request = self
            .upstream
            .http()
            .get(url)
            .basic_auth(&credentials.api_key, Some(&credentials.api_secret))
            .header(reqwest::header::ACCEPT, "application/json");

        let body: JsonValue = self.upstream.send_json("connector status", request).await?;
        Ok(PipelineStatus::from_connector_response(&body))
    }
}

/// Where `/pipeline_status` gets its data, fixed at startup.
pub enum PipelineBackend {
    Live(FivetranClient),
    Simulated,
}

impl PipelineBackend {
    /// # Errors
    ///
    /// See [`FivetranClient::connector_status`].
    pub async fn status(&self) -> Result<PipelineStatus, Error> {
        match self {
            Self::Live(client) => client.connector_status().await,
            Self::Simulated => Ok(PipelineStatus::simulated()),
        }
    }
}
