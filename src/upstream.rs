use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const MAX_DETAIL_CHARS: usize = 512;

/// Settings for the shared outbound HTTP client.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Skip TLS certificate validation. Off unless explicitly enabled.
    pub accept_invalid_certs: bool,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            accept_invalid_certs: false,
        }
    }
}

/// Outbound HTTP client shared by every upstream integration.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the TLS backend cannot be initialized.
    pub fn new(settings: &UpstreamSettings) -> Result<Self, Error> {
        if settings.accept_invalid_certs {
            tracing::warn!("TLS certificate validation is DISABLED for upstream requests");
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;

        Ok(Self { http })
    }

    /// Underlying `reqwest` client, for building requests.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send `request` and decode a 2xx JSON body into `T`.
    ///
    /// # Errors
    ///
    /// [`Error::UpstreamUnreachable`] on transport failure,
    /// [`Error::UpstreamRejected`] on a non-2xx status and
    /// [`Error::UpstreamDecode`] if the body is not the expected JSON.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let response = request
            .send()
            .await
            .map_err(|source| Error::UpstreamUnreachable { operation, source })?;

        let response = ensure_success(response, operation).await?;

        let body = response
            .bytes()
            .await
            .map_err(|source| Error::UpstreamUnreachable { operation, source })?;

        serde_json::from_slice(&body).map_err(|source| Error::UpstreamDecode { operation, source })
    }
}

/// Checks HTTP response status; returns the response on success or an error with details.
async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(Error::UpstreamRejected {
        operation,
        status,
        detail: body.chars().take(MAX_DETAIL_CHARS).collect(),
    })
}

/// Append path segments to `base`, percent-encoding each one.
///
/// Unlike [`Url::join`] this keeps any path prefix already on `base`
/// (`https://ghe.example.com/api/v3` + `["user"]` → `.../api/v3/user`).
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::Config(format!("{base} cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Parse a built-in default URL.
pub(crate) fn default_url(s: &'static str) -> Url {
    Url::parse(s).unwrap_or_else(|e| panic!("invalid built-in URL {s}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_to_root() {
        let base: Url = "https://api.github.com".parse().unwrap();
        let url = endpoint(&base, &["user", "repos"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/user/repos");
    }

    #[test]
    fn endpoint_keeps_prefix_path() {
        let base: Url = "https://ghe.example.com/api/v3".parse().unwrap();
        let url = endpoint(&base, &["user"]).unwrap();
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/user");

        let base: Url = "https://ghe.example.com/api/v3/".parse().unwrap();
        let url = endpoint(&base, &["user"]).unwrap();
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/user");
    }

    #[test]
    fn endpoint_encodes_segments() {
        let base: Url = "https://api.github.com".parse().unwrap();
        let url = endpoint(&base, &["repos", "a b", "c/d"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/a%20b/c%2Fd");
    }

    #[test]
    fn endpoint_rejects_non_base_url() {
        let base: Url = "mailto:someone@example.com".parse().unwrap();
        assert!(matches!(endpoint(&base, &["x"]), Err(Error::Config(_))));
    }

    #[test]
    fn default_settings_validate_tls() {
        let settings = UpstreamSettings::default();
        assert!(!settings.accept_invalid_certs);
        assert_eq!(settings.timeout, Duration::from_secs(15));
    }
}
