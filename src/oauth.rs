use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::pkce;
use crate::types::AccessToken;
use crate::upstream::{UpstreamClient, default_url};

/// GitHub OAuth2 app configuration.
///
/// Required fields are constructor parameters — no runtime "missing field" errors.
/// The client secret is optional here because its absence only disables the
/// token exchange; [`GitHubOAuth::exchange_code`] reports it.
///
/// ```rust,ignore
/// let config = OAuthConfig::new("Iv1.abc")
///     .with_client_secret(secret)
///     .with_redirect_uri("http://localhost:5000/callback".parse()?);
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: Option<String>,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) redirect_uri: Option<Url>,
    pub(crate) scopes: Vec<String>,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("redirect_uri", &self.redirect_uri.as_ref().map(Url::as_str))
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl OAuthConfig {
    /// Config for a GitHub OAuth app, pointed at github.com.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            auth_url: default_url("https://github.com/login/oauth/authorize"),
            token_url: default_url("https://github.com/login/oauth/access_token"),
            redirect_uri: None,
            scopes: Vec::new(),
        }
    }

    /// `OAuth2` client secret, required for the code exchange.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token exchange endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Callback URL. When unset GitHub uses the one registered with the app.
    #[must_use]
    pub fn with_redirect_uri(mut self, url: Url) -> Self {
        self.redirect_uri = Some(url);
        self
    }

    /// OAuth scopes (default: none, i.e. public read access).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authorization endpoint the browser is sent to.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Token exchange endpoint.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Requested scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Authorization URL with the `state` and PKCE verifier the callback must see again.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// Body of GitHub's token endpoint.
///
/// GitHub reports failures such as `bad_verification_code` with HTTP 200,
/// so every field is optional.
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// GitHub OAuth2 authorization-code client.
pub struct GitHubOAuth {
    config: OAuthConfig,
    upstream: UpstreamClient,
}

impl GitHubOAuth {
    #[must_use]
    pub fn new(config: OAuthConfig, upstream: UpstreamClient) -> Self {
        Self { config, upstream }
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Generate an authorization URL with fresh `state` and PKCE parameters.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let state = pkce::generate_state();
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::generate_code_challenge(&code_verifier);

        let mut url = self.config.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            if let Some(redirect_uri) = &self.config.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri.as_str());
            }
            if !self.config.scopes.is_empty() {
                query.append_pair("scope", &self.config.scopes.join(" "));
            }
            query
                .append_pair("state", &state)
                .append_pair("code_challenge", &code_challenge)
                .append_pair("code_challenge_method", "S256");
        }

        AuthorizationRequest {
            url: url.into(),
            state,
            code_verifier,
        }
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationMissing`] without a client secret (no request is sent),
    /// the upstream errors of [`UpstreamClient::send_json`], or
    /// [`Error::OAuth`] if GitHub returns an error body or no token.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<AccessToken, Error> {
        let client_secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or(Error::ConfigurationMissing("GITHUB_CLIENT_SECRET"))?;

        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", client_secret),
            ("code", code),
            ("code_verifier", code_verifier),
        ];
        if let Some(redirect_uri) = &self.config.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }

        let request = self
            .upstream
            .http()
            .post(self.config.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params);

        let response: TokenResponse = self.upstream.send_json("token exchange", request).await?;

        if let Some(error) = response.error {
            let description = response.error_description.unwrap_or_default();
            return Err(Error::OAuth(format!("{error}: {description}")));
        }

        response
            .access_token
            .map(AccessToken::new)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::OAuth("token endpoint returned no access_token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::UpstreamSettings;

    fn client(config: OAuthConfig) -> GitHubOAuth {
        GitHubOAuth::new(config, UpstreamClient::new(&UpstreamSettings::default()).unwrap())
    }

    #[test]
    fn test_authorization_url_contains_state_and_pkce() {
        let req = client(OAuthConfig::new("test-client")).authorization_url();

        assert!(req.url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(req.url.contains("client_id=test-client"));
        assert!(req.url.contains(&format!("state={}", req.state)));
        assert!(req.url.contains("code_challenge="));
        assert!(req.url.contains("code_challenge_method=S256"));
        assert!(!req.url.contains("scope="));
        assert!(!req.url.contains("redirect_uri="));
    }

    #[test]
    fn test_authorization_url_unique_per_call() {
        let oauth = client(OAuthConfig::new("test-client"));
        let req1 = oauth.authorization_url();
        let req2 = oauth.authorization_url();

        assert_ne!(req1.state, req2.state);
        assert_ne!(req1.code_verifier, req2.code_verifier);
    }

    #[test]
    fn test_authorization_url_with_overrides() {
        let config = OAuthConfig::new("app")
            .with_redirect_uri("http://localhost:5000/callback".parse().unwrap())
            .with_scopes(vec!["read:user".into(), "repo".into()]);
        let req = client(config).authorization_url();

        assert!(req.url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fcallback"));
        assert!(req.url.contains("scope=read%3Auser+repo"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = OAuthConfig::new("app").with_client_secret("shh");
        let debug = format!("{config:?}");
        assert!(!debug.contains("shh"));
        assert!(debug.contains("***"));
    }

    #[tokio::test]
    async fn test_exchange_without_secret_is_configuration_missing() {
        let err = client(OAuthConfig::new("app"))
            .exchange_code("code", "verifier")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing("GITHUB_CLIENT_SECRET")));
    }
}
