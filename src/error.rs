/// Errors raised by the gateway and the upstream clients behind it.
///
/// Upstream details (`detail`, `source`) are for server-side logs only; the HTTP
/// layer maps each variant to a public message in [`crate::server::ApiError`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A credential or secret needed for the call is not configured.
    #[error("{0} is not configured")]
    ConfigurationMissing(&'static str),

    /// Network, DNS, TLS or timeout failure talking to an upstream API.
    #[error("{operation}: upstream unreachable: {source}")]
    UpstreamUnreachable {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-2xx status.
    #[error("{operation}: upstream returned HTTP {status}")]
    UpstreamRejected {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// Upstream answered 2xx with a body we could not read.
    #[error("{operation}: invalid upstream response: {source}")]
    UpstreamDecode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// OAuth2 provider reported an error in an otherwise successful response.
    #[error("OAuth2 error: {0}")]
    OAuth(String),

    /// No bearer credential in the current session.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The session has no selected repository.
    #[error("No repository selected")]
    NoRepositorySelected,

    /// A chat request carried no messages.
    ///
    /// `/chat` turns this into an apology reply; it never reaches [`crate::server::ApiError`].
    #[error("Conversation has no messages")]
    EmptyConversation,

    /// Session store operation failed.
    #[error("Session store error: {0}")]
    Session(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}
