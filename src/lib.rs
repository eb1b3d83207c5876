//! GitHub Analyst backend.
//!
//! Signs users in with GitHub OAuth, keeps their bearer credential in a
//! server-side session, and serves a small set of JSON endpoints that proxy
//! (or simulate) GitHub, Fivetran and Gemini.

pub mod assistant;
pub mod error;
pub mod github;
pub mod heartbeat;
pub mod oauth;
pub mod pipeline;
pub mod pkce;
pub mod server;
pub mod types;
pub mod upstream;

// Re-exports for convenient access
pub use error::Error;
pub use oauth::{AuthorizationRequest, GitHubOAuth, OAuthConfig};
pub use server::{AppConfig, MemorySessionStore, SessionStore, app_routes};
pub use types::{AccessToken, RepoRef, Repository, SessionId, UserProfile};
