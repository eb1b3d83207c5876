//! Axum application: GitHub sign-in, session handling and proxy endpoints.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use github_analyst::server::{AppConfig, MemorySessionStore, app_routes};
//!
//! let config = AppConfig::from_env()?;
//! let store = MemorySessionStore::with_ttl(config.session_ttl());
//! let app = app_routes(config, store)?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! The session cookie only carries an encrypted session ID; the access token
//! and profile stay in the [`SessionStore`].

mod config;
mod cookies;
mod error;
mod extractor;
mod pages;
mod proxy;
mod routes;
mod state;
mod store;
mod traits;
mod types;

pub use config::{AppConfig, BackendMode};
pub use error::ApiError;
pub use extractor::{AuthSession, CurrentSession};
pub use routes::app_routes;
pub use store::{DEFAULT_SESSION_TTL, MemorySessionStore};
pub use traits::{SessionStore, StoreError};
pub use types::{Session, SessionField};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
