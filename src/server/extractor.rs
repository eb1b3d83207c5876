use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::cookies;
use super::error::ApiError;
use super::state::AppState;
use super::traits::SessionStore;
use super::types::Session;
use crate::error::Error;
use crate::types::{AccessToken, SessionId};

/// The caller's session, or an anonymous one.
///
/// Never rejects on a missing or unknown cookie: `id` is `None` and `session`
/// holds only the repository selected before sign-in, if any. Use it on pages
/// that behave differently for signed-in users.
///
/// ```rust,ignore
/// async fn index(current: CurrentSession) -> impl IntoResponse {
///     if current.session.is_authenticated() { /* ... */ }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: Option<SessionId>,
    pub session: Session,
}

impl CurrentSession {
    fn anonymous(jar: &PrivateCookieJar) -> Self {
        let session = match cookies::selected_repo(jar) {
            Some(repo) => Session::new().with_selected_repo(repo),
            None => Session::new(),
        };
        Self { id: None, session }
    }

    /// Require a usable bearer credential.
    ///
    /// # Errors
    ///
    /// [`Error::Unauthenticated`] if the session has none.
    pub fn authenticated(self) -> Result<AuthSession, Error> {
        let token = self.session.credential().cloned().ok_or(Error::Unauthenticated)?;
        let id = self.id.ok_or(Error::Unauthenticated)?;
        Ok(AuthSession {
            id,
            token,
            session: self.session,
        })
    }
}

impl<S: SessionStore> FromRequestParts<AppState<S>> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});

        let Some(id) = cookies::session_id(&jar, &state.settings.session_cookie_name) else {
            return Ok(Self::anonymous(&jar));
        };

        let found = state
            .session_store
            .find(&id)
            .await
            .map_err(|e| Error::Session(e.to_string()))?;

        Ok(match found {
            Some(session) => Self {
                id: Some(id),
                session,
            },
            None => Self::anonymous(&jar),
        })
    }
}

/// A session holding a usable bearer credential.
///
/// Obtained from [`CurrentSession::authenticated`]; each endpoint decides
/// whether a missing credential means a redirect or a 401.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: SessionId,
    pub token: AccessToken,
    pub session: Session,
}
