use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::types::{RepoRef, SessionId};

const PKCE_COOKIE_NAME: &str = "__analyst_pkce";
const STATE_COOKIE_NAME: &str = "__analyst_state";
const REPO_COOKIE_NAME: &str = "__analyst_repo";

/// Path the OAuth flow cookies are scoped to.
pub(super) const CALLBACK_PATH: &str = "/callback";

fn flow_cookie(name: &'static str, value: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(CALLBACK_PATH)
        .max_age(Duration::minutes(5))
        .build()
}

fn removal(name: impl Into<String>, path: &'static str) -> Cookie<'static> {
    Cookie::build((name.into(), ""))
        .path(path)
        .max_age(Duration::ZERO)
        .build()
}

/// Store the PKCE verifier and `state` for the callback to check.
pub(super) fn add_oauth_flow(
    jar: PrivateCookieJar,
    code_verifier: &str,
    state: &str,
    secure: bool,
) -> PrivateCookieJar {
    jar.add(flow_cookie(PKCE_COOKIE_NAME, code_verifier, secure))
        .add(flow_cookie(STATE_COOKIE_NAME, state, secure))
}

pub(super) fn clear_oauth_flow(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(removal(PKCE_COOKIE_NAME, CALLBACK_PATH))
        .remove(removal(STATE_COOKIE_NAME, CALLBACK_PATH))
}

pub(super) fn pkce_verifier(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(PKCE_COOKIE_NAME).map(|c| c.value().to_string())
}

pub(super) fn oauth_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Set the session cookie.
pub(super) fn add_session(
    jar: PrivateCookieJar,
    name: &str,
    session_id: &SessionId,
    ttl: Duration,
    secure: bool,
) -> PrivateCookieJar {
    let cookie = Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(ttl)
        .build();
    jar.add(cookie)
}

pub(super) fn clear_session(jar: PrivateCookieJar, name: &str) -> PrivateCookieJar {
    jar.remove(removal(name, "/"))
}

/// Session ID carried by the request, if the cookie decrypts.
pub(super) fn session_id(jar: &PrivateCookieJar, name: &str) -> Option<SessionId> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .map(SessionId)
}

/// Remember a repository selection made before sign-in.
///
/// Anonymous visitors get no server-side session; the selection rides in this
/// encrypted cookie until the callback moves it into the new session.
pub(super) fn add_selected_repo(
    jar: PrivateCookieJar,
    repo: &RepoRef,
    ttl: Duration,
    secure: bool,
) -> PrivateCookieJar {
    let Ok(value) = serde_json::to_string(repo) else {
        return jar;
    };
    let cookie = Cookie::build((REPO_COOKIE_NAME, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(ttl)
        .build();
    jar.add(cookie)
}

pub(super) fn selected_repo(jar: &PrivateCookieJar) -> Option<RepoRef> {
    jar.get(REPO_COOKIE_NAME)
        .and_then(|c| serde_json::from_str(c.value()).ok())
}

pub(super) fn clear_selected_repo(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(removal(REPO_COOKIE_NAME, "/"))
}
