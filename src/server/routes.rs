use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use super::config::AppConfig;
use super::cookies::{self, CALLBACK_PATH};
use super::error::ApiError;
use super::extractor::CurrentSession;
use super::proxy;
use super::state::{AppState, Services};
use super::traits::SessionStore;
use super::types::Session;
use crate::error::Error;
use crate::types::SessionId;

const LOGIN_PATH: &str = "/login";
const DASHBOARD_PATH: &str = "/dashboard";

/// Build the application router.
///
/// Upstream clients are created here, once, and shared by all requests.
///
/// # Errors
///
/// Returns [`Error::Config`] if the HTTP client or page templates cannot be built.
pub fn app_routes<S>(config: AppConfig, session_store: S) -> Result<Router, Error>
where
    S: SessionStore,
{
    let (services, settings) = Services::new(config)?;

    let state = AppState {
        services: Arc::new(services),
        session_store: Arc::new(session_store),
        settings,
    };

    Ok(Router::new()
        .route("/", get(index::<S>))
        .route(LOGIN_PATH, get(login::<S>))
        .route(CALLBACK_PATH, get(callback::<S>))
        .route("/logout", get(logout::<S>).post(logout::<S>))
        .route(DASHBOARD_PATH, get(dashboard::<S>))
        .merge(proxy::routes::<S>())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

// ── Landing ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct IndexParams {
    error: Option<String>,
}

async fn index<S: SessionStore>(
    State(state): State<AppState<S>>,
    current: CurrentSession,
    Query(params): Query<IndexParams>,
) -> Result<Response, ApiError> {
    if current.session.is_authenticated() {
        return Ok(Redirect::to(DASHBOARD_PATH).into_response());
    }
    let page = state
        .services
        .pages
        .landing(LOGIN_PATH, params.error.as_deref())?;
    Ok(page.into_response())
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<S: SessionStore>(
    State(state): State<AppState<S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let Some(oauth) = &state.services.oauth else {
        tracing::warn!("Login attempted but GitHub OAuth is not configured");
        return (jar, login_error("oauth_not_configured"));
    };

    let auth_req = oauth.authorization_url();
    let jar = cookies::add_oauth_flow(
        jar,
        &auth_req.code_verifier,
        &auth_req.state,
        state.settings.secure_cookies,
    );

    (jar, Redirect::to(&auth_req.url))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<S: SessionStore>(
    State(state): State<AppState<S>>,
    jar: PrivateCookieJar,
    current: CurrentSession,
    Query(params): Query<CallbackParams>,
) -> (PrivateCookieJar, Redirect) {
    let outcome = complete_login(&state, &jar, current, params).await;
    let jar = cookies::clear_oauth_flow(jar);

    match outcome {
        Ok(session_id) => {
            let jar = cookies::add_session(
                cookies::clear_selected_repo(jar),
                &state.settings.session_cookie_name,
                &session_id,
                state.settings.session_ttl,
                state.settings.secure_cookies,
            );
            (jar, Redirect::to(DASHBOARD_PATH))
        }
        Err(code) => (jar, login_error(code)),
    }
}

/// Run the code exchange and create the signed-in session.
///
/// On failure returns the error code shown on the landing page; the session
/// is left untouched.
async fn complete_login<S: SessionStore>(
    state: &AppState<S>,
    jar: &PrivateCookieJar,
    previous: CurrentSession,
    params: CallbackParams,
) -> Result<SessionId, &'static str> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from GitHub");
        return Err(if error == "access_denied" {
            "access_denied"
        } else {
            "authorization_failed"
        });
    }

    let oauth = state
        .services
        .oauth
        .as_ref()
        .ok_or("oauth_not_configured")?;

    let code = params.code.ok_or("missing_code")?;
    let received_state = params.state.ok_or("state_mismatch")?;
    let stored_state = cookies::oauth_state(jar).ok_or("state_mismatch")?;

    if received_state != stored_state {
        tracing::warn!("OAuth state mismatch");
        return Err("state_mismatch");
    }

    let code_verifier = cookies::pkce_verifier(jar).ok_or("missing_verifier")?;

    let token = oauth
        .exchange_code(&code, &code_verifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            "token_exchange_failed"
        })?;

    let profile = state.services.github.current_user(&token).await.map_err(|e| {
        tracing::error!(error = %e, "Userinfo request failed");
        "userinfo_failed"
    })?;

    let login = profile.login.clone();
    let mut session = Session::new()
        .with_access_token(token)
        .with_user_profile(profile);
    if let Some(repo) = previous.session.selected_repo {
        session = session.with_selected_repo(repo);
    }

    let session_id = state.session_store.create(session).await.map_err(|e| {
        tracing::error!(error = %e, "Session creation failed");
        "session_failed"
    })?;

    // Fresh ID on sign-in; drop the anonymous one.
    if let Some(old) = previous.id {
        if let Err(e) = state.session_store.delete(&old).await {
            tracing::warn!(error = %e, "Failed to delete pre-login session");
        }
    }

    tracing::info!(login = %login, "GitHub OAuth2 login successful");
    Ok(session_id)
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S: SessionStore>(
    State(state): State<AppState<S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let cookie_name = &state.settings.session_cookie_name;
    if let Some(session_id) = cookies::session_id(&jar, cookie_name) {
        if let Err(e) = state.session_store.delete(&session_id).await {
            tracing::warn!(error = %e, "Session deletion failed during logout");
        }
    }

    let jar = cookies::clear_selected_repo(cookies::clear_session(jar, cookie_name));
    (jar, Redirect::to("/"))
}

// ── Dashboard ──────────────────────────────────────────────────────

async fn dashboard<S: SessionStore>(
    State(state): State<AppState<S>>,
    current: CurrentSession,
) -> Result<Response, ApiError> {
    let Ok(auth) = current.authenticated() else {
        return Ok(Redirect::to("/").into_response());
    };

    let profile = auth.session.user_profile.as_ref();
    let username = profile.map_or("Guest", |p| p.login.as_str());
    let avatar_url = profile.and_then(|p| p.avatar_url.as_deref());

    let (repos, notice) = match state.services.github.list_repositories(&auth.token).await {
        Ok(repos) => (repos, None),
        Err(e) => {
            tracing::warn!(error = %e, "Error fetching repositories");
            (Vec::new(), Some("Could not load your repositories from GitHub."))
        }
    };

    let page = state
        .services
        .pages
        .dashboard(username, avatar_url, &repos, notice)?;
    Ok(page.into_response())
}

// ── Helpers ────────────────────────────────────────────────────────

fn login_error(code: &str) -> Redirect {
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("/?error={encoded}"))
}
