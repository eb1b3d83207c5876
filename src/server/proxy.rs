use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use super::cookies;
use super::error::ApiError;
use super::extractor::CurrentSession;
use super::state::AppState;
use super::traits::{SessionStore, StoreError};
use super::types::SessionField;
use crate::assistant::ChatMessage;
use crate::error::Error;
use crate::heartbeat::{COMMIT_SAMPLE, Heartbeat, HeartbeatBackend};
use crate::pipeline::PipelineStatus;
use crate::types::RepoRef;

const PIPELINE_NOT_CONFIGURED: &str = "Fivetran API credentials are not configured on the server.";
const PIPELINE_UNREACHABLE: &str = "Failed to communicate with the Fivetran API.";

const CHAT_NOT_CONFIGURED: &str = "Sorry, the AI Assistant is not configured on the server.";
const CHAT_EMPTY: &str = "Sorry, I didn't receive a message. What would you like to ask?";
const CHAT_UNREADABLE: &str = "Sorry, I couldn't read that request. Please try again.";
const CHAT_FAILED: &str = "Sorry, an AI error occurred. Please try again later.";

pub(super) fn routes<S: SessionStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/set_repo/{owner}/{repo_name}", get(set_repo::<S>))
        .route("/project_heartbeat", get(project_heartbeat::<S>))
        .route("/pipeline_status", get(pipeline_status::<S>))
        .route("/chat", post(chat::<S>))
        .route("/api/session", get(session_info))
        .route("/healthz", get(healthz))
}

fn store_error(e: StoreError) -> ApiError {
    Error::Session(e.to_string()).into()
}

// ── Repository selection ───────────────────────────────────────────

async fn set_repo<S: SessionStore>(
    State(state): State<AppState<S>>,
    jar: PrivateCookieJar,
    current: CurrentSession,
    Path((owner, repo_name)): Path<(String, String)>,
) -> Result<(PrivateCookieJar, Json<JsonValue>), ApiError> {
    let repo = RepoRef::new(owner, repo_name);
    let store = &state.session_store;

    let updated = match &current.id {
        Some(id) => store
            .set_field(id, SessionField::SelectedRepo(Some(repo.clone())))
            .await
            .map_err(store_error)?,
        None => false,
    };

    // No server-side session before sign-in.
    let jar = if updated {
        jar
    } else {
        cookies::add_selected_repo(
            jar,
            &repo,
            state.settings.session_ttl,
            state.settings.secure_cookies,
        )
    };

    tracing::info!(repo = %repo, "Repository selected");
    Ok((jar, Json(json!({ "status": "success" }))))
}

// ── Heartbeat ──────────────────────────────────────────────────────

async fn project_heartbeat<S: SessionStore>(
    State(state): State<AppState<S>>,
    current: CurrentSession,
) -> Result<Json<Heartbeat>, ApiError> {
    let language = match &state.services.heartbeat {
        HeartbeatBackend::Simulated => {
            tracing::debug!("Serving simulated project heartbeat");
            return Ok(Json(Heartbeat::simulated()));
        }
        HeartbeatBackend::Live(language) => language,
    };

    let auth = current.authenticated()?;
    let repo = auth
        .session
        .selected_repo
        .as_ref()
        .ok_or(Error::NoRepositorySelected)?;

    let messages = state
        .services
        .github
        .recent_commit_messages(&auth.token, repo, COMMIT_SAMPLE)
        .await?;
    let heartbeat = language.analyze_activity(&messages).await?;

    tracing::info!(repo = %repo, label = %heartbeat.sentiment_label, "Project heartbeat computed");
    Ok(Json(heartbeat))
}

// ── Pipeline status ────────────────────────────────────────────────

async fn pipeline_status<S: SessionStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<PipelineStatus>, ApiError> {
    state.services.pipeline.status().await.map(Json).map_err(|e| {
        let message = match &e {
            Error::ConfigurationMissing(_) => PIPELINE_NOT_CONFIGURED,
            _ => PIPELINE_UNREACHABLE,
        };
        ApiError::from(e).with_message(message)
    })
}

// ── Chat ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatReply {
    reply: String,
}

/// Always answers 200 with a `reply`; failures become an apology.
async fn chat<S: SessionStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatReply> {
    let assistant = &state.services.assistant;

    let reply = if !assistant.is_configured() {
        CHAT_NOT_CONFIGURED.to_string()
    } else {
        match payload {
            Err(rejection) => {
                tracing::warn!(error = %rejection, "Unreadable chat request");
                CHAT_UNREADABLE.to_string()
            }
            Ok(Json(request)) => match assistant.reply(&request.messages).await {
                Ok(text) => text,
                Err(Error::EmptyConversation) => CHAT_EMPTY.to_string(),
                Err(Error::ConfigurationMissing(_)) => CHAT_NOT_CONFIGURED.to_string(),
                Err(e) => {
                    tracing::error!(error = %e, "AI assistant request failed");
                    CHAT_FAILED.to_string()
                }
            },
        }
    };

    Json(ChatReply { reply })
}

// ── Session / health ───────────────────────────────────────────────

async fn session_info(current: CurrentSession) -> Json<JsonValue> {
    let session = &current.session;
    let authenticated = session.is_authenticated();
    let user = session
        .user_profile
        .as_ref()
        .filter(|_| authenticated)
        .map(|p| json!({ "login": p.login, "id": p.id, "avatar_url": p.avatar_url }));

    Json(json!({
        "authenticated": authenticated,
        "user": user,
        "selected_repo": session.selected_repo,
    }))
}

async fn healthz() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}
