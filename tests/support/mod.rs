#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use axum::body::Body;
use axum::extract::{Form, Path};
use axum::http::{HeaderMap, Request, Response, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use github_analyst::assistant::AssistantConfig;
use github_analyst::heartbeat::LanguageConfig;
use github_analyst::pipeline::{FivetranCredentials, PipelineConfig};
use github_analyst::server::{AppConfig, CookieKey, MemorySessionStore, app_routes};
use github_analyst::OAuthConfig;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

pub const GOOD_CODE: &str = "good-code";
pub const ACCESS_TOKEN: &str = "gho_test_token";
pub const GOOGLE_KEY: &str = "g-key";
pub const BROKEN_CONNECTOR: &str = "broken_connector";
pub const EMPTY_REPO: &str = "empty";

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {ACCESS_TOKEN}").as_str())
}

fn google_key_ok(headers: &HeaderMap) -> bool {
    headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) == Some(GOOGLE_KEY)
}

fn unauthorized() -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" }))).into_response()
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    let valid = form.get("code").map(String::as_str) == Some(GOOD_CODE)
        && form.get("client_secret").map(String::as_str) == Some("client-secret")
        && form.get("code_verifier").is_some_and(|v| v.len() >= 43);
    if valid {
        Json(json!({ "access_token": ACCESS_TOKEN, "token_type": "bearer", "scope": "repo" }))
    } else {
        Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }))
    }
}

async fn user(headers: HeaderMap) -> axum::response::Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!({
        "login": "octocat",
        "id": 583231,
        "avatar_url": "https://avatars.example.com/u/583231",
        "name": "The Octocat",
        "public_repos": 8
    }))
    .into_response()
}

async fn user_repos(headers: HeaderMap) -> axum::response::Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!([
        {
            "name": "hello-world",
            "full_name": "octocat/hello-world",
            "owner": { "login": "octocat" },
            "html_url": "https://github.com/octocat/hello-world",
            "description": "My first repository",
            "private": false,
            "language": "Rust",
            "stargazers_count": 42,
            "updated_at": "2024-05-01T10:00:00Z"
        },
        {
            "name": "spoon-knife",
            "full_name": "octocat/spoon-knife",
            "owner": { "login": "octocat" },
            "html_url": "https://github.com/octocat/spoon-knife",
            "description": null
        }
    ]))
    .into_response()
}

async fn commits(
    headers: HeaderMap,
    Path((_owner, repo)): Path<(String, String)>,
) -> axum::response::Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    if repo == EMPTY_REPO {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Git Repository is empty." })),
        )
            .into_response();
    }
    Json(json!([
        { "sha": "a1", "commit": { "message": "Fix login bug" } },
        { "sha": "b2", "commit": { "message": "Improve database performance" } },
        { "sha": "c3", "commit": { "message": "" } }
    ]))
    .into_response()
}

async fn language(headers: HeaderMap, Path(method): Path<String>) -> axum::response::Response {
    if !google_key_ok(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": { "code": 403 } }))).into_response();
    }
    match method.as_str() {
        "documents:analyzeSentiment" => {
            Json(json!({ "documentSentiment": { "score": -0.4, "magnitude": 1.1 } })).into_response()
        }
        "documents:analyzeEntities" => Json(json!({
            "entities": [
                { "name": "login bug", "salience": 0.2 },
                { "name": "database", "salience": 0.7 },
                { "name": "Database", "salience": 0.1 }
            ]
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn connector(headers: HeaderMap, Path(id): Path<String>) -> axum::response::Response {
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !basic {
        return unauthorized();
    }
    if id == BROKEN_CONNECTOR {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    Json(json!({
        "code": "Success",
        "data": {
            "id": id,
            "succeeded_at": "2024-05-01T10:00:00Z",
            "failed_at": null,
            "status": { "sync_state": "syncing", "setup_state": "connected" }
        }
    }))
    .into_response()
}

async fn generate(
    headers: HeaderMap,
    Path(method): Path<String>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !google_key_ok(&headers) || !method.ends_with(":generateContent") {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": { "code": 403 } }))).into_response();
    }
    let turns = body["contents"].as_array().map_or(0, Vec::len);
    let has_system = body["systemInstruction"]["parts"][0]["text"].is_string();
    Json(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": format!("Hello from Gemini ({turns} turns, system={has_system})") }]
            }
        }]
    }))
    .into_response()
}

/// One local server standing in for GitHub, Google and Fivetran.
pub async fn spawn_upstream() -> Url {
    let router = Router::new()
        .route("/login/oauth/access_token", post(token))
        .route("/user", get(user))
        .route("/user/repos", get(user_repos))
        .route("/repos/{owner}/{repo}/commits", get(commits))
        .route("/v1/{method}", post(language))
        .route("/v1/connectors/{id}", get(connector))
        .route("/v1beta/models/{method}", post(generate));
    spawn(router).await
}

/// A GitHub API that knows the user but fails to list repositories.
pub async fn spawn_github_without_repos() -> Url {
    let router = Router::new().route("/user", get(user)).route(
        "/user/repos",
        get(|| async { (StatusCode::BAD_GATEWAY, "unicorn").into_response() }),
    );
    spawn(router).await
}

/// Base URL of a local port nothing listens on.
pub async fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// Gateway config pointing every integration at `upstream`, fully credentialed.
pub fn config_for(upstream: &Url) -> AppConfig {
    let oauth = OAuthConfig::new("client-id")
        .with_client_secret("client-secret")
        .with_auth_url(upstream.join("login/oauth/authorize").unwrap())
        .with_token_url(upstream.join("login/oauth/access_token").unwrap())
        .with_scopes(vec!["read:user".into(), "repo".into()]);

    AppConfig::new()
        .with_cookie_key(CookieKey::generate())
        .with_oauth(oauth)
        .with_github_api_url(upstream.clone())
        .with_assistant(
            AssistantConfig::default()
                .with_api_key(GOOGLE_KEY)
                .with_api_url(upstream.clone()),
        )
        .with_language(
            LanguageConfig::default()
                .with_api_key(GOOGLE_KEY)
                .with_api_url(upstream.clone()),
        )
        .with_pipeline(
            PipelineConfig::default()
                .with_credentials(FivetranCredentials::new("fk", "fs"))
                .with_api_url(upstream.clone()),
        )
}

pub fn app(config: AppConfig) -> Router {
    app_routes(config, MemorySessionStore::new()).unwrap()
}

/// Minimal cookie-carrying client over a router.
#[derive(Clone)]
pub struct Browser {
    app: Router,
    cookies: BTreeMap<String, String>,
}

impl Browser {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: BTreeMap::new(),
        }
    }

    /// Same cookies, sent to a different app instance.
    pub fn with_app(&self, app: Router) -> Self {
        Self {
            app,
            cookies: self.cookies.clone(),
        }
    }

    pub fn cookie_names(&self) -> Vec<String> {
        self.cookies.keys().cloned().collect()
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = Request::get(uri);
        self.send(request, Body::empty()).await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> Response<Body> {
        let request = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        self.send(request, Body::from(body.to_string())).await
    }

    pub async fn post_raw(&mut self, uri: &str, content_type: &str, body: &str) -> Response<Body> {
        let request = Request::post(uri).header(header::CONTENT_TYPE, content_type);
        self.send(request, Body::from(body.to_string())).await
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> Response<Body> {
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, cookie);
        }
        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        self.absorb(response.headers());
        response
    }

    fn absorb(&mut self, headers: &HeaderMap) {
        for set_cookie in headers.get_all(header::SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            let pair = raw.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                self.cookies.remove(name.trim());
            } else {
                self.cookies.insert(name.trim().to_string(), value.to_string());
            }
        }
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub async fn text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Run `/login` then `/callback` with a good code; returns the callback response.
pub async fn sign_in(browser: &mut Browser) -> Response<Body> {
    let login = browser.get("/login").await;
    assert_eq!(login.status(), StatusCode::SEE_OTHER);
    let authorize = Url::parse(&location(&login)).unwrap();
    let state = authorize
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter");
    browser
        .get(&format!("/callback?code={GOOD_CODE}&state={state}"))
        .await
}
