//! Conversational assistant backed by the Gemini `generateContent` API.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::upstream::{UpstreamClient, default_url, endpoint};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Application prompt sent as the system instruction on every request.
pub const SYSTEM_PROMPT: &str = "You are the AI Assistant for the 'GitHub Analyst' application. \
Your purpose is to help users. The app's main feature is the 'Project Heartbeat' which analyzes \
project sentiment and key topics using Google's NLP API. Politely decline questions unrelated \
to the app or software development.";

/// One chat turn as sent by the browser client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Clone)]
pub struct AssistantConfig {
    pub(crate) api_key: Option<String>,
    pub(crate) model: String,
    pub(crate) api_url: Url,
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            api_url: default_url("https://generativelanguage.googleapis.com"),
        }
    }
}

impl AssistantConfig {
    /// Google API key for Gemini.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Gemini model name (default `gemini-2.0-flash`).
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the Generative Language API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    /// Whether an API key is set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

/// Map browser roles onto Gemini's two roles: `user` stays, everything else is `model`.
fn to_contents(messages: &[ChatMessage]) -> Vec<Content> {
    messages
        .iter()
        .map(|msg| {
            let role = if msg.role == "user" { "user" } else { "model" };
            Content::text(Some(role), &msg.content)
        })
        .collect()
}

fn reply_text(response: GenerateContentResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Gemini chat client.
pub struct Assistant {
    config: AssistantConfig,
    upstream: UpstreamClient,
}

impl Assistant {
    #[must_use]
    pub fn new(config: AssistantConfig, upstream: UpstreamClient) -> Self {
        Self { config, upstream }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Generate the next assistant turn for `messages`.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationMissing`] without an API key and
    /// [`Error::EmptyConversation`] for an empty history (no request is sent in
    /// either case). Otherwise the upstream errors of [`UpstreamClient::send_json`];
    /// a response without candidate text is [`Error::UpstreamRejected`].
    pub async fn reply(&self, messages: &[ChatMessage]) -> Result<String, Error> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(Error::ConfigurationMissing("GOOGLE_API_KEY"))?;

        if messages.is_empty() {
            return Err(Error::EmptyConversation);
        }

        let method = format!("{}:generateContent", self.config.model);
        let url = endpoint(&self.config.api_url, &["v1beta", "models", &method])?;

        let body = GenerateContentRequest {
            contents: to_contents(messages),
            system_instruction: Content::text(None, SYSTEM_PROMPT),
        };

        let request = self
            .upstream
            .http()
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body);

        let response: GenerateContentResponse =
            self.upstream.send_json("generate content", request).await?;

        reply_text(response).ok_or_else(|| Error::UpstreamRejected {
            operation: "generate content",
            status: 200,
            detail: "response contained no candidate text".into(),
        })
    }
}
