//! Project heartbeat: sentiment and key topics of recent repository activity.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::error::Error;
use crate::upstream::{UpstreamClient, default_url, endpoint};

/// Commits analysed by the live backend.
pub const COMMIT_SAMPLE: u8 = 50;

const MAX_TOPICS: usize = 5;
const POSITIVE_THRESHOLD: f64 = 0.25;
const NEGATIVE_THRESHOLD: f64 = -0.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub comment: String,
    pub key_topics: Vec<String>,
}

impl Heartbeat {
    /// Fixed document served by the simulated backend.
    #[must_use]
    pub fn simulated() -> Self {
        Self {
            sentiment_score: 0.8,
            sentiment_label: "Positive".into(),
            comment: "Analyzed 1,200 words from simulated activity.".into(),
            key_topics: ["UI update", "login bug", "performance", "database", "API"]
                .map(String::from)
                .to_vec(),
        }
    }

    fn quiet() -> Self {
        Self {
            sentiment_score: 0.0,
            sentiment_label: sentiment_label(0.0).into(),
            comment: "No recent activity to analyze.".into(),
            key_topics: Vec::new(),
        }
    }
}

#[must_use]
pub fn sentiment_label(score: f64) -> &'static str {
    if score >= POSITIVE_THRESHOLD {
        "Positive"
    } else if score <= NEGATIVE_THRESHOLD {
        "Negative"
    } else {
        "Neutral"
    }
}

/// `1200` → `"1,200"`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ── Natural Language API ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentResponse {
    #[serde(default)]
    document_sentiment: Option<Sentiment>,
}

#[derive(Deserialize)]
struct Sentiment {
    #[serde(default)]
    score: f64,
}

#[derive(Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Deserialize)]
struct Entity {
    name: String,
    #[serde(default)]
    salience: f64,
}

/// Most salient distinct entity names, best first.
fn top_topics(mut entities: Vec<Entity>) -> Vec<String> {
    entities.sort_by(|a, b| b.salience.total_cmp(&a.salience));
    let mut topics: Vec<String> = Vec::with_capacity(MAX_TOPICS);
    for entity in entities {
        if topics.len() == MAX_TOPICS {
            break;
        }
        if !topics.iter().any(|t| t.eq_ignore_ascii_case(&entity.name)) {
            topics.push(entity.name);
        }
    }
    topics
}

#[derive(Clone)]
pub struct LanguageConfig {
    pub(crate) api_key: Option<String>,
    pub(crate) api_url: Url,
}

impl fmt::Debug for LanguageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_url("https://language.googleapis.com"),
        }
    }
}

impl LanguageConfig {
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }
}

/// Google Cloud Natural Language REST client.
pub struct LanguageClient {
    config: LanguageConfig,
    upstream: UpstreamClient,
}

impl LanguageClient {
    #[must_use]
    pub fn new(config: LanguageConfig, upstream: UpstreamClient) -> Self {
        Self { config, upstream }
    }

    fn request(&self, api_key: &str, method: &str, text: &str) -> Result<reqwest::RequestBuilder, Error> {
        let url = endpoint(&self.config.api_url, &["v1", method])?;
        let body = json!({
            "document": {"type": "PLAIN_TEXT", "content": text},
            "encodingType": "UTF8",
        });
        Ok(self
            .upstream
            .http()
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body))
    }

    /// Sentiment and topics of a batch of activity texts (commit messages).
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationMissing`] without an API key (no request is sent),
    /// otherwise the upstream errors of [`UpstreamClient::send_json`].
    pub async fn analyze_activity(&self, texts: &[String]) -> Result<Heartbeat, Error> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(Error::ConfigurationMissing("GOOGLE_API_KEY"))?;

        let document = texts.join("\n");
        let words = document.split_whitespace().count();
        if words == 0 {
            return Ok(Heartbeat::quiet());
        }

        let sentiment: SentimentResponse = self
            .upstream
            .send_json(
                "analyze sentiment",
                self.request(api_key, "documents:analyzeSentiment", &document)?,
            )
            .await?;
        let entities: EntitiesResponse = self
            .upstream
            .send_json(
                "analyze entities",
                self.request(api_key, "documents:analyzeEntities", &document)?,
            )
            .await?;

        let score = sentiment.document_sentiment.map_or(0.0, |s| s.score);
        Ok(Heartbeat {
            sentiment_score: score,
            sentiment_label: sentiment_label(score).into(),
            comment: format!("Analyzed {} words from recent activity.", group_thousands(words)),
            key_topics: top_topics(entities.entities),
        })
    }
}

/// Where `/project_heartbeat` gets its data, fixed at startup.
pub enum HeartbeatBackend {
    Live(LanguageClient),
    Simulated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_is_stable() {
        let a = serde_json::to_string(&Heartbeat::simulated()).unwrap();
        let b = serde_json::to_string(&Heartbeat::simulated()).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"sentiment_score\":0.8"));
    }

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(sentiment_label(0.8), "Positive");
        assert_eq!(sentiment_label(0.25), "Positive");
        assert_eq!(sentiment_label(0.0), "Neutral");
        assert_eq!(sentiment_label(-0.25), "Negative");
        assert_eq!(sentiment_label(-0.9), "Negative");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(7), "7");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1200), "1,200");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn topics_are_ranked_and_deduplicated() {
        let entities = vec![
            Entity { name: "login".into(), salience: 0.1 },
            Entity { name: "API".into(), salience: 0.5 },
            Entity { name: "api".into(), salience: 0.4 },
            Entity { name: "database".into(), salience: 0.3 },
            Entity { name: "cache".into(), salience: 0.05 },
            Entity { name: "docs".into(), salience: 0.04 },
            Entity { name: "ci".into(), salience: 0.03 },
        ];
        assert_eq!(top_topics(entities), ["API", "database", "login", "cache", "docs"]);
    }

    #[tokio::test]
    async fn blank_activity_is_quiet_without_upstream_call() {
        let upstream =
            UpstreamClient::new(&crate::upstream::UpstreamSettings::default()).unwrap();
        let config = LanguageConfig::default()
            .with_api_key("k")
            .with_api_url("http://127.0.0.1:9".parse().unwrap());
        let client = LanguageClient::new(config, upstream);
        let heartbeat = client.analyze_activity(&["   ".into()]).await.unwrap();
        assert_eq!(heartbeat.sentiment_label, "Neutral");
        assert!(heartbeat.key_topics.is_empty());
    }
}
