//! Prompt refinement
//!
//! Asks a remote text model to elaborate a prompt. Refinement is optional:
//! every failure, including a missing API key, comes back as
//! `RefineOutcome::Unavailable` and the caller keeps the original text.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RefineConfig;

const INSTRUCTION: &str = "You are an expert prompt engineer for AI image and video generators. \
Rewrite the prompt below so it is more vivid and specific: describe subject, composition, \
lighting, style and camera details. Keep the original intent. \
Reply with the improved prompt only, without commentary or quotes.";

/// Result of a refinement attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineOutcome {
    /// The refined prompt text
    Refined(String),
    /// Why refinement could not be done
    Unavailable(String),
}

pub struct Refiner {
    config: RefineConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl Refiner {
    pub fn new(config: RefineConfig) -> Self {
        Self { config }
    }

    /// Whether an API key is configured
    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Refine `prompt`; never fails
    pub async fn refine(&self, prompt: &str) -> RefineOutcome {
        let Some(api_key) = self.api_key() else {
            return RefineOutcome::Unavailable(
                "Refinement API key is not configured (set PVAULT_API_KEY or refine.api_key)"
                    .to_string(),
            );
        };

        if prompt.trim().is_empty() {
            return RefineOutcome::Unavailable("Nothing to refine: the prompt is empty".to_string());
        }

        match self.request(api_key, prompt).await {
            Ok(text) => {
                debug!(chars = text.len(), "Prompt refined");
                RefineOutcome::Refined(text)
            }
            Err(e) => {
                warn!("Prompt refinement failed: {:#}", e);
                RefineOutcome::Unavailable(format!("Refinement unavailable: {:#}", e))
            }
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn request(&self, api_key: &str, prompt: &str) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .user_agent(concat!("pvault/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let text = format!("{}\n\nPrompt:\n{}", INSTRUCTION, prompt.trim());
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: &text }],
            }],
        };

        let response = client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .context("request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("service returned {}", status);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("unexpected response body")?;

        let refined = extract_text(parsed);
        if refined.is_empty() {
            bail!("service returned no text");
        }
        Ok(refined)
    }
}

fn extract_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/v1beta/models/test-model:generateContent";

    fn refiner(server: &MockServer, api_key: Option<&str>) -> Refiner {
        Refiner::new(RefineConfig {
            api_key: api_key.map(str::to_string),
            model: "test-model".to_string(),
            base_url: server.uri(),
            timeout_secs: 1,
        })
    }

    #[tokio::test]
    async fn test_refine_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(query_param("key", "k"))
            .and(body_string_contains("a cat on a roof"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"candidates":[{"content":{"parts":[{"text":"  A tabby cat "},{"text":"on a moonlit roof\n"}]}}]}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = refiner(&server, Some("k")).refine("a cat on a roof").await;
        assert_eq!(
            outcome,
            RefineOutcome::Refined("A tabby cat on a moonlit roof".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let refiner = refiner(&server, Some("   "));
        assert!(!refiner.is_configured());
        assert!(matches!(
            refiner.refine("anything").await,
            RefineOutcome::Unavailable(msg) if msg.contains("API key")
        ));
    }

    #[tokio::test]
    async fn test_empty_prompt() {
        let server = MockServer::start().await;
        let outcome = refiner(&server, Some("k")).refine("  ").await;
        assert!(matches!(outcome, RefineOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let outcome = refiner(&server, Some("k")).refine("a prompt").await;
        assert!(matches!(outcome, RefineOutcome::Unavailable(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_unparsable_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
            .mount(&server)
            .await;

        let outcome = refiner(&server, Some("k")).refine("a prompt").await;
        assert!(matches!(outcome, RefineOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"{"candidates":[]}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let outcome = refiner(&server, Some("k")).refine("a prompt").await;
        assert!(matches!(outcome, RefineOutcome::Unavailable(msg) if msg.contains("no text")));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"candidates":[]}"#, "application/json")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let outcome = refiner(&server, Some("k")).refine("a prompt").await;
        assert!(matches!(outcome, RefineOutcome::Unavailable(_)));
    }
}
