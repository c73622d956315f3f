//! HTTP client for a Gemini-style `generateContent` judging service.
//!
//! The client sends the learner's source plus the level task to the remote
//! model and normalizes whatever comes back into a [`JudgeVerdict`] or a
//! plain hint string. Responses are parsed tolerantly: a direct parse is
//! attempted first, then a brace-extraction pass for payloads wrapped in
//! prose, then field-by-field recovery with defaults. Anything that still
//! cannot be read resolves to the synthetic unreachable verdict.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{FallbackMessages, HintRequest, Judge, JudgeRequest, JudgeVerdict, VariableSnapshot};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default response language for judge and mentor text.
const DEFAULT_LANGUAGE: &str = "en";

// ============================================================================
// Options
// ============================================================================

/// Construction options for [`GeminiJudge`].
#[derive(Debug, Clone)]
pub struct GeminiOptions {
    /// Base URL of the `generateContent` API.
    pub endpoint: String,

    /// Model identifier, e.g. `gemini-2.0-flash`.
    pub model: String,

    /// API key sent as the `key` query parameter.
    pub api_key: String,

    /// Bound on each judge/hint request.
    pub timeout: Duration,

    /// Language for all human-readable response text.
    pub language: String,

    /// Fixed strings substituted on failure.
    pub messages: FallbackMessages,
}

impl GeminiOptions {
    /// Creates options with the given endpoint, model, and API key.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            language: DEFAULT_LANGUAGE.to_string(),
            messages: FallbackMessages::default(),
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the response language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the failure-message catalog.
    #[must_use]
    pub fn with_messages(mut self, messages: FallbackMessages) -> Self {
        self.messages = messages;
        self
    }
}

// ============================================================================
// Transport error (internal)
// ============================================================================

/// Internal transport failure, logged and then absorbed into synthetic data.
#[derive(Debug, thiserror::Error)]
enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("service returned no candidate text")]
    EmptyResponse,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

impl Content {
    fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate, if any.
    fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Verdict payload as the model emits it, before defaults are applied.
///
/// `compiled` and `success` are tracked as options so a payload that
/// carries neither can be distinguished from an honest failure verdict.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    compiled: Option<bool>,
    success: Option<bool>,
    output: Option<String>,
    feedback: Option<String>,
    #[serde(default)]
    variables: Vec<VariableSnapshot>,
}

impl RawVerdict {
    /// Returns `true` if the payload carries neither result flag, in which
    /// case it is treated as malformed rather than as a failure verdict.
    const fn is_empty(&self) -> bool {
        self.compiled.is_none() && self.success.is_none()
    }

    fn into_verdict(self) -> JudgeVerdict {
        JudgeVerdict {
            compiled: self.compiled.unwrap_or(false),
            success: self.success.unwrap_or(false),
            output: self.output.unwrap_or_default(),
            feedback: self.feedback.unwrap_or_default(),
            variables: self.variables,
        }
    }
}

// ============================================================================
// GeminiJudge
// ============================================================================

/// Judge client backed by a Gemini-style `generateContent` endpoint.
///
/// Every request is bounded by the configured timeout; a timeout resolves
/// to the same synthetic verdict as any other transport failure, so the
/// caller's in-flight guard always clears.
#[derive(Debug, Clone)]
pub struct GeminiJudge {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    language: String,
    messages: FallbackMessages,
}

impl GeminiJudge {
    /// Creates a judge client from the given options.
    #[must_use]
    pub fn new(options: GeminiOptions) -> Self {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            endpoint: options.endpoint,
            model: options.model,
            api_key: options.api_key,
            language: options.language,
            messages: options.messages,
        }
    }

    /// Returns the failure-message catalog this client substitutes.
    #[must_use]
    pub const fn messages(&self) -> &FallbackMessages {
        &self.messages
    }

    /// Raw `generateContent` call; returns the first candidate's text.
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
        json_response: bool,
    ) -> Result<String, TransportError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );

        let request = GenerateContentRequest {
            contents: vec![Content::text(prompt)],
            system_instruction: Content::text(system_instruction),
            generation_config: json_response.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending generateContent request");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.first_text().ok_or(TransportError::EmptyResponse)
    }

    /// System instruction for judge requests.
    fn judge_system_instruction(&self) -> String {
        format!(
            "You are a meticulous programming instructor judging a beginner's code submission. \
             Decide whether the code would compile and whether running it satisfies the task. \
             Respond with a single JSON object with fields: compiled (boolean), success (boolean), \
             output (string: the program's console output, or the compiler error), feedback \
             (string: one or two encouraging sentences for the learner), and variables (array of \
             objects with name, type, and value for each variable the program defines). \
             Write all human-readable text in the language '{}'.",
            self.language
        )
    }

    /// System instruction for hint requests.
    fn hint_system_instruction(&self) -> String {
        format!(
            "You are a friendly programming mentor helping a beginner who is stuck. \
             Respond with a single short hint as plain text, no markdown fences. \
             Write the hint in the language '{}'.",
            self.language
        )
    }

    fn judge_prompt(request: &JudgeRequest) -> String {
        format!(
            "TASK: {}\nEXPECTED OUTPUT: {}\n\nUSER CODE:\n{}",
            request.task, request.expected_output, request.source_code
        )
    }

    fn hint_prompt(request: &HintRequest) -> String {
        format!(
            "TASK: {}\n\nUSER CODE:\n{}\n\nHINT REQUEST: {}",
            request.task,
            request.source_code,
            request.depth.intent()
        )
    }

    /// Parses a verdict payload tolerantly.
    ///
    /// Tries a direct parse, then a brace-extraction pass for payloads
    /// wrapped in prose. A payload that carries neither `compiled` nor
    /// `success` is treated as malformed.
    fn parse_verdict(&self, text: &str) -> JudgeVerdict {
        if let Ok(raw) = serde_json::from_str::<RawVerdict>(text) {
            if !raw.is_empty() {
                return raw.into_verdict();
            }
        }

        let extracted = extract_json(text);
        match serde_json::from_str::<Value>(&extracted) {
            Ok(value) => {
                let raw = RawVerdict {
                    compiled: value.get("compiled").and_then(Value::as_bool),
                    success: value.get("success").and_then(Value::as_bool),
                    output: value
                        .get("output")
                        .and_then(Value::as_str)
                        .map(ToString::to_string),
                    feedback: value
                        .get("feedback")
                        .and_then(Value::as_str)
                        .map(ToString::to_string),
                    variables: value
                        .get("variables")
                        .cloned()
                        .and_then(|v| serde_json::from_value(v).ok())
                        .unwrap_or_default(),
                };

                if raw.is_empty() {
                    warn!("Verdict payload carries no result flags, treating as malformed");
                    JudgeVerdict::unreachable(&self.messages)
                } else {
                    debug!("Parsed verdict via flexible recovery");
                    raw.into_verdict()
                }
            }
            Err(error) => {
                warn!(%error, "Verdict payload is not JSON, treating as malformed");
                JudgeVerdict::unreachable(&self.messages)
            }
        }
    }
}

/// Extracts the outermost JSON object from text that may have prose or
/// markdown fences around it.
fn extract_json(text: &str) -> String {
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }
    text.to_string()
}

impl Judge for GeminiJudge {
    async fn judge(&self, request: &JudgeRequest) -> JudgeVerdict {
        let system = self.judge_system_instruction();
        let prompt = Self::judge_prompt(request);

        match self.generate(&system, &prompt, true).await {
            Ok(text) => self.parse_verdict(&text),
            Err(error) => {
                warn!(%error, "Judge request failed, substituting synthetic verdict");
                JudgeVerdict::unreachable(&self.messages)
            }
        }
    }

    async fn hint(&self, request: &HintRequest) -> String {
        let system = self.hint_system_instruction();
        let prompt = Self::hint_prompt(request);

        match self.generate(&system, &prompt, false).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    self.messages.mentor_unavailable.clone()
                } else {
                    trimmed.to_string()
                }
            }
            Err(error) => {
                warn!(depth = %request.depth, %error, "Hint request failed, substituting fallback");
                self.messages.mentor_unavailable.clone()
            }
        }
    }
}
