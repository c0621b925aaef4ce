//! Text-generation client.
//!
//! `ChatBackend` is the seam to the external service: one system + user exchange in,
//! one text payload out. `OpenAI` implements it against an OpenAI-compatible
//! chat.completions endpoint; `TextGenerationClient` adds prompt construction and the
//! generate / extend operations on top.
//!
//! NOTE: We never log the credential or document contents, only sizes, model names,
//! latencies and token usage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::config::Prompts;
use crate::domain::GenerationRequest;
use crate::prompt::{build_extend_instructions, build_instructions, InstructionPair};
use crate::util::trunc_for_log;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
  #[error("network error: {0}")]
  Transport(String),
  #[error("request timed out: {0}")]
  Timeout(String),
  #[error("backend HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("failed to decode backend response: {0}")]
  Decode(String),
  #[error("backend returned an empty document")]
  Empty,
}

impl From<reqwest::Error> for GenerationError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      GenerationError::Timeout(e.to_string())
    } else if e.is_decode() {
      GenerationError::Decode(e.to_string())
    } else {
      GenerationError::Transport(e.to_string())
    }
  }
}

/// One request/response exchange with the external text service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
  async fn complete(&self, instructions: &InstructionPair, credential: &str) -> Result<String, GenerationError>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
}

impl OpenAI {
  /// Build from OPENAI_BASE_URL / OPENAI_MODEL / OPENAI_TEMPERATURE / OPENAI_TIMEOUT_SECS.
  /// The credential is not part of the client; it is passed per call.
  pub fn from_env() -> Result<Self, reqwest::Error> {
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let temperature = std::env::var("OPENAI_TEMPERATURE")
      .ok()
      .and_then(|t| t.parse::<f32>().ok())
      .unwrap_or(0.7);

    // No timeout unless asked for; the backend's own limits apply otherwise.
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = std::env::var("OPENAI_TIMEOUT_SECS").ok().and_then(|s| s.parse::<u64>().ok()) {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build()?;

    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), model, temperature })
  }
}

#[async_trait]
impl ChatBackend for OpenAI {
  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, instructions, credential), fields(model = %self.model))]
  async fn complete(&self, instructions: &InstructionPair, credential: &str) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: instructions.system.clone() },
        ChatMessageReq { role: "user".into(), content: instructions.user.clone() },
      ],
      temperature: self.temperature,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "research-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", credential))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      debug!(status = status.as_u16(), body = %trunc_for_log(&body, 300), "Backend error body");
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(GenerationError::Http { status: status.as_u16(), message: format!("{} {}", status.canonical_reason().unwrap_or(""), message).trim().to_string() });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    if let Some(reason) = body.choices.first().and_then(|c| c.finish_reason.as_deref()) {
      if reason == "content_filter" {
        return Err(GenerationError::Http { status: 200, message: "content_filter: completion was filtered".into() });
      }
    }
    Ok(body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default())
  }
}

/// Generate / extend operations over any `ChatBackend`.
#[derive(Clone)]
pub struct TextGenerationClient {
  backend: Arc<dyn ChatBackend>,
  prompts: Prompts,
}

impl TextGenerationClient {
  pub fn new(backend: Arc<dyn ChatBackend>, prompts: Prompts) -> Self {
    Self { backend, prompts }
  }

  /// Fresh document for `request`.
  #[instrument(level = "info", skip(self, request, credential), fields(topic_len = request.topic.len(), language = ?request.language))]
  pub async fn generate(&self, request: &GenerationRequest, credential: &str) -> Result<String, GenerationError> {
    let instructions = build_instructions(request, &self.prompts);
    self.run(&instructions, credential).await
  }

  /// Longer replacement for `prior`. The reply is a full document, never a delta.
  #[instrument(level = "info", skip(self, prior, request, credential), fields(prior_len = prior.len(), language = ?request.language))]
  pub async fn extend(&self, prior: &str, request: &GenerationRequest, credential: &str) -> Result<String, GenerationError> {
    let instructions = build_extend_instructions(prior, request, &self.prompts);
    self.run(&instructions, credential).await
  }

  async fn run(&self, instructions: &InstructionPair, credential: &str) -> Result<String, GenerationError> {
    let start = Instant::now();
    let result = self.backend.complete(instructions, credential).await;
    let elapsed = start.elapsed();

    match result {
      Ok(text) => {
        let text = text.trim().to_string();
        if text.is_empty() {
          error!(?elapsed, "Model returned an empty document");
          return Err(GenerationError::Empty);
        }
        info!(?elapsed, content_len = text.len(), "Model response received successfully");
        Ok(text)
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed");
        Err(e)
      }
    }
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String, #[serde(default)] code: Option<String> }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(match w.error.code {
      Some(code) => format!("{} ({})", w.error.message, code),
      None => w.error.message,
    }),
    Err(_) => None,
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use std::collections::VecDeque;
  use std::sync::Mutex;

  use crate::domain::Language;
  use crate::errors::{classify, ErrorCategory};

  /// Scripted backend: pops one reply per call and records what it was sent.
  #[derive(Default)]
  pub(crate) struct ScriptedBackend {
    pub replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    pub seen: Mutex<Vec<(InstructionPair, String)>>,
  }

  impl ScriptedBackend {
    pub fn with(replies: Vec<Result<String, GenerationError>>) -> Self {
      Self { replies: Mutex::new(replies.into()), seen: Mutex::default() }
    }
  }

  #[async_trait]
  impl ChatBackend for ScriptedBackend {
    async fn complete(&self, instructions: &InstructionPair, credential: &str) -> Result<String, GenerationError> {
      self.seen.lock().unwrap().push((instructions.clone(), credential.to_string()));
      self.replies.lock().unwrap().pop_front().unwrap_or(Err(GenerationError::Empty))
    }
  }

  #[tokio::test]
  async fn generate_trims_and_passes_credential() {
    let backend = Arc::new(ScriptedBackend::with(vec![Ok("\n## Title\nbody\n\n".into())]));
    let client = TextGenerationClient::new(backend.clone(), Prompts::default());
    let text = client.generate(&GenerationRequest::new("Water"), "sk-test").await.unwrap();
    assert_eq!(text, "## Title\nbody");
    let seen = backend.seen.lock().unwrap();
    assert_eq!(seen[0].1, "sk-test");
    assert!(seen[0].0.user.contains("[Water]"));
  }

  #[tokio::test]
  async fn extend_sends_prior_content() {
    let backend = Arc::new(ScriptedBackend::with(vec![Ok("## Longer".into())]));
    let client = TextGenerationClient::new(backend.clone(), Prompts::default());
    let text = client.extend("## Short", &GenerationRequest::new("Water"), "k").await.unwrap();
    assert_eq!(text, "## Longer");
    assert!(backend.seen.lock().unwrap()[0].0.user.contains("## Short"));
  }

  #[tokio::test]
  async fn blank_reply_is_an_error() {
    let backend = Arc::new(ScriptedBackend::with(vec![Ok("  \n ".into())]));
    let client = TextGenerationClient::new(backend, Prompts::default());
    let err = client.generate(&GenerationRequest::new("Water"), "k").await.unwrap_err();
    assert!(matches!(err, GenerationError::Empty));
  }

  #[test]
  fn error_display_feeds_the_classifier() {
    let err = GenerationError::Http { status: 401, message: "Unauthorized Incorrect API key provided".into() };
    assert_eq!(classify(&err.to_string(), Language::English).category, ErrorCategory::CredentialInvalid);

    let err = GenerationError::Timeout("operation timed out".into());
    assert_eq!(classify(&err.to_string(), Language::English).category, ErrorCategory::Timeout);

    let err = GenerationError::Http { status: 200, message: "content_filter: completion was filtered".into() };
    assert_eq!(classify(&err.to_string(), Language::English).category, ErrorCategory::ContentFiltered);
  }

  #[test]
  fn openai_error_body_is_unwrapped() {
    let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
    assert_eq!(
      extract_openai_error(body).as_deref(),
      Some("You exceeded your current quota (insufficient_quota)")
    );
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }
}
