//! Application state and orchestration.
//!
//! This module owns:
//!   - the text-generation client
//!   - the history and credential stores (over an injected key-value store)
//!   - the single reader session: current document, last request, last error,
//!     loading flag and the in-memory history list
//!
//! Each generation call takes a ticket. Only the reply for the latest ticket may
//! replace the current document; replies for superseded tickets are dropped.
//! Closing or selecting a document also takes a ticket, so a reply still in
//! flight cannot overwrite it.
//!
//! The backend call and the session update run on a spawned task: a caller that
//! goes away (client disconnect) does not cancel the generation, and `loading`
//! is always cleared.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn, Instrument};

use crate::config::{load_config_from_env, AppConfig};
use crate::domain::{GeneratedDocument, GenerationRequest, HistoryEntry, Language};
use crate::errors::{classify, ClassifiedError, ErrorCategory};
use crate::format::{self, html, RenderDefaults, RenderOptions, RenderParams, RenderedDocument};
use crate::history;
use crate::llm::{ChatBackend, GenerationError, OpenAI, TextGenerationClient};
use crate::store::{CredentialStore, FileStore, HistoryStore, KeyValueStore, StoreError};

#[derive(Debug, Default)]
pub struct Session {
  pub current: Option<GeneratedDocument>,
  pub last_request: Option<GenerationRequest>,
  pub error: Option<ClassifiedError>,
  pub loading: bool,
  pub latest_ticket: u64,
  pub history: Vec<HistoryEntry>,
}

/// Read-only view of the session for clients.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
  pub current: Option<GeneratedDocument>,
  pub last_request: Option<GenerationRequest>,
  pub error: Option<ClassifiedError>,
  pub loading: bool,
  pub history_len: usize,
  pub has_credential: bool,
}

/// Result of a generation call that reached the backend.
#[derive(Clone, Debug)]
pub enum GenerationOutcome {
  Completed(GeneratedDocument),
  /// A newer call was started meanwhile; this reply was discarded.
  Superseded { ticket: u64 },
}

/// Payload for the clipboard: rich text plus the raw document as plain text.
#[derive(Clone, Debug, Serialize)]
pub struct ClipboardPayload {
  pub html: String,
  pub text: String,
}

pub struct AppState {
  pub client: TextGenerationClient,
  pub history_store: HistoryStore,
  pub credentials: CredentialStore,
  /// OPENAI_API_KEY, used when no credential has been stored.
  pub env_credential: Option<String>,
  pub render_defaults: RenderDefaults,
  pub ui_language: Language,
  session: Arc<RwLock<Session>>,
}

impl AppState {
  /// Wire state from explicit parts; history is rehydrated from the store.
  pub fn new(
    backend: Arc<dyn ChatBackend>,
    kv: Arc<dyn KeyValueStore>,
    config: AppConfig,
    env_credential: Option<String>,
  ) -> Self {
    let history_store = HistoryStore::new(kv.clone());
    let history = history_store.load();
    info!(target: "history", entries = history.len(), "History loaded");

    Self {
      client: TextGenerationClient::new(backend, config.prompts),
      history_store,
      credentials: CredentialStore::new(kv),
      env_credential: env_credential.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
      render_defaults: config.render,
      ui_language: config.ui.language,
      session: Arc::new(RwLock::new(Session { history, ..Session::default() })),
    }
  }

  /// Build state from env: load config, open the file store, init the OpenAI client.
  #[instrument(level = "info", skip_all)]
  pub fn from_env() -> Result<Self, reqwest::Error> {
    let config = load_config_from_env().unwrap_or_default();
    let data_dir = std::env::var("RESEARCH_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let files = FileStore::new(data_dir);
    info!(target: "research_backend", data_dir = %files.dir().display(), "Persisting history and credential as JSON files");
    let kv: Arc<dyn KeyValueStore> = Arc::new(files);

    let openai = OpenAI::from_env()?;
    info!(target: "research_backend", base_url = %openai.base_url, model = %openai.model, "Generation backend configured.");

    let env_credential = std::env::var("OPENAI_API_KEY").ok();
    if env_credential.is_none() {
      info!(target: "research_backend", "OPENAI_API_KEY not set; a credential must be stored via settings.");
    }

    Ok(Self::new(Arc::new(openai), kv, config, env_credential))
  }

  /// Stored credential first, then the environment fallback.
  pub fn credential(&self) -> Option<String> {
    self.credentials.load().or_else(|| self.env_credential.clone())
  }

  pub fn set_credential(&self, credential: &str) -> Result<(), ClassifiedError> {
    if credential.trim().is_empty() {
      return Err(ClassifiedError::invalid_request("apiKey must not be empty"));
    }
    self.credentials.save(credential).map_err(|e| self.store_failure(e))?;
    info!(target: "research_backend", "Credential stored");
    Ok(())
  }

  pub fn clear_credential(&self) -> Result<(), ClassifiedError> {
    self.credentials.clear().map_err(|e| self.store_failure(e))?;
    info!(target: "research_backend", "Credential cleared");
    Ok(())
  }

  fn store_failure(&self, e: StoreError) -> ClassifiedError {
    error!(target: "research_backend", error = %e, "Store write failed");
    ClassifiedError::storage_failure(self.ui_language, e.to_string())
  }

  pub async fn snapshot(&self) -> SessionSnapshot {
    let session = self.session.read().await;
    SessionSnapshot {
      current: session.current.clone(),
      last_request: session.last_request.clone(),
      error: session.error.clone(),
      loading: session.loading,
      history_len: session.history.len(),
      has_credential: self.credential().is_some(),
    }
  }

  /// Generate a new document for `request`.
  #[instrument(level = "info", skip(self, request), fields(topic_len = request.topic.len(), level = ?request.level, length = ?request.length, language = ?request.language))]
  pub async fn submit(&self, request: GenerationRequest) -> Result<GenerationOutcome, ClassifiedError> {
    request.validate().map_err(ClassifiedError::invalid_request)?;
    let credential = self.require_credential().await?;
    let ticket = self.begin(&request).await;
    let client = self.client.clone();
    let sent = request.clone();
    self.run_detached(ticket, request, async move { client.generate(&sent, &credential).await }).await
  }

  /// Run the last submitted (or selected) request again.
  #[instrument(level = "info", skip(self))]
  pub async fn regenerate(&self) -> Result<GenerationOutcome, ClassifiedError> {
    let last = { self.session.read().await.last_request.clone() };
    match last {
      Some(request) => self.submit(request).await,
      None => Err(ClassifiedError::invalid_request("nothing to regenerate")),
    }
  }

  /// Ask for a longer version of the current document; the reply replaces it.
  #[instrument(level = "info", skip(self))]
  pub async fn extend(&self) -> Result<GenerationOutcome, ClassifiedError> {
    let current = { self.session.read().await.current.clone() };
    let Some(doc) = current else {
      return Err(ClassifiedError::invalid_request("nothing to extend"));
    };
    let credential = self.require_credential().await?;
    let ticket = self.begin(&doc.request).await;
    let client = self.client.clone();
    let (prior, request) = (doc.content, doc.request);
    let sent = request.clone();
    self.run_detached(ticket, request, async move { client.extend(&prior, &sent, &credential).await }).await
  }

  /// Close the current document. A reply still in flight is dropped.
  pub async fn clear(&self) {
    let mut session = self.session.write().await;
    session.latest_ticket += 1;
    session.loading = false;
    session.current = None;
    session.last_request = None;
    session.error = None;
    info!(target: "research_backend", "Current document cleared");
  }

  pub async fn history(&self) -> Vec<HistoryEntry> {
    self.session.read().await.history.clone()
  }

  /// Load a history entry as the current document.
  #[instrument(level = "info", skip(self))]
  pub async fn select_history(&self, id: &str) -> Option<GeneratedDocument> {
    let mut session = self.session.write().await;
    let doc = history::find(&session.history, id)?.to_document();
    session.latest_ticket += 1;
    session.loading = false;
    session.last_request = Some(doc.request.clone());
    session.current = Some(doc.clone());
    session.error = None;
    Some(doc)
  }

  /// Returns whether the entry existed.
  #[instrument(level = "info", skip(self))]
  pub async fn delete_history(&self, id: &str) -> bool {
    let mut session = self.session.write().await;
    if !history::remove(&mut session.history, id) {
      return false;
    }
    if let Err(e) = self.history_store.save(&session.history) {
      error!(target: "history", error = %e, "Failed to persist history after delete");
    }
    true
  }

  /// Both render targets for the current document, if any.
  pub async fn render_current(&self, params: &RenderParams) -> Option<RenderedDocument> {
    let doc = { self.session.read().await.current.clone() }?;
    Some(self.render_document(&doc, params))
  }

  pub fn render_document(&self, doc: &GeneratedDocument, params: &RenderParams) -> RenderedDocument {
    let options = self.options_for(params, doc.request.language);
    format::render(&doc.content, &options)
  }

  pub fn options_for(&self, params: &RenderParams, language: Language) -> RenderOptions {
    RenderOptions::resolve(params, language, &self.render_defaults)
  }

  pub async fn clipboard(&self, params: &RenderParams) -> Option<ClipboardPayload> {
    let doc = { self.session.read().await.current.clone() }?;
    let options = self.options_for(params, doc.request.language);
    Some(ClipboardPayload {
      html: html::render_html(&format::parse(&doc.content), &options),
      text: doc.content,
    })
  }

  /// Standalone printable page for the current document.
  pub async fn printable(&self, params: &RenderParams) -> Option<String> {
    let doc = { self.session.read().await.current.clone() }?;
    let options = self.options_for(params, doc.request.language);
    Some(html::render_printable_page(
      &format::parse(&doc.content),
      &options,
      doc.request.topic.trim(),
      footer_note(doc.request.language),
    ))
  }

  async fn require_credential(&self) -> Result<String, ClassifiedError> {
    match self.credential() {
      Some(c) => Ok(c),
      None => {
        let e = ClassifiedError::credential_missing(self.ui_language);
        warn!(target: "research_backend", "Generation requested without a credential");
        self.session.write().await.error = Some(e.clone());
        Err(e)
      }
    }
  }

  async fn begin(&self, request: &GenerationRequest) -> u64 {
    let mut session = self.session.write().await;
    session.latest_ticket += 1;
    session.loading = true;
    session.error = None;
    session.last_request = Some(request.clone());
    session.latest_ticket
  }

  /// Await `call` and apply its reply on a spawned task; the caller only waits for it.
  async fn run_detached<F>(
    &self,
    ticket: u64,
    request: GenerationRequest,
    call: F,
  ) -> Result<GenerationOutcome, ClassifiedError>
  where
    F: Future<Output = Result<String, GenerationError>> + Send + 'static,
  {
    let session = self.session.clone();
    let history_store = self.history_store.clone();
    let ui_language = self.ui_language;
    let task = tokio::spawn(
      async move {
        let result = call.await;
        finish(&session, &history_store, ui_language, ticket, request, result).await
      }
      .in_current_span(),
    );

    match task.await {
      Ok(outcome) => outcome,
      Err(e) => {
        error!(target: "research_backend", ticket, error = %e, "Generation task failed");
        let mut session = self.session.write().await;
        if session.latest_ticket == ticket {
          session.loading = false;
        }
        let classified = ClassifiedError::new(ErrorCategory::Unknown, self.ui_language, e.to_string());
        session.error = Some(classified.clone());
        Err(classified)
      }
    }
  }
}

/// Apply a backend reply to the session unless a newer ticket was taken meanwhile.
async fn finish(
  session: &RwLock<Session>,
  history_store: &HistoryStore,
  ui_language: Language,
  ticket: u64,
  request: GenerationRequest,
  result: Result<String, GenerationError>,
) -> Result<GenerationOutcome, ClassifiedError> {
  let mut session = session.write().await;
  if ticket != session.latest_ticket {
    warn!(target: "research_backend", ticket, latest = session.latest_ticket, ok = result.is_ok(), "Discarding reply for a superseded request");
    return Ok(GenerationOutcome::Superseded { ticket });
  }
  session.loading = false;

  match result {
    Ok(content) => {
      let doc = GeneratedDocument::new(content, request);
      history::push_capped(&mut session.history, HistoryEntry::from_document(&doc));
      if let Err(e) = history_store.save(&session.history) {
        error!(target: "history", error = %e, "Failed to persist history");
      }
      session.current = Some(doc.clone());
      session.error = None;
      info!(target: "research_backend", ticket, content_len = doc.content.len(), history = session.history.len(), "Document generated");
      Ok(GenerationOutcome::Completed(doc))
    }
    Err(e) => {
      let classified = classify(&e.to_string(), ui_language);
      warn!(target: "research_backend", ticket, category = ?classified.category, "Generation failed");
      session.error = Some(classified.clone());
      Err(classified)
    }
  }
}

/// Footer line of the printable page.
fn footer_note(language: Language) -> &'static str {
  match language {
    Language::Arabic => "تم إعداد هذا التقرير البحثي آلياً عبر منصة مولد الأبحاث التربوية المتقدم.",
    Language::English => "This research report was prepared automatically by the Educational Research Generator.",
    Language::French => "Ce rapport de recherche a été préparé automatiquement par le Générateur de recherches éducatives.",
  }
}
