//! HTTP endpoint handlers. These are thin wrappers that forward to `AppState`.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::domain::GenerationRequest;
use crate::errors::{ClassifiedError, ErrorCategory};
use crate::format::{self, RenderParams};
use crate::protocol::*;
use crate::state::{AppState, GenerationOutcome};

/// HTTP status for each error category.
pub fn status_for(category: ErrorCategory) -> StatusCode {
  match category {
    ErrorCategory::CredentialMissing | ErrorCategory::CredentialInvalid => StatusCode::UNAUTHORIZED,
    ErrorCategory::PermissionDenied => StatusCode::FORBIDDEN,
    ErrorCategory::QuotaExceeded | ErrorCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
    ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
    ErrorCategory::ContentFiltered => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorCategory::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    ErrorCategory::NetworkFailure | ErrorCategory::InternalBackendError | ErrorCategory::Unknown => StatusCode::BAD_GATEWAY,
    ErrorCategory::InvalidRequest => StatusCode::BAD_REQUEST,
    ErrorCategory::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ClassifiedError {
  fn into_response(self) -> Response {
    (status_for(self.category), Json(self)).into_response()
  }
}

fn not_found(what: &str) -> Response {
  (StatusCode::NOT_FOUND, Json(ClassifiedError::invalid_request(format!("{what} not found")))).into_response()
}

/// Wrap an outcome with the default rendering of the new document.
pub fn generation_out(state: &AppState, outcome: GenerationOutcome) -> GenerationOut {
  match outcome {
    GenerationOutcome::Completed(document) => {
      let render = state.render_document(&document, &RenderParams::default());
      GenerationOut::Completed { document, render }
    }
    GenerationOutcome::Superseded { ticket } => GenerationOut::Superseded { ticket },
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.snapshot().await)
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len(), language = ?body.language))]
pub async fn http_post_research(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerationRequest>,
) -> Result<Json<GenerationOut>, ClassifiedError> {
  let outcome = state.submit(body).await?;
  info!(target: "research", superseded = matches!(outcome, GenerationOutcome::Superseded { .. }), "HTTP submit finished");
  Ok(Json(generation_out(&state, outcome)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_regenerate(State(state): State<Arc<AppState>>) -> Result<Json<GenerationOut>, ClassifiedError> {
  let outcome = state.regenerate().await?;
  Ok(Json(generation_out(&state, outcome)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_extend(State(state): State<Arc<AppState>>) -> Result<Json<GenerationOut>, ClassifiedError> {
  let outcome = state.extend().await?;
  Ok(Json(generation_out(&state, outcome)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_research(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.clear().await;
  StatusCode::NO_CONTENT
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_render(
  State(state): State<Arc<AppState>>,
  Query(params): Query<RenderParams>,
) -> Response {
  match state.render_current(&params).await {
    Some(render) => Json(render).into_response(),
    None => not_found("document"),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_clipboard(
  State(state): State<Arc<AppState>>,
  Query(params): Query<RenderParams>,
) -> Response {
  match state.clipboard(&params).await {
    Some(payload) => Json(payload).into_response(),
    None => not_found("document"),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_print(
  State(state): State<Arc<AppState>>,
  Query(params): Query<RenderParams>,
) -> Response {
  match state.printable(&params).await {
    Some(page) => ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], page).into_response(),
    None => not_found("document"),
  }
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len(), language = ?body.language))]
pub async fn http_post_render(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RenderIn>,
) -> impl IntoResponse {
  let options = state.options_for(&body.params, body.language);
  Json(format::render(&body.text, &options))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let items: Vec<HistoryItemOut> = state.history().await.iter().map(HistoryItemOut::from).collect();
  Json(items)
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_post_select_history(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  match state.select_history(&id).await {
    Some(document) => {
      let render = state.render_document(&document, &RenderParams::default());
      info!(target: "history", %id, "History entry selected");
      Json(DocumentOut { document, render }).into_response()
    }
    None => not_found("history entry"),
  }
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_history(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  if state.delete_history(&id).await {
    info!(target: "history", %id, "History entry deleted");
    StatusCode::NO_CONTENT.into_response()
  } else {
    not_found("history entry")
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_credential(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(CredentialOut { present: state.credential().is_some() })
}

#[instrument(level = "info", skip(state, body), fields(key_len = body.api_key.expose().len()))]
pub async fn http_put_credential(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CredentialIn>,
) -> Result<Json<CredentialOut>, ClassifiedError> {
  state.set_credential(body.api_key.expose())?;
  Ok(Json(CredentialOut { present: true }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_credential(State(state): State<Arc<AppState>>) -> Result<Json<CredentialOut>, ClassifiedError> {
  state.clear_credential()?;
  Ok(Json(CredentialOut { present: state.credential().is_some() }))
}
