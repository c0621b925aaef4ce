//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to `AppState`. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::errors::ClassifiedError;
use crate::format::RenderParams;
use crate::protocol::{ClientWsMessage, GenerationOut, HistoryItemOut, ServerWsMessage};
use crate::routes::http::generation_out;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "research_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "research_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "research_backend", kind = incoming.kind(), "WS message received");
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { error: ClassifiedError::invalid_request(format!("Invalid JSON: {}", e)) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "error": { "category": "unknown", "message": format!("Serialization error: {}", e) } }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "research_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "research_backend", "WebSocket disconnected");
}

fn generation_reply(state: &AppState, result: Result<crate::state::GenerationOutcome, ClassifiedError>) -> ServerWsMessage {
  match result {
    Ok(outcome) => {
      let result: GenerationOut = generation_out(state, outcome);
      ServerWsMessage::Generation { result }
    }
    Err(error) => ServerWsMessage::Error { error },
  }
}

/// Only the message kind is recorded; payloads (credentials, topics) stay out of the span.
#[instrument(level = "info", skip(msg, state), fields(kind = msg.kind()))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Submit { request } => {
      let result = state.submit(request).await;
      tracing::info!(target: "research", ok = result.is_ok(), "WS submit finished");
      generation_reply(state, result)
    }

    ClientWsMessage::Regenerate => generation_reply(state, state.regenerate().await),

    ClientWsMessage::Extend => generation_reply(state, state.extend().await),

    ClientWsMessage::Clear => {
      state.clear().await;
      ServerWsMessage::Cleared
    }

    ClientWsMessage::Snapshot => ServerWsMessage::Snapshot { snapshot: state.snapshot().await },

    ClientWsMessage::ListHistory => ServerWsMessage::History {
      items: state.history().await.iter().map(HistoryItemOut::from).collect(),
    },

    ClientWsMessage::SelectHistory { id } => match state.select_history(&id).await {
      Some(document) => {
        let render = state.render_document(&document, &RenderParams::default());
        ServerWsMessage::Document { document, render }
      }
      None => ServerWsMessage::Error { error: ClassifiedError::invalid_request("history entry not found") },
    },

    ClientWsMessage::DeleteHistory { id } => {
      if state.delete_history(&id).await {
        ServerWsMessage::HistoryDeleted { id }
      } else {
        ServerWsMessage::Error { error: ClassifiedError::invalid_request("history entry not found") }
      }
    }

    ClientWsMessage::Render { params } => match state.render_current(&params).await {
      Some(render) => ServerWsMessage::Rendered { render },
      None => ServerWsMessage::Error { error: ClassifiedError::invalid_request("document not found") },
    },

    ClientWsMessage::Clipboard { params } => match state.clipboard(&params).await {
      Some(payload) => ServerWsMessage::Clipboard { html: payload.html, text: payload.text },
      None => ServerWsMessage::Error { error: ClassifiedError::invalid_request("document not found") },
    },

    ClientWsMessage::SetCredential { api_key } => match state.set_credential(api_key.expose()) {
      Ok(()) => ServerWsMessage::Credential { present: true },
      Err(error) => ServerWsMessage::Error { error },
    },

    ClientWsMessage::ClearCredential => match state.clear_credential() {
      Ok(()) => ServerWsMessage::Credential { present: state.credential().is_some() },
      Err(error) => ServerWsMessage::Error { error },
    },
  }
}
