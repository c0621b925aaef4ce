//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EducationalLevel, GeneratedDocument, GenerationRequest, HistoryEntry, Language, ResearchLength};
use crate::errors::ClassifiedError;
use crate::format::{RenderParams, RenderedDocument};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Submit {
        request: GenerationRequest,
    },
    Regenerate,
    Extend,
    Clear,
    Snapshot,
    ListHistory,
    SelectHistory {
        id: String,
    },
    DeleteHistory {
        id: String,
    },
    Render {
        #[serde(default)]
        params: RenderParams,
    },
    Clipboard {
        #[serde(default)]
        params: RenderParams,
    },
    SetCredential {
        #[serde(rename = "apiKey")]
        api_key: SecretString,
    },
    ClearCredential,
}

impl ClientWsMessage {
    /// Variant name, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientWsMessage::Ping => "ping",
            ClientWsMessage::Submit { .. } => "submit",
            ClientWsMessage::Regenerate => "regenerate",
            ClientWsMessage::Extend => "extend",
            ClientWsMessage::Clear => "clear",
            ClientWsMessage::Snapshot => "snapshot",
            ClientWsMessage::ListHistory => "list_history",
            ClientWsMessage::SelectHistory { .. } => "select_history",
            ClientWsMessage::DeleteHistory { .. } => "delete_history",
            ClientWsMessage::Render { .. } => "render",
            ClientWsMessage::Clipboard { .. } => "clipboard",
            ClientWsMessage::SetCredential { .. } => "set_credential",
            ClientWsMessage::ClearCredential => "clear_credential",
        }
    }
}

/// A credential received from a client. `Debug` never prints the value.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString(<{} chars redacted>)", self.0.chars().count())
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Generation {
        #[serde(flatten)]
        result: GenerationOut,
    },
    Snapshot {
        snapshot: crate::state::SessionSnapshot,
    },
    Cleared,
    History {
        items: Vec<HistoryItemOut>,
    },
    Document {
        document: GeneratedDocument,
        render: RenderedDocument,
    },
    HistoryDeleted {
        id: String,
    },
    Rendered {
        render: RenderedDocument,
    },
    Clipboard {
        html: String,
        text: String,
    },
    Credential {
        present: bool,
    },
    Error {
        error: ClassifiedError,
    },
}

/// Outcome of submit / regenerate / extend.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOut {
    Completed {
        document: GeneratedDocument,
        render: RenderedDocument,
    },
    /// A newer request was started; this reply was dropped.
    Superseded {
        ticket: u64,
    },
}

/// Denormalized history row for list display (no content).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItemOut {
    pub id: String,
    pub topic: String,
    pub level: EducationalLevel,
    pub length: ResearchLength,
    pub language: Language,
    pub single_paragraph: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<&HistoryEntry> for HistoryItemOut {
    fn from(e: &HistoryEntry) -> Self {
        Self {
            id: e.id.clone(),
            topic: e.request.topic.clone(),
            level: e.request.level,
            length: e.request.length,
            language: e.request.language,
            single_paragraph: e.request.single_paragraph,
            timestamp: e.timestamp,
        }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct RenderIn {
    pub text: String,
    #[serde(default)]
    pub language: Language,
    #[serde(flatten)]
    pub params: RenderParams,
}

#[derive(Debug, Deserialize)]
pub struct CredentialIn {
    #[serde(rename = "apiKey")]
    pub api_key: SecretString,
}
#[derive(Serialize)]
pub struct CredentialOut {
    pub present: bool,
}

#[derive(Serialize)]
pub struct DocumentOut {
    pub document: GeneratedDocument,
    pub render: RenderedDocument,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
