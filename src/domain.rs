//! Domain models: the generation brief, generated documents and history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Target educational level. `Auto` lets the model pick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationalLevel {
  #[default]
  Primary,
  Intermediate,
  Secondary,
  Auto,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchLength {
  #[default]
  Short,
  Medium,
  Long,
}

/// Language of the generated document (and of user-facing messages).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
  #[default]
  Arabic,
  English,
  French,
}

/// What the user asked for. Never mutated after submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
  pub topic: String,
  #[serde(default)] pub level: EducationalLevel,
  #[serde(default)] pub length: ResearchLength,
  #[serde(default)] pub language: Language,
  #[serde(default)] pub single_paragraph: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub additional_details: Option<String>,
}

impl GenerationRequest {
  pub fn new(topic: impl Into<String>) -> Self {
    Self {
      topic: topic.into(),
      level: EducationalLevel::default(),
      length: ResearchLength::default(),
      language: Language::default(),
      single_paragraph: false,
      additional_details: None,
    }
  }

  /// The only hard requirement of the form: a non-blank topic.
  pub fn validate(&self) -> Result<(), String> {
    if self.topic.trim().is_empty() {
      return Err("topic must not be empty".into());
    }
    Ok(())
  }

  /// Additional details, if the user wrote anything besides whitespace.
  pub fn details(&self) -> Option<&str> {
    self.additional_details.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }
}

/// A complete generated document. Regenerate/extend replace it wholesale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
  pub content: String,
  pub request: GenerationRequest,
  pub generated_at: DateTime<Utc>,
}

impl GeneratedDocument {
  pub fn new(content: String, request: GenerationRequest) -> Self {
    Self { content, request, generated_at: Utc::now() }
  }
}

/// One persisted past generation. Request fields are flattened so list views can
/// show topic/level/language without unpacking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
  pub id: String,
  #[serde(flatten)]
  pub request: GenerationRequest,
  pub content: String,
  pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
  pub fn from_document(doc: &GeneratedDocument) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      request: doc.request.clone(),
      content: doc.content.clone(),
      timestamp: doc.generated_at,
    }
  }

  pub fn to_document(&self) -> GeneratedDocument {
    GeneratedDocument {
      content: self.content.clone(),
      request: self.request.clone(),
      generated_at: self.timestamp,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_defaults_match_the_form() {
    let req: GenerationRequest = serde_json::from_str(r#"{"topic":"الماء"}"#).unwrap();
    assert_eq!(req.level, EducationalLevel::Primary);
    assert_eq!(req.length, ResearchLength::Short);
    assert_eq!(req.language, Language::Arabic);
    assert!(!req.single_paragraph);
    assert_eq!(req.details(), None);
  }

  #[test]
  fn request_uses_camel_case_fields() {
    let req: GenerationRequest = serde_json::from_str(
      r#"{"topic":"Volcanoes","level":"auto","length":"long","language":"french","singleParagraph":true,"additionalDetails":"  cite examples "}"#,
    )
    .unwrap();
    assert_eq!(req.level, EducationalLevel::Auto);
    assert_eq!(req.length, ResearchLength::Long);
    assert_eq!(req.language, Language::French);
    assert!(req.single_paragraph);
    assert_eq!(req.details(), Some("cite examples"));
  }

  #[test]
  fn blank_topic_is_rejected() {
    assert!(GenerationRequest::new("   ").validate().is_err());
    assert!(GenerationRequest::new("Water").validate().is_ok());
  }

  #[test]
  fn history_entry_flattens_request_fields() {
    let doc = GeneratedDocument::new("## A".into(), GenerationRequest::new("Water"));
    let entry = HistoryEntry::from_document(&doc);
    let v = serde_json::to_value(&entry).unwrap();
    assert_eq!(v["topic"], "Water");
    assert_eq!(v["language"], "arabic");
    assert_eq!(v["content"], "## A");
    assert!(v.get("request").is_none());
    assert_eq!(entry.to_document(), doc);
  }
}
