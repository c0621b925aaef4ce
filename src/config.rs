//! Loading service configuration (prompt templates, render defaults, UI language) from TOML.
//!
//! See `AppConfig` and `Prompts` for the expected schema. Every table is optional.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Language;
use crate::format::RenderDefaults;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub render: RenderDefaults,
  #[serde(default)]
  pub ui: UiConfig,
}

/// Language of error messages and the printable footer.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct UiConfig {
  #[serde(default)]
  pub language: Language,
}

/// Prompt templates used by the text-generation client.
///
/// Placeholders: `{language}`, `{direction}`, `{level}`, `{level_rules}`,
/// `{length_rules}`, `{structure_rules}`, `{topic}`, `{details}` and, for the
/// extend template only, `{prior}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system_template: String,
  pub user_template: String,
  pub extend_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system_template: "You are an expert in educational research writing.\n\
Your task is to write a professionally formatted educational research text in {language}.\n\n\
General rules:\n\
- Write only in {language}, accurately and eloquently.\n\
- The text is read {direction}.\n\
{structure_rules}\n\n\
Target educational level ({level}):\n\
{level_rules}\n\n\
Length:\n\
{length_rules}\n\n\
Output only the formatted research text."
        .into(),
      user_template: "Write an educational research text on the following topic: [{topic}]\n\
Language: [{language}]\n\
Target educational level: [{level}]\n\
{details}"
        .into(),
      extend_user_template: "Here is an existing educational research text on [{topic}]:\n\n\
<<<\n{prior}\n>>>\n\n\
Rewrite it as a longer, more detailed version: keep its structure and every correct point, \
add depth, examples and explanation, and return the COMPLETE new text, not only the additions.\n\
Language: [{language}]\n\
Target educational level: [{level}]\n\
{details}"
        .into(),
    }
  }
}

/// Attempt to load `AppConfig` from RESEARCH_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("RESEARCH_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "research_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "research_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "research_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
