//! Prompt construction: a pure mapping from `GenerationRequest` to a system/user pair.
//!
//! All enum-to-instruction text lives in the exhaustive tables below, so a new
//! level/length/language can't silently fall through.

use serde::Serialize;

use crate::config::Prompts;
use crate::domain::{EducationalLevel, GenerationRequest, Language, ResearchLength};
use crate::util::fill_template;

/// What gets sent to the chat backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InstructionPair {
  pub system: String,
  pub user: String,
}

fn language_name(language: Language) -> &'static str {
  match language {
    Language::Arabic => "Arabic",
    Language::English => "English",
    Language::French => "French",
  }
}

fn direction_hint(language: Language) -> &'static str {
  match language {
    Language::Arabic => "right-to-left (RTL)",
    Language::English | Language::French => "left-to-right (LTR)",
  }
}

fn level_name(level: EducationalLevel) -> &'static str {
  match level {
    EducationalLevel::Primary => "primary school",
    EducationalLevel::Intermediate => "middle school",
    EducationalLevel::Secondary => "secondary school",
    EducationalLevel::Auto => "chosen to suit the topic",
  }
}

fn level_rules(level: EducationalLevel) -> &'static str {
  match level {
    EducationalLevel::Primary => "- Short sentences, easy words, direct explanation.",
    EducationalLevel::Intermediate => "- Clearer explanation supported by examples.",
    EducationalLevel::Secondary => "- Analysis, justification and a deep logical organisation.",
    EducationalLevel::Auto => {
      "- Pick the school level that best suits the topic and keep vocabulary and depth consistent with it."
    }
  }
}

fn length_rules(length: ResearchLength, single_paragraph: bool) -> &'static str {
  match (length, single_paragraph) {
    (ResearchLength::Short, false) => "- Short: at most two main sections in the body.",
    (ResearchLength::Medium, false) => "- Medium: 3 to 4 main sections in the body.",
    (ResearchLength::Long, false) => "- Long: 5 or more main sections, expanded and detailed.",
    (ResearchLength::Short, true) => "- Short: about 80 words.",
    (ResearchLength::Medium, true) => "- Medium: about 150 words.",
    (ResearchLength::Long, true) => "- Long: about 250 words.",
  }
}

fn structure_rules(single_paragraph: bool) -> &'static str {
  if single_paragraph {
    "- Write exactly ONE cohesive paragraph: no headings, no lists, no separators.\n\
- Write chemical and mathematical notation between single $ signs, using _ for subscripts and ^ for superscripts (e.g. $H_2O$, $x^2$)."
  } else {
    "- Use \"## \" for main headings and \"### \" for subheadings.\n\
- Use \"- \" for list items and leave a blank line between paragraphs.\n\
- Follow the mandatory structure: introduction, body, conclusion.\n\
- Do not use asterisks (*) or separator lines (---).\n\
- Write chemical and mathematical notation between single $ signs, using _ for subscripts and ^ for superscripts (e.g. $H_2O$, $x^2$)."
  }
}

fn details_line(request: &GenerationRequest) -> String {
  match request.details() {
    Some(d) => format!("Additional details from the user: {d}"),
    None => String::new(),
  }
}

fn fill(tpl: &str, request: &GenerationRequest, prior: Option<&str>) -> String {
  let details = details_line(request);
  let mut pairs = vec![
    ("language", language_name(request.language)),
    ("direction", direction_hint(request.language)),
    ("level", level_name(request.level)),
    ("level_rules", level_rules(request.level)),
    ("length_rules", length_rules(request.length, request.single_paragraph)),
    ("structure_rules", structure_rules(request.single_paragraph)),
    ("topic", request.topic.trim()),
    ("details", details.as_str()),
  ];
  if let Some(p) = prior {
    pairs.push(("prior", p));
  }
  fill_template(tpl, &pairs).trim_end().to_string()
}

/// Instructions for a fresh document.
pub fn build_instructions(request: &GenerationRequest, prompts: &Prompts) -> InstructionPair {
  InstructionPair {
    system: fill(&prompts.system_template, request, None),
    user: fill(&prompts.user_template, request, None),
  }
}

/// Instructions for extending `prior` into a longer, complete replacement document.
pub fn build_extend_instructions(prior: &str, request: &GenerationRequest, prompts: &Prompts) -> InstructionPair {
  InstructionPair {
    system: fill(&prompts.system_template, request, None),
    user: fill(&prompts.extend_user_template, request, Some(prior)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request() -> GenerationRequest {
    GenerationRequest {
      topic: "  The water cycle ".into(),
      level: EducationalLevel::Secondary,
      length: ResearchLength::Medium,
      language: Language::French,
      single_paragraph: false,
      additional_details: Some("mention evaporation".into()),
    }
  }

  #[test]
  fn fresh_instructions_interpolate_every_field() {
    let pair = build_instructions(&request(), &Prompts::default());
    assert!(pair.system.contains("in French"));
    assert!(pair.system.contains("left-to-right"));
    assert!(pair.system.contains("deep logical organisation"));
    assert!(pair.system.contains("3 to 4 main sections"));
    assert!(pair.system.contains("\"## \""));
    assert!(pair.user.contains("[The water cycle]"));
    assert!(pair.user.contains("Additional details from the user: mention evaporation"));
    assert!(!pair.user.contains('{'));
    assert!(!pair.system.contains('{'));
  }

  #[test]
  fn single_paragraph_switches_structure_and_length() {
    let mut req = request();
    req.single_paragraph = true;
    req.language = Language::Arabic;
    req.additional_details = Some("   ".into());
    let pair = build_instructions(&req, &Prompts::default());
    assert!(pair.system.contains("ONE cohesive paragraph"));
    assert!(pair.system.contains("about 150 words"));
    assert!(pair.system.contains("right-to-left"));
    assert!(!pair.user.contains("Additional details"));
  }

  #[test]
  fn extend_feeds_prior_document_back() {
    let pair = build_extend_instructions("## Intro\nold text", &request(), &Prompts::default());
    assert!(pair.user.contains("## Intro\nold text"));
    assert!(pair.user.contains("COMPLETE new text"));
    assert_eq!(pair.system, build_instructions(&request(), &Prompts::default()).system);
  }

  #[test]
  fn placeholders_typed_by_the_user_stay_literal() {
    let mut req = request();
    req.topic = "Braces {details} and {prior}".into();
    req.additional_details = Some("see {topic}".into());
    let pair = build_extend_instructions("## Old", &req, &Prompts::default());
    assert!(pair.user.contains("[Braces {details} and {prior}]"));
    assert!(pair.user.contains("Additional details from the user: see {topic}"));
    assert_eq!(pair.user.matches("## Old").count(), 1);
  }

  #[test]
  fn custom_templates_are_honoured() {
    let prompts = Prompts {
      system_template: "S {level}".into(),
      user_template: "U {topic}".into(),
      extend_user_template: "E {prior}".into(),
    };
    let mut req = request();
    req.level = EducationalLevel::Auto;
    let pair = build_instructions(&req, &prompts);
    assert_eq!(pair.system, "S chosen to suit the topic");
    assert_eq!(pair.user, "U The water cycle");
  }
}
