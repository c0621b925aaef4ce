//! The house Markdown subset: parsing and rendering of generated documents.
//!
//! Dialect:
//!   - `## ` / `### ` headings
//!   - `- ` list items
//!   - blank lines as paragraph gaps
//!   - `$...$` formulas with `_sub` / `^sup` runs
//!   - `---`, `***`, `___` rule lines, which are dropped
//!   - `*` / `**` emphasis markers, which are stripped
//!
//! Parsing is a single forward pass over lines and never fails. Both render targets
//! (`screen` for live display, `html` for clipboard/print export) consume the same
//! parsed `Block` sequence.

pub mod html;
pub mod inline;
pub mod screen;

use serde::{Deserialize, Serialize};

use crate::domain::Language;
pub use inline::{Inline, MathRun};

/// Text direction of the whole document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Rtl,
  Ltr,
}

impl Direction {
  pub fn for_language(language: Language) -> Self {
    match language {
      Language::Arabic => Direction::Rtl,
      Language::English | Language::French => Direction::Ltr,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Direction::Rtl => "rtl",
      Direction::Ltr => "ltr",
    }
  }

  /// CSS `text-align` / margin side that starts a line.
  pub fn start_side(self) -> &'static str {
    match self {
      Direction::Rtl => "right",
      Direction::Ltr => "left",
    }
  }
}

pub const MIN_FONT_SIZE: f32 = 12.0;
pub const MAX_FONT_SIZE: f32 = 32.0;
pub const MIN_LINE_HEIGHT: f32 = 1.0;
pub const MAX_LINE_HEIGHT: f32 = 2.5;

/// Typography defaults, overridable from the `[render]` table of the config file.
#[derive(Clone, Debug, Deserialize)]
pub struct RenderDefaults {
  #[serde(default = "default_font_size")]
  pub font_size: f32,
  #[serde(default = "default_line_height")]
  pub line_height: f32,
}

fn default_font_size() -> f32 { 18.0 }
fn default_line_height() -> f32 { 1.6 }

impl Default for RenderDefaults {
  fn default() -> Self {
    Self { font_size: default_font_size(), line_height: default_line_height() }
  }
}

/// Caller-supplied overrides (query string or message body).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderParams {
  #[serde(default)]
  pub direction: Option<Direction>,
  #[serde(default)]
  pub font_size: Option<f32>,
  #[serde(default)]
  pub line_height: Option<f32>,
}

/// Fully resolved typography for one render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
  pub direction: Direction,
  pub font_size: f32,
  pub line_height: f32,
}

impl RenderOptions {
  /// Clamps font size and line height to the ranges the reader controls allow.
  /// Non-finite values fall back to the defaults.
  pub fn new(direction: Direction, font_size: f32, line_height: f32) -> Self {
    let defaults = RenderDefaults::default();
    let font_size = if font_size.is_finite() { font_size } else { defaults.font_size };
    let line_height = if line_height.is_finite() { line_height } else { defaults.line_height };
    Self {
      direction,
      font_size: font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
      line_height: line_height.clamp(MIN_LINE_HEIGHT, MAX_LINE_HEIGHT),
    }
  }

  /// Missing params come from the document language and the configured defaults.
  pub fn resolve(params: &RenderParams, language: Language, defaults: &RenderDefaults) -> Self {
    Self::new(
      params.direction.unwrap_or_else(|| Direction::for_language(language)),
      params.font_size.unwrap_or(defaults.font_size),
      params.line_height.unwrap_or(defaults.line_height),
    )
  }
}

/// Block kinds shared by both render targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
  Heading2,
  Heading3,
  ListItem,
  Paragraph,
  Blank,
}

/// Parser output. `ListOpen` / `ListClose` always come in balanced pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
  Heading { level: u8, content: Vec<Inline> },
  ListOpen,
  ListItem(Vec<Inline>),
  ListClose,
  Paragraph(Vec<Inline>),
  Blank,
}

impl Block {
  /// Kind of a content block; `None` for list boundaries.
  pub fn kind(&self) -> Option<NodeKind> {
    match self {
      Block::Heading { level: 2, .. } => Some(NodeKind::Heading2),
      Block::Heading { .. } => Some(NodeKind::Heading3),
      Block::ListItem(_) => Some(NodeKind::ListItem),
      Block::Paragraph(_) => Some(NodeKind::Paragraph),
      Block::Blank => Some(NodeKind::Blank),
      Block::ListOpen | Block::ListClose => None,
    }
  }

  pub fn content(&self) -> &[Inline] {
    match self {
      Block::Heading { content, .. } | Block::ListItem(content) | Block::Paragraph(content) => content,
      Block::ListOpen | Block::ListClose | Block::Blank => &[],
    }
  }
}

fn is_rule(trimmed: &str) -> bool {
  matches!(trimmed, "---" | "***" | "___")
}

/// Parse a document into blocks. Total: every input yields a sequence.
pub fn parse(text: &str) -> Vec<Block> {
  let mut blocks = Vec::new();
  let mut in_list = false;

  for line in text.lines() {
    if is_rule(line.trim()) {
      continue;
    }

    let block = classify(&inline::strip_emphasis(line));
    let is_item = matches!(block, Block::ListItem(_));
    if is_item && !in_list {
      blocks.push(Block::ListOpen);
      in_list = true;
    } else if !is_item && in_list {
      blocks.push(Block::ListClose);
      in_list = false;
    }
    blocks.push(block);
  }

  if in_list {
    blocks.push(Block::ListClose);
  }
  blocks
}

fn classify(line: &str) -> Block {
  let trimmed = line.trim();
  if let Some(rest) = trimmed.strip_prefix("## ") {
    Block::Heading { level: 2, content: inline::parse_inline(rest) }
  } else if let Some(rest) = trimmed.strip_prefix("### ") {
    Block::Heading { level: 3, content: inline::parse_inline(rest) }
  } else if let Some(rest) = trimmed.strip_prefix("- ") {
    Block::ListItem(inline::parse_inline(rest))
  } else if trimmed.is_empty() {
    Block::Blank
  } else {
    Block::Paragraph(inline::parse_inline(line.trim_end()))
  }
}

/// Both targets for one document.
#[derive(Clone, Debug, Serialize)]
pub struct RenderedDocument {
  pub screen: screen::ScreenDocument,
  pub html: String,
}

pub fn render(text: &str, options: &RenderOptions) -> RenderedDocument {
  let blocks = parse(text);
  RenderedDocument {
    screen: screen::render_screen(&blocks, options),
    html: html::render_html(&blocks, options),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const EXAMPLE: &str = "## Intro\nWater is $H_2O$ and important.\n\n- point one\n- point two\n---\n";

  fn text(s: &str) -> Inline {
    Inline::Text { text: s.into() }
  }

  #[test]
  fn example_document_parses_into_expected_blocks() {
    let blocks = parse(EXAMPLE);
    assert_eq!(
      blocks,
      vec![
        Block::Heading { level: 2, content: vec![text("Intro")] },
        Block::Paragraph(vec![
          text("Water is "),
          Inline::Math {
            runs: vec![
              MathRun::Literal("H".into()),
              MathRun::Subscript("2".into()),
              MathRun::Literal("O".into()),
            ],
          },
          text(" and important."),
        ]),
        Block::Blank,
        Block::ListOpen,
        Block::ListItem(vec![text("point one")]),
        Block::ListItem(vec![text("point two")]),
        Block::ListClose,
      ]
    );
  }

  #[test]
  fn empty_input_yields_nothing() {
    assert!(parse("").is_empty());
  }

  #[test]
  fn garbage_input_never_panics() {
    let inputs = [
      "\u{0}\u{1}$$$_^",
      "$_$^$",
      "- \n- \n##\n###\n-",
      "\r\n\r\n***\r\n",
      "$\u{202e}x_\u{1F600}^$",
    ];
    for input in inputs {
      let blocks = parse(input);
      let opens = blocks.iter().filter(|b| **b == Block::ListOpen).count();
      let closes = blocks.iter().filter(|b| **b == Block::ListClose).count();
      assert_eq!(opens, closes, "input {input:?}");
    }
  }

  #[test]
  fn rule_lines_are_dropped_but_keep_list_open() {
    let blocks = parse("- a\n  ---  \n- b\n___\n***");
    assert_eq!(
      blocks,
      vec![
        Block::ListOpen,
        Block::ListItem(vec![text("a")]),
        Block::ListItem(vec![text("b")]),
        Block::ListClose,
      ]
    );
  }

  #[test]
  fn emphasis_is_stripped_before_classification() {
    let blocks = parse("**## Starred heading**\n## **Bold** title\n- *item*");
    assert_eq!(blocks[0], Block::Heading { level: 2, content: vec![text("Starred heading")] });
    assert_eq!(blocks[1], Block::Heading { level: 2, content: vec![text("Bold title")] });
    assert_eq!(blocks[3], Block::ListItem(vec![text("item")]));
  }

  #[test]
  fn only_asterisks_becomes_blank() {
    assert_eq!(parse("**"), vec![Block::Blank]);
  }

  #[test]
  fn separate_lists_each_get_boundaries() {
    let blocks = parse("- a\ntext\n- b\n\n- c");
    let kinds: Vec<_> = blocks
      .iter()
      .map(|b| match b {
        Block::ListOpen => "open",
        Block::ListClose => "close",
        Block::ListItem(_) => "item",
        Block::Paragraph(_) => "p",
        Block::Blank => "blank",
        Block::Heading { .. } => "h",
      })
      .collect();
    assert_eq!(
      kinds,
      vec!["open", "item", "close", "p", "open", "item", "close", "blank", "open", "item", "close"]
    );
  }

  #[test]
  fn level_three_heading_and_crlf() {
    let blocks = parse("### Sub\r\nbody\r\n");
    assert_eq!(blocks[0], Block::Heading { level: 3, content: vec![text("Sub")] });
    assert_eq!(blocks[1], Block::Paragraph(vec![text("body")]));
  }

  #[test]
  fn paragraph_keeps_inline_math_and_unpaired_dollar() {
    let blocks = parse("price $5\nnext line");
    assert_eq!(blocks, vec![
      Block::Paragraph(vec![text("price $5")]),
      Block::Paragraph(vec![text("next line")]),
    ]);
  }

  #[test]
  fn options_clamp_and_resolve() {
    let o = RenderOptions::new(Direction::Ltr, 100.0, 0.2);
    assert_eq!(o.font_size, MAX_FONT_SIZE);
    assert_eq!(o.line_height, MIN_LINE_HEIGHT);

    let o = RenderOptions::new(Direction::Ltr, f32::NAN, f32::INFINITY);
    assert_eq!(o.font_size, 18.0);
    assert_eq!(o.line_height, 1.6);

    let resolved = RenderOptions::resolve(&RenderParams::default(), Language::Arabic, &RenderDefaults::default());
    assert_eq!(resolved.direction, Direction::Rtl);
    let params = RenderParams { direction: Some(Direction::Ltr), font_size: Some(20.0), line_height: None };
    let resolved = RenderOptions::resolve(&params, Language::Arabic, &RenderDefaults::default());
    assert_eq!(resolved, RenderOptions { direction: Direction::Ltr, font_size: 20.0, line_height: 1.6 });
  }
}
