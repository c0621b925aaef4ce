//! Inline scientific notation: `$...$` spans with `_sub` and `^sup` runs.
//!
//! A span is a non-empty run between two dollar signs with no dollar sign inside.
//! Dollar signs that do not pair up stay in the text as literal characters.

use serde::Serialize;

/// One inline segment of a heading, list item or paragraph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
  Text { text: String },
  /// Always laid out left-to-right, whatever the document direction.
  Math { runs: Vec<MathRun> },
}

/// Decomposition of a formula.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "camelCase")]
pub enum MathRun {
  Literal(String),
  Subscript(String),
  Superscript(String),
}

impl MathRun {
  pub fn text(&self) -> &str {
    match self {
      MathRun::Literal(s) | MathRun::Subscript(s) | MathRun::Superscript(s) => s,
    }
  }
}

/// Split a line into text and math segments.
pub fn parse_inline(text: &str) -> Vec<Inline> {
  let mut out = Vec::new();
  let mut literal = String::new();
  let mut rest = text;

  while let Some(open) = rest.find('$') {
    let after = &rest[open + 1..];
    match after.find('$') {
      // "$$": the first sign can't open a span, retry from the second one.
      Some(0) => {
        literal.push_str(&rest[..=open]);
        rest = after;
      }
      Some(close) => {
        literal.push_str(&rest[..open]);
        flush_text(&mut out, &mut literal);
        out.push(Inline::Math { runs: parse_formula(&after[..close]) });
        rest = &after[close + 1..];
      }
      None => break,
    }
  }

  literal.push_str(rest);
  flush_text(&mut out, &mut literal);
  out
}

fn flush_text(out: &mut Vec<Inline>, literal: &mut String) {
  if !literal.is_empty() {
    out.push(Inline::Text { text: std::mem::take(literal) });
  }
}

/// Decompose a formula body into literal, subscript and superscript runs.
///
/// The run after `_` or `^` is the maximal run of ASCII digits when it starts with a
/// digit, otherwise the maximal run of ASCII letters, so `H_2O` yields `H`, `2`, `O`.
/// A marker followed by anything else is kept as a literal character.
pub fn parse_formula(formula: &str) -> Vec<MathRun> {
  let bytes = formula.as_bytes();
  let mut runs = Vec::new();
  let mut start = 0;
  let mut i = 0;

  while i < bytes.len() {
    let marker = bytes[i];
    if marker == b'_' || marker == b'^' {
      let run = marker_run(&formula[i + 1..]);
      if !run.is_empty() {
        if start < i {
          runs.push(MathRun::Literal(formula[start..i].to_string()));
        }
        runs.push(if marker == b'_' {
          MathRun::Subscript(run.to_string())
        } else {
          MathRun::Superscript(run.to_string())
        });
        i += 1 + run.len();
        start = i;
        continue;
      }
    }
    i += 1;
  }

  if start < bytes.len() {
    runs.push(MathRun::Literal(formula[start..].to_string()));
  }
  runs
}

fn marker_run(s: &str) -> &str {
  let len = match s.bytes().next() {
    Some(b) if b.is_ascii_digit() => s.bytes().take_while(|b| b.is_ascii_digit()).count(),
    Some(b) if b.is_ascii_alphabetic() => s.bytes().take_while(|b| b.is_ascii_alphabetic()).count(),
    _ => 0,
  };
  &s[..len]
}

/// Emphasis asterisks carry no meaning in this dialect.
pub fn strip_emphasis(line: &str) -> String {
  line.replace('*', "")
}

/// Markup-free text of a segment list (math runs concatenated).
#[cfg(test)]
pub fn plain_text(inlines: &[Inline]) -> String {
  let mut out = String::new();
  for inline in inlines {
    match inline {
      Inline::Text { text } => out.push_str(text),
      Inline::Math { runs } => runs.iter().for_each(|r| out.push_str(r.text())),
    }
  }
  out
}
