//! Screen target: structured nodes for the live reader view.

use serde::Serialize;

use super::{Block, Direction, Inline, MathRun, NodeKind, RenderOptions};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDocument {
  pub direction: Direction,
  pub font_size: f32,
  pub line_height: f32,
  pub nodes: Vec<ScreenNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenNode {
  pub kind: NodeKind,
  /// Index of the list this item belongs to, counted from the top of the document.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub list_group: Option<usize>,
  pub runs: Vec<ScreenRun>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScreenRun {
  Text { text: String },
  Math { direction: Direction, runs: Vec<MathRun> },
}

#[cfg(test)]
impl ScreenNode {
  pub fn plain_text(&self) -> String {
    let mut out = String::new();
    for run in &self.runs {
      match run {
        ScreenRun::Text { text } => out.push_str(text),
        ScreenRun::Math { runs, .. } => runs.iter().for_each(|r| out.push_str(r.text())),
      }
    }
    out
  }
}

pub fn render_screen(blocks: &[Block], options: &RenderOptions) -> ScreenDocument {
  let mut nodes = Vec::with_capacity(blocks.len());
  let mut groups = 0usize;
  let mut current_group = None;

  for block in blocks {
    match block {
      Block::ListOpen => {
        current_group = Some(groups);
        groups += 1;
      }
      Block::ListClose => current_group = None,
      other => {
        let Some(kind) = other.kind() else { continue };
        nodes.push(ScreenNode {
          kind,
          list_group: if kind == NodeKind::ListItem { current_group } else { None },
          runs: other.content().iter().map(to_run).collect(),
        });
      }
    }
  }

  ScreenDocument {
    direction: options.direction,
    font_size: options.font_size,
    line_height: options.line_height,
    nodes,
  }
}

fn to_run(inline: &Inline) -> ScreenRun {
  match inline {
    Inline::Text { text } => ScreenRun::Text { text: text.clone() },
    Inline::Math { runs } => ScreenRun::Math { direction: Direction::Ltr, runs: runs.clone() },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::format::parse;

  #[test]
  fn list_items_carry_their_group() {
    let opts = RenderOptions::new(Direction::Rtl, 18.0, 1.6);
    let doc = render_screen(&parse("- a\n- b\n\n- c\npara"), &opts);
    let groups: Vec<_> = doc.nodes.iter().map(|n| (n.kind, n.list_group)).collect();
    assert_eq!(
      groups,
      vec![
        (NodeKind::ListItem, Some(0)),
        (NodeKind::ListItem, Some(0)),
        (NodeKind::Blank, None),
        (NodeKind::ListItem, Some(1)),
        (NodeKind::Paragraph, None),
      ]
    );
  }

  #[test]
  fn math_runs_are_ltr_in_rtl_document() {
    let opts = RenderOptions::new(Direction::Rtl, 18.0, 1.6);
    let doc = render_screen(&parse("صيغة الماء $H_2O$"), &opts);
    assert_eq!(doc.direction, Direction::Rtl);
    match &doc.nodes[0].runs[1] {
      ScreenRun::Math { direction, runs } => {
        assert_eq!(*direction, Direction::Ltr);
        assert_eq!(runs[1], MathRun::Subscript("2".into()));
      }
      other => panic!("expected math run, got {other:?}"),
    }
  }

  #[test]
  fn serializes_with_camel_case_tags() {
    let opts = RenderOptions::new(Direction::Ltr, 16.0, 1.5);
    let doc = render_screen(&parse("## T\n$x^2$"), &opts);
    let v = serde_json::to_value(&doc).unwrap();
    assert_eq!(v["direction"], "ltr");
    assert_eq!(v["fontSize"], 16.0);
    assert_eq!(v["nodes"][0]["kind"], "heading2");
    assert_eq!(v["nodes"][1]["runs"][0]["type"], "math");
    assert_eq!(v["nodes"][1]["runs"][0]["runs"][1]["type"], "superscript");
    assert_eq!(v["nodes"][1]["runs"][0]["runs"][1]["text"], "2");
  }
}
