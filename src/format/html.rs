//! Rich-text export target.
//!
//! Every style is inlined so the fragment survives a trip through the system
//! clipboard into an unrelated editor. Colors are forced to black on white.

use super::{Block, Direction, Inline, MathRun, RenderOptions};

const FONT_FAMILY: &str = "'Simplified Arabic', 'Traditional Arabic', serif";

pub fn render_html(blocks: &[Block], options: &RenderOptions) -> String {
  let dir = options.direction;
  let mut html = format!(
    "<div dir=\"{d}\" style=\"font-family: {FONT_FAMILY}; text-align: {side}; direction: {d}; font-size: {fs}px; line-height: {lh}; color: #000000; background-color: #ffffff;\">",
    d = dir.as_str(),
    side = dir.start_side(),
    fs = options.font_size,
    lh = options.line_height,
  );

  for block in blocks {
    match block {
      Block::Heading { level: 2, content } => {
        html.push_str("<h2 style=\"color: #000000; margin-top: 24px; margin-bottom: 8px; font-size: 1.5em; font-weight: bold;\">");
        push_inlines(&mut html, content);
        html.push_str("</h2>");
      }
      Block::Heading { content, .. } => {
        html.push_str("<h3 style=\"color: #000000; margin-top: 18px; margin-bottom: 6px; font-size: 1.3em; font-weight: bold;\">");
        push_inlines(&mut html, content);
        html.push_str("</h3>");
      }
      Block::ListOpen => html.push_str(&format!(
        "<ul style=\"margin-{}: 25px; margin-bottom: 12px; list-style-type: disc; color: #000000;\">",
        dir.start_side()
      )),
      Block::ListItem(content) => {
        html.push_str("<li style=\"margin-bottom: 6px;\">");
        push_inlines(&mut html, content);
        html.push_str("</li>");
      }
      Block::ListClose => html.push_str("</ul>"),
      Block::Paragraph(content) => {
        html.push_str("<p style=\"margin-bottom: 12px; text-align: justify; color: #000000;\">");
        push_inlines(&mut html, content);
        html.push_str("</p>");
      }
      Block::Blank => html.push_str("<div style=\"height: 12px;\"></div>"),
    }
  }

  html.push_str("</div>");
  html
}

/// Standalone page for the browser's print / save-as-PDF flow: a centred title,
/// the document body, and a small footer note.
pub fn render_printable_page(blocks: &[Block], options: &RenderOptions, title: &str, footer: &str) -> String {
  let dir = options.direction.as_str();
  let lang = match options.direction {
    Direction::Rtl => "ar",
    Direction::Ltr => "en",
  };
  format!(
    "<!DOCTYPE html>\n<html lang=\"{lang}\" dir=\"{dir}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{t}</title>\n\
<style>@page {{ size: A4; margin: 18mm; }} body {{ margin: 0; background: #ffffff; }}</style>\n</head>\n<body>\n\
<div style=\"max-width: 210mm; margin: 0 auto; font-family: {FONT_FAMILY}; color: #000000;\">\n\
<div style=\"border-bottom: 2px solid #000000; padding-bottom: 16px; margin-bottom: 24px; text-align: center;\">\
<h1 style=\"font-size: 1.875rem; font-weight: 900; color: #000000; margin: 0 0 4px 0;\">{t}</h1></div>\n\
{body}\n\
<div style=\"margin-top: 48px; padding-top: 16px; border-top: 1px solid #000000; font-size: 10px; color: #000000; text-align: center; font-style: italic;\">{f}</div>\n\
</div>\n</body>\n</html>\n",
    t = escape_html(title),
    body = render_html(blocks, options),
    f = escape_html(footer),
  )
}

fn push_inlines(html: &mut String, inlines: &[Inline]) {
  for inline in inlines {
    match inline {
      Inline::Text { text } => html.push_str(&escape_html(text)),
      Inline::Math { runs } => {
        html.push_str("<span dir=\"ltr\" style=\"display: inline-block; direction: ltr; unicode-bidi: isolate; font-family: serif;\">");
        for run in runs {
          match run {
            MathRun::Literal(s) => html.push_str(&escape_html(s)),
            MathRun::Subscript(s) => {
              html.push_str("<sub>");
              html.push_str(&escape_html(s));
              html.push_str("</sub>");
            }
            MathRun::Superscript(s) => {
              html.push_str("<sup>");
              html.push_str(&escape_html(s));
              html.push_str("</sup>");
            }
          }
        }
        html.push_str("</span>");
      }
    }
  }
}

fn escape_html(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}
