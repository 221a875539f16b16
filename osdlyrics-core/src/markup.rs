//! Styled-text markup.
//!
//! Styled output is a flat run of `<span foreground="#rrggbb">…</span>`
//! elements with `<`, `>` and `&` escaped inside the text. The reader half
//! lets a display surface turn markup back into colored runs, and reports
//! `None` for anything it cannot read so callers can fall back to plain text.

use std::borrow::Cow;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::color::{parse_hex_rgb, DisplayColor, UNPLAYED_HEX};

/// A run of consecutive syllables sharing the same played status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub text: String,
    pub played: bool,
}

/// A colored run read back from markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSpan {
    /// Foreground as bytes, `None` for default text color
    pub color: Option<(u8, u8, u8)>,
    pub text: String,
}

/// Escape the characters that would otherwise be read as markup.
#[must_use]
pub fn escape_text(text: &str) -> Cow<'_, str> {
    partial_escape(text)
}

/// Build markup for highlight spans: played runs in `played_color`, the rest
/// in neutral gray.
#[must_use]
pub fn to_markup(spans: &[HighlightSpan], played_color: DisplayColor) -> String {
    let played_hex = played_color.to_hex();
    let mut markup = String::new();

    for span in spans {
        let hex = if span.played {
            played_hex.as_str()
        } else {
            UNPLAYED_HEX
        };
        markup.push_str("<span foreground=\"");
        markup.push_str(hex);
        markup.push_str("\">");
        markup.push_str(&escape_text(&span.text));
        markup.push_str("</span>");
    }

    markup
}

/// Read markup back into colored runs.
///
/// Only `span` elements (optionally with a `foreground` attribute), comments
/// and CDATA are understood. Returns `None` for unknown tags, unbalanced
/// spans, bad colors, stray `<` or unknown entities.
#[must_use]
pub fn parse_markup(markup: &str) -> Option<Vec<MarkupSpan>> {
    let mut reader = Reader::from_str(markup);
    let mut spans: Vec<MarkupSpan> = Vec::new();
    let mut stack: Vec<Option<(u8, u8, u8)>> = Vec::new();

    loop {
        match reader.read_event().ok()? {
            Event::Eof => break,
            Event::Start(e) => stack.push(span_color(&e)?),
            // An empty span carries no text
            Event::Empty(e) => {
                span_color(&e)?;
            }
            Event::End(e) => {
                if e.name().as_ref() != b"span" {
                    return None;
                }
                stack.pop()?;
            }
            Event::Text(e) => {
                let text = e.unescape().ok()?;
                push_text(&mut spans, stack.last().copied().flatten(), &text);
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(&e).ok()?;
                push_text(&mut spans, stack.last().copied().flatten(), text);
            }
            Event::Comment(_) => {}
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => return None,
        }
    }

    stack.is_empty().then_some(spans)
}

/// Visible text of markup, or `None` when the markup is unreadable.
#[must_use]
pub fn strip_markup(markup: &str) -> Option<String> {
    parse_markup(markup).map(|spans| spans.into_iter().map(|s| s.text).collect())
}

/// Foreground of a `span` start tag; `None` for any other tag or a bad color.
fn span_color(tag: &BytesStart<'_>) -> Option<Option<(u8, u8, u8)>> {
    if tag.name().as_ref() != b"span" {
        return None;
    }

    let mut color = None;
    for attr in tag.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == b"foreground" {
            let value = attr.unescape_value().ok()?;
            color = Some(parse_hex_rgb(&value)?);
        }
    }
    Some(color)
}

fn push_text(spans: &mut Vec<MarkupSpan>, color: Option<(u8, u8, u8)>, text: &str) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.color == color => last.text.push_str(text),
        _ => spans.push(MarkupSpan {
            color,
            text: text.to_string(),
        }),
    }
}
