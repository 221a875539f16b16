//! Terminal display surface.
//!
//! Plain text gets a row of its own. Styled text is redrawn in place with
//! 24-bit colors for as long as the same line is shown; a new line starts a
//! new row. Control characters from the stream are never written out.

use std::borrow::Cow;
use std::io::{self, Stdout, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use osdlyrics_core::{parse_markup, TextSink};
use tracing::warn;

const LOG_TARGET: &str = "osdlyrics::terminal";

pub struct TerminalSink<W: Write> {
    out: W,
    /// Visible text of the row currently being redrawn
    in_place: Option<String>,
    live: bool,
}

impl TerminalSink<Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSink<W> {
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self {
            out,
            in_place: None,
            live: true,
        }
    }

    /// End any row still being redrawn.
    pub fn finish(&mut self) {
        if let Err(e) = self.end_in_place().and_then(|()| self.out.flush()) {
            warn!(target: LOG_TARGET, "Terminal write failed: {}", e);
        }
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }

    fn end_in_place(&mut self) -> io::Result<()> {
        if self.in_place.take().is_some() {
            queue!(self.out, Print("\r\n"))?;
        }
        Ok(())
    }

    fn write_plain(&mut self, text: &str) -> io::Result<()> {
        self.end_in_place()?;
        queue!(self.out, Print(printable(text)), Print("\r\n"))?;
        self.out.flush()
    }

    fn write_styled(&mut self, markup: &str) -> io::Result<()> {
        let Some(spans) = parse_markup(markup) else {
            // Unreadable markup is still shown, just without colors
            return self.write_plain(markup);
        };

        let visible: String = spans.iter().map(|s| s.text.as_str()).collect();
        if self.in_place.as_deref() == Some(visible.as_str()) {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        } else {
            self.end_in_place()?;
        }

        for span in &spans {
            match span.color {
                Some((r, g, b)) => queue!(self.out, SetForegroundColor(Color::Rgb { r, g, b }))?,
                None => queue!(self.out, ResetColor)?,
            }
            queue!(self.out, Print(printable(&span.text)))?;
        }
        queue!(self.out, ResetColor)?;
        self.out.flush()?;

        self.in_place = Some(visible);
        Ok(())
    }

    fn mark_dead(&mut self, error: &io::Error) {
        warn!(target: LOG_TARGET, "Terminal write failed, display disabled: {}", error);
        self.live = false;
    }
}

/// Drop control characters so stream text cannot move the cursor or inject
/// escape sequences. Tabs become spaces.
fn printable(text: &str) -> Cow<'_, str> {
    if !text.contains(char::is_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .filter_map(|c| match c {
                '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect(),
    )
}

impl<W: Write> TextSink for TerminalSink<W> {
    fn set_plain_text(&mut self, text: &str) {
        if let Err(e) = self.write_plain(text) {
            self.mark_dead(&e);
        }
    }

    fn set_styled_text(&mut self, markup: &str) {
        if let Err(e) = self.write_styled(markup) {
            self.mark_dead(&e);
        }
    }

    fn begin_line(&mut self) {
        if let Err(e) = self.end_in_place() {
            self.mark_dead(&e);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}
