//! Test doubles for the display side.

use crate::markup::strip_markup;
use crate::sink::{SinkText, TextSink};

/// Sink that records every update it receives.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    pub updates: Vec<SinkText>,
    /// Number of progressive lines announced
    pub lines_started: usize,
    /// Flip to `false` to simulate a torn-down surface
    pub live: bool,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            updates: Vec::new(),
            lines_started: 0,
            live: true,
        }
    }
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last(&self) -> Option<&SinkText> {
        self.updates.last()
    }

    /// Visible text of the last update, with markup removed
    #[must_use]
    pub fn last_visible(&self) -> Option<String> {
        match self.last()? {
            SinkText::Plain(text) => Some(text.clone()),
            SinkText::Styled(markup) => strip_markup(markup),
        }
    }
}

impl TextSink for RecordingSink {
    fn set_plain_text(&mut self, text: &str) {
        self.updates.push(SinkText::Plain(text.to_string()));
    }

    fn set_styled_text(&mut self, markup: &str) {
        self.updates.push(SinkText::Styled(markup.to_string()));
    }

    fn begin_line(&mut self) {
        self.lines_started += 1;
    }

    fn is_live(&self) -> bool {
        self.live
    }
}
