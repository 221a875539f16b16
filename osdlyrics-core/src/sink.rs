//! The display surface contract.

/// Where lyric text ends up.
///
/// Implementations belong to the foreground context: they are only ever
/// called from the thread that owns the display. Background producers go
/// through [`DispatchBridge`](crate::DispatchBridge).
pub trait TextSink {
    /// Show text verbatim.
    fn set_plain_text(&mut self, text: &str);

    /// Show styled markup (see [`crate::markup`]).
    fn set_styled_text(&mut self, markup: &str);

    /// A new progressive line starts; the styled updates that follow belong
    /// to it even when its text equals the previous line's.
    fn begin_line(&mut self) {}

    /// Whether the surface can still accept updates. A surface that has been
    /// torn down returns `false` and bridged deliveries are dropped.
    fn is_live(&self) -> bool {
        true
    }
}

impl<T: TextSink + ?Sized> TextSink for Box<T> {
    fn set_plain_text(&mut self, text: &str) {
        (**self).set_plain_text(text);
    }

    fn set_styled_text(&mut self, markup: &str) {
        (**self).set_styled_text(markup);
    }

    fn begin_line(&mut self) {
        (**self).begin_line();
    }

    fn is_live(&self) -> bool {
        (**self).is_live()
    }
}

/// What a sink was last asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkText {
    Plain(String),
    Styled(String),
}

impl SinkText {
    /// Raw payload: the text, or the markup for styled updates
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Styled(text) => text,
        }
    }

    #[must_use]
    pub const fn is_styled(&self) -> bool {
        matches!(self, Self::Styled(_))
    }
}

/// Sink adapter that remembers the last update it forwarded.
#[derive(Debug)]
pub struct CurrentTextSink<S> {
    inner: S,
    current: Option<SinkText>,
}

impl<S: TextSink> CurrentTextSink<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            current: None,
        }
    }

    #[must_use]
    pub const fn current(&self) -> Option<&SinkText> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: TextSink> TextSink for CurrentTextSink<S> {
    fn set_plain_text(&mut self, text: &str) {
        self.current = Some(SinkText::Plain(text.to_string()));
        self.inner.set_plain_text(text);
    }

    fn set_styled_text(&mut self, markup: &str) {
        self.current = Some(SinkText::Styled(markup.to_string()));
        self.inner.set_styled_text(markup);
    }

    fn begin_line(&mut self) {
        self.inner.begin_line();
    }

    fn is_live(&self) -> bool {
        self.inner.is_live()
    }
}
