//! Hand-off of display work from the stream task to the foreground context.
//!
//! Submissions never block and never fail loudly: once the consumer is gone
//! they are dropped. Order is preserved.

use tokio::sync::mpsc;
use tracing::trace;

use crate::color::DisplayColor;
use crate::lyric::KrcLine;

const LOG_TARGET: &str = "osdlyrics::bridge";

/// A unit of display work.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Start progressive highlighting of a character-timed line
    Progressive(KrcLine),
    /// Show text verbatim, stopping any progressive line
    Plain(String),
    /// Show pre-built markup, stopping any progressive line
    Styled(String),
    /// Change the highlight color
    SetColor(DisplayColor),
}

/// Producer half. Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct DispatchBridge {
    tx: mpsc::UnboundedSender<Dispatch>,
}

/// Consumer half, owned by the foreground context.
#[derive(Debug)]
pub struct DispatchReceiver {
    rx: mpsc::UnboundedReceiver<Dispatch>,
}

/// Create a connected bridge pair.
#[must_use]
pub fn bridge() -> (DispatchBridge, DispatchReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DispatchBridge { tx }, DispatchReceiver { rx })
}

impl DispatchBridge {
    /// Queue work for the foreground. Returns `false` if the receiver is gone.
    pub fn submit(&self, dispatch: Dispatch) -> bool {
        match self.tx.send(dispatch) {
            Ok(()) => true,
            Err(mpsc::error::SendError(dropped)) => {
                trace!(target: LOG_TARGET, "Receiver closed, dropping {:?}", dropped);
                false
            }
        }
    }

    pub fn submit_progressive(&self, line: KrcLine) -> bool {
        self.submit(Dispatch::Progressive(line))
    }

    pub fn submit_plain(&self, text: impl Into<String>) -> bool {
        self.submit(Dispatch::Plain(text.into()))
    }

    pub fn submit_styled(&self, markup: impl Into<String>) -> bool {
        self.submit(Dispatch::Styled(markup.into()))
    }

    pub fn submit_color(&self, color: DisplayColor) -> bool {
        self.submit(Dispatch::SetColor(color))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl DispatchReceiver {
    /// Next dispatch in submission order, `None` once every bridge is dropped.
    pub async fn recv(&mut self) -> Option<Dispatch> {
        self.rx.recv().await
    }

    /// Next dispatch if one is already queued.
    pub fn try_recv(&mut self) -> Option<Dispatch> {
        self.rx.try_recv().ok()
    }
}
