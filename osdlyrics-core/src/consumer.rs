//! Foreground side of the bridge: applies dispatches to the display surface
//! and drives the progress engine.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bridge::{Dispatch, DispatchReceiver};
use crate::color::DisplayColor;
use crate::progress::ProgressEngine;
use crate::sink::{CurrentTextSink, SinkText, TextSink};

const LOG_TARGET: &str = "osdlyrics::consumer";

enum Step {
    Dispatch(Dispatch),
    Tick,
    Closed,
    Cancelled,
}

/// Owns the display surface, the highlight color and the progress engine.
#[derive(Debug)]
pub struct DisplayConsumer<S: TextSink> {
    sink: CurrentTextSink<S>,
    engine: ProgressEngine,
    color: DisplayColor,
}

impl<S: TextSink> DisplayConsumer<S> {
    #[must_use]
    pub fn new(sink: S, color: DisplayColor, tick_interval: Duration) -> Self {
        Self {
            sink: CurrentTextSink::new(sink),
            engine: ProgressEngine::new(tick_interval),
            color: color.clamped(),
        }
    }

    /// Apply one dispatch. Deliveries to a surface that is no longer live are
    /// dropped.
    pub fn apply(&mut self, dispatch: Dispatch) {
        if !self.sink.is_live() {
            debug!(target: LOG_TARGET, "Display surface gone, dropping {:?}", dispatch);
            self.engine.clear();
            return;
        }

        match dispatch {
            Dispatch::Progressive(line) => {
                self.sink.begin_line();
                self.engine.start(line, self.color, &mut self.sink);
            }
            Dispatch::Plain(text) => {
                self.engine.clear();
                self.sink.set_plain_text(&text);
            }
            Dispatch::Styled(markup) => {
                self.engine.clear();
                self.sink.set_styled_text(&markup);
            }
            Dispatch::SetColor(color) => self.set_color(color),
        }
    }

    /// Re-render the active line, if any.
    pub fn tick(&mut self) -> bool {
        if !self.sink.is_live() {
            self.engine.clear();
            return false;
        }
        self.engine.tick(self.color, &mut self.sink)
    }

    /// Process dispatches and ticks until cancelled or every bridge is
    /// dropped. The engine is cleared on the way out.
    pub async fn run(&mut self, receiver: &mut DispatchReceiver, cancel: CancellationToken) {
        info!(target: LOG_TARGET, "Display consumer started");

        loop {
            let step = tokio::select! {
                () = cancel.cancelled() => Step::Cancelled,
                dispatch = receiver.recv() => dispatch.map_or(Step::Closed, Step::Dispatch),
                () = self.engine.ticked() => Step::Tick,
            };

            match step {
                Step::Dispatch(dispatch) => self.apply(dispatch),
                Step::Tick => {
                    self.tick();
                }
                Step::Closed => {
                    debug!(target: LOG_TARGET, "All producers gone");
                    break;
                }
                Step::Cancelled => break,
            }
        }

        self.engine.clear();
        info!(target: LOG_TARGET, "Display consumer stopped");
    }

    /// Change the highlight color. An active line picks it up on its next
    /// render.
    pub fn set_color(&mut self, color: DisplayColor) {
        let color = color.clamped();
        if color != self.color {
            debug!(target: LOG_TARGET, "Highlight color set to {}", color.to_hex());
        }
        self.color = color;
    }

    #[must_use]
    pub const fn color(&self) -> DisplayColor {
        self.color
    }

    /// What the surface is currently showing
    #[must_use]
    pub const fn current_text(&self) -> Option<&SinkText> {
        self.sink.current()
    }

    #[must_use]
    pub const fn engine(&self) -> &ProgressEngine {
        &self.engine
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        self.sink.inner()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.sink.inner_mut()
    }
}
