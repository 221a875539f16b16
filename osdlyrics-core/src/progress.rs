//! Progressive highlighting of a character-timed line.
//!
//! The engine owns the single active line. Starting a line renders it once
//! right away and then every tick interval; each render compares the time
//! since the line arrived against syllable offsets. Time since receipt is the
//! only clock, there is no media position.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::color::DisplayColor;
use crate::lyric::{KrcLine, Syllable};
use crate::markup::{to_markup, HighlightSpan};
use crate::sink::TextSink;
use crate::time::elapsed_millis;

const LOG_TARGET: &str = "osdlyrics::progress";

/// Re-render cadence for an active line
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Whether a syllable counts as sung at `elapsed_ms`.
///
/// Nothing is sung at the instant the line arrives, so the immediate first
/// render is entirely unplayed.
#[must_use]
pub const fn is_played(syllable: &Syllable, elapsed_ms: i64) -> bool {
    elapsed_ms > 0 && syllable.start_ms <= elapsed_ms
}

/// Split a line into runs of equal played status.
#[must_use]
pub fn spans_at(line: &KrcLine, elapsed_ms: i64) -> Vec<HighlightSpan> {
    let mut spans: Vec<HighlightSpan> = Vec::new();

    for syllable in &line.syllables {
        let played = is_played(syllable, elapsed_ms);
        match spans.last_mut() {
            Some(last) if last.played == played => last.text.push_str(&syllable.text),
            _ => spans.push(HighlightSpan {
                text: syllable.text.clone(),
                played,
            }),
        }
    }

    spans
}

/// Styled markup for a line at `elapsed_ms`.
#[must_use]
pub fn render_markup(line: &KrcLine, elapsed_ms: i64, color: DisplayColor) -> String {
    to_markup(&spans_at(line, elapsed_ms), color)
}

/// Handle to the recurring render schedule. Dropping it cancels the ticks.
#[derive(Debug)]
pub struct TickSchedule {
    interval: Interval,
}

impl TickSchedule {
    /// First tick fires one period from now.
    fn start(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[derive(Debug)]
struct ActiveLine {
    line: KrcLine,
    started_at: Instant,
}

/// Owner of the playback state for character-timed lines.
///
/// Lives on the foreground consumer and is never touched from the stream
/// task.
#[derive(Debug)]
pub struct ProgressEngine {
    active: Option<ActiveLine>,
    schedule: Option<TickSchedule>,
    tick_interval: Duration,
}

impl Default for ProgressEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl ProgressEngine {
    /// Create an idle engine. A zero interval is bumped to one millisecond.
    #[must_use]
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            active: None,
            schedule: None,
            tick_interval: tick_interval.max(Duration::from_millis(1)),
        }
    }

    /// Replace the active line, render it immediately, and schedule ticks.
    pub fn start(&mut self, line: KrcLine, color: DisplayColor, sink: &mut dyn TextSink) {
        self.cancel_schedule();

        debug!(
            target: LOG_TARGET,
            "Starting progressive line ({} syllables): {}",
            line.syllables.len(),
            line.text()
        );

        let started_at = Instant::now();
        sink.set_styled_text(&render_markup(&line, 0, color));
        self.active = Some(ActiveLine { line, started_at });
        self.schedule = Some(TickSchedule::start(self.tick_interval));
    }

    /// Re-render the active line at the current time.
    ///
    /// With no active line this cancels the schedule and returns `false`.
    pub fn tick(&mut self, color: DisplayColor, sink: &mut dyn TextSink) -> bool {
        let Some(active) = &self.active else {
            self.cancel_schedule();
            return false;
        };

        let elapsed = elapsed_millis(active.started_at, Instant::now());
        sink.set_styled_text(&render_markup(&active.line, elapsed, color));
        true
    }

    /// Drop the active line and cancel the schedule. Safe to repeat.
    pub fn clear(&mut self) {
        if self.active.take().is_some() {
            debug!(target: LOG_TARGET, "Cleared progressive line");
        }
        self.cancel_schedule();
    }

    /// Wait for the next scheduled tick. Never resolves while idle.
    pub async fn ticked(&mut self) {
        match self.schedule.as_mut() {
            Some(schedule) => schedule.tick().await,
            None => std::future::pending().await,
        }
    }

    /// Markup for the active line at an arbitrary elapsed time
    #[must_use]
    pub fn render_at(&self, elapsed_ms: i64, color: DisplayColor) -> Option<String> {
        self.active
            .as_ref()
            .map(|active| render_markup(&active.line, elapsed_ms, color))
    }

    /// Milliseconds since the active line started
    #[must_use]
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.active
            .as_ref()
            .map(|active| elapsed_millis(active.started_at, Instant::now()))
    }

    #[must_use]
    pub fn active_line(&self) -> Option<&KrcLine> {
        self.active.as_ref().map(|active| &active.line)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub const fn is_ticking(&self) -> bool {
        self.schedule.is_some()
    }

    fn cancel_schedule(&mut self) {
        self.schedule = None;
    }
}
