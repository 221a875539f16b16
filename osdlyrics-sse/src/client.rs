//! Event-stream lyric client.
//!
//! Holds one long-lived GET open against the endpoint, turns every
//! `lyrics_update` into display work on the bridge, and reconnects after a
//! fixed delay whenever the connection ends. Only the cancellation token
//! stops it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use osdlyrics_core::{classify_and_parse, CoreError, DispatchBridge, LyricSource, ParsedLine};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{StreamSettings, PROVIDER_NAME};
use crate::error::{Result, StreamError};
use crate::event::{decode, LyricEvent, LyricsUpdate};
use crate::frame::FrameReassembler;

const LOG_TARGET: &str = "osdlyrics::sse";

/// Where the client is in its connection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Between attempts, waiting out the reconnect delay
    Disconnected,
    /// Request sent, waiting for response headers
    Connecting,
    /// Response open, reading records
    Streaming,
    /// Shut down for good
    Stopped,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-stream client implementing [`LyricSource`].
pub struct SseLyricClient {
    settings: StreamSettings,
    http: reqwest::Client,
    bridge: DispatchBridge,
    cancel_token: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
    attempts: AtomicU64,
}

impl SseLyricClient {
    /// Create a client. Nothing is sent until [`run`](LyricSource::run).
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Client`] if the HTTP client cannot be built.
    pub fn new(
        settings: StreamSettings,
        bridge: DispatchBridge,
        cancel_token: CancellationToken,
    ) -> Result<Self> {
        // Connect timeout only: a read timeout would cut the long-lived body
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(StreamError::Client)?;

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            settings,
            http,
            bridge,
            cancel_token,
            state_tx,
            attempts: AtomicU64::new(0),
        })
    }

    /// Run the client in a background task
    #[must_use]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!(target: LOG_TARGET, "Lyric stream stopped with error: {}", e);
            }
        })
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Receiver that observes every state transition
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Number of connection attempts made so far
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(target: LOG_TARGET, "Stream state {} -> {}", previous, state);
        }
    }

    /// One connection attempt, from request to end of body.
    ///
    /// Returns `Ok` on a clean close or when cancelled mid-stream.
    async fn stream_once(&self) -> Result<()> {
        let request = self
            .http
            .get(self.settings.endpoint.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        let response = tokio::select! {
            () = self.cancel_token.cancelled() => return Ok(()),
            response = request.send() => response.map_err(StreamError::Connect)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::HttpStatus {
                status: status.as_u16(),
            });
        }

        info!(target: LOG_TARGET, "Connected to lyric stream");
        self.set_state(ConnectionState::Streaming);

        let mut reassembler = FrameReassembler::new();
        let mut body = response.bytes_stream();

        let outcome = loop {
            let chunk = tokio::select! {
                () = self.cancel_token.cancelled() => break Ok(()),
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for payload in reassembler.feed(&bytes) {
                        self.handle_payload(&payload);
                    }
                }
                Some(Err(e)) => break Err(StreamError::Body(e)),
                None => break Ok(()),
            }
        };

        debug!(
            target: LOG_TARGET,
            "Session ended after {} bytes ({} pending)",
            reassembler.bytes_received(),
            reassembler.pending_len()
        );

        outcome
    }

    fn handle_payload(&self, payload: &str) {
        match decode(payload) {
            Ok(LyricEvent::LyricsUpdate(update)) => self.route(update),
            Ok(LyricEvent::Connected) => info!(target: LOG_TARGET, "Lyric stream acknowledged connection"),
            Ok(LyricEvent::Heartbeat) => debug!(target: LOG_TARGET, "Heartbeat"),
            Ok(event @ LyricEvent::Unknown(_)) => {
                debug!(target: LOG_TARGET, "Ignoring event of type {:?}", event.kind());
            }
            Err(e) => warn!(target: LOG_TARGET, "Dropping event: {}", e),
        }
    }

    fn route(&self, update: LyricsUpdate) {
        let parsed = classify_and_parse(&update.text, update.format);
        info!(
            target: LOG_TARGET,
            "Lyric update ({}, {:?}) song={:?} artist={:?}: {}",
            update.format,
            parsed.kind(),
            update.song,
            update.artist,
            update.text
        );

        let delivered = match parsed {
            ParsedLine::CharacterTimed(line) => self.bridge.submit_progressive(line),
            ParsedLine::LineTimed(text) | ParsedLine::PlainText(text) => {
                self.bridge.submit_plain(text)
            }
        };

        if !delivered {
            debug!(target: LOG_TARGET, "Display consumer gone, update dropped");
        }
    }
}

#[async_trait]
impl LyricSource for SseLyricClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    async fn run(&self) -> std::result::Result<(), CoreError> {
        info!(
            target: LOG_TARGET,
            "Starting lyric stream client for {}",
            self.settings.endpoint
        );

        while !self.cancel_token.is_cancelled() {
            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
            self.set_state(ConnectionState::Connecting);
            info!(
                target: LOG_TARGET,
                "Connecting to {} (attempt {})",
                self.settings.endpoint,
                attempt
            );

            match self.stream_once().await {
                Ok(()) if self.cancel_token.is_cancelled() => break,
                Ok(()) => info!(target: LOG_TARGET, "Lyric stream closed by server"),
                Err(e) => warn!(target: LOG_TARGET, "{}", e),
            }

            self.set_state(ConnectionState::Disconnected);
            info!(
                target: LOG_TARGET,
                "Reconnecting in {} ms",
                self.settings.reconnect_delay.as_millis()
            );

            tokio::select! {
                () = self.cancel_token.cancelled() => break,
                () = tokio::time::sleep(self.settings.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Stopped);
        info!(target: LOG_TARGET, "Lyric stream client stopped");
        Ok(())
    }
}
