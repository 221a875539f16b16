//! Lyric source trait.

use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A background producer of lyric lines.
///
/// Sources run off the foreground context and hand every line to a
/// [`DispatchBridge`](crate::DispatchBridge). Implementations should:
///
/// - Keep producing until the cancellation token fires
/// - Recover from transient failures on their own
/// - Never touch the display surface directly
#[async_trait]
pub trait LyricSource: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Run until cancelled or an unrecoverable error occurs.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be set up at all.
    async fn run(&self) -> Result<()>;

    /// Token used to signal graceful shutdown.
    fn cancel_token(&self) -> CancellationToken;

    /// Signal the source to stop. Safe to call more than once.
    fn stop(&self) {
        self.cancel_token().cancel();
    }
}
