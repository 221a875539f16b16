//! Config file watching for live highlight color changes.
//!
//! Only `[display.text_color]` is applied while running. Everything else in
//! the file takes effect on the next start. Changes are detected against the
//! color last read from the file, so a `--color` override survives edits to
//! unrelated settings.

use notify_debouncer_mini::notify::{self, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use osdlyrics_core::{DispatchBridge, DisplayColor, OsdLyricsConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc as tokio_mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "osdlyrics::config_watcher";

/// Errors that can occur while setting up the watcher
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to initialize file watcher: {0}")]
    WatcherError(#[from] notify::Error),
}

/// Re-read the config and return its color if it differs from `last_read`.
///
/// An unreadable or invalid file is logged and ignored; the running color
/// stays in place.
pub fn reload_color(path: &Path, last_read: DisplayColor) -> Option<DisplayColor> {
    match OsdLyricsConfig::load_from(path) {
        Ok(config) => {
            let color = config.display.text_color;
            (color != last_read).then_some(color)
        }
        Err(e) => {
            warn!(target: LOG_TARGET, "Ignoring config change: {}", e);
            None
        }
    }
}

/// Watch `path` until cancelled, submitting color changes to the bridge.
///
/// `file_color` is the color the file held at startup.
///
/// # Errors
///
/// Returns an error if the file watcher cannot be created.
pub async fn watch_config_color(
    path: PathBuf,
    file_color: DisplayColor,
    bridge: DispatchBridge,
    cancel_token: CancellationToken,
) -> Result<(), WatchError> {
    let (tx, mut rx) = tokio_mpsc::channel::<()>(16);

    // Debounce to handle rapid saves
    let watched_file = path.clone();
    let mut debouncer = new_debouncer(
        Duration::from_millis(300),
        move |res: DebounceEventResult| {
            if let Ok(events) = res {
                if events.iter().any(|event| event.path == watched_file) {
                    // Sync callback on the watcher thread
                    let _ = tx.blocking_send(());
                }
            }
        },
    )?;

    // Watch the parent directory: editors often replace the file on save
    let watch_path = path
        .parent()
        .map_or_else(|| path.clone(), Path::to_path_buf);
    debouncer
        .watcher()
        .watch(&watch_path, RecursiveMode::NonRecursive)?;

    info!(target: LOG_TARGET, "Watching config file for color changes: {:?}", path);

    let mut last_read = file_color;
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                debug!(target: LOG_TARGET, "Config watcher shutting down");
                break;
            }
            Some(()) = rx.recv() => {
                if let Some(color) = reload_color(&path, last_read) {
                    info!(target: LOG_TARGET, "Highlight color changed to {}", color.to_hex());
                    last_read = color;
                    bridge.submit_color(color);
                }
            }
        }
    }

    // Keep debouncer alive until we exit the loop
    drop(debouncer);
    Ok(())
}
