mod config_watcher;
mod terminal_sink;

use crate::config_watcher::watch_config_color;
use crate::terminal_sink::TerminalSink;
use clap::Parser;
use osdlyrics_core::{
    bridge, CoreError, DisplayColor, DisplayConsumer, LyricSource, OsdLyricsConfig,
};
use osdlyrics_sse::{ConnectionState, SseLyricClient, StreamSettings};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_TARGET: &str = "osdlyrics::app";

/// On-screen karaoke lyrics fed by a live event stream.
#[derive(Debug, Parser)]
#[command(name = "osd-lyrics", version, about)]
struct Args {
    /// Event-stream endpoint serving lyric updates
    #[arg(long = "sse-url", value_name = "URL")]
    sse_url: Option<String>,

    /// Highlight color for sung syllables
    #[arg(long, value_name = "#RRGGBB", value_parser = parse_color)]
    color: Option<DisplayColor>,

    /// Config file to use instead of ~/.config/osd-lyrics/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn parse_color(value: &str) -> Result<DisplayColor, String> {
    DisplayColor::from_hex(value).ok_or_else(|| format!("expected #RRGGBB, got {value:?}"))
}

fn main() {
    let args = Args::parse();
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(OsdLyricsConfig::config_path);

    // Initialize logging with optional file output
    // Check config for logging.enabled before full config load
    init_tracing(check_file_logging_enabled(&config_path));

    let (config, file_color) = match load_with_overrides(&config_path, &args) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(target: LOG_TARGET, "{e}");
            std::process::exit(1);
        }
    };

    let settings = match StreamSettings::from_config(&config.stream) {
        Ok(settings) => settings,
        Err(e) => {
            error!(target: LOG_TARGET, "{e}");
            std::process::exit(1);
        }
    };

    // Create tokio runtime for background tasks
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(target: LOG_TARGET, "Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!(target: LOG_TARGET, "Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!(target: LOG_TARGET, "Failed to set Ctrl+C handler: {}", e);
    }

    let (bridge, mut receiver) = bridge();

    let client = match SseLyricClient::new(settings, bridge.clone(), cancel_token.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(target: LOG_TARGET, "{e}");
            std::process::exit(1);
        }
    };

    info!(
        target: LOG_TARGET,
        "Starting {} lyric source, highlight color {}",
        client.name(),
        config.display.text_color.to_hex()
    );

    // Spawn background tasks
    runtime.spawn(log_connection_states(client.subscribe_state()));
    let source_handle = {
        let _guard = runtime.enter();
        Arc::clone(&client).start()
    };

    let watch_path = std::fs::canonicalize(&config_path).unwrap_or(config_path);
    let watcher_bridge = bridge.clone();
    let watcher_token = cancel_token.clone();
    runtime.spawn(async move {
        if let Err(e) =
            watch_config_color(watch_path, file_color, watcher_bridge, watcher_token).await
        {
            warn!(target: LOG_TARGET, "Color hot-reload disabled: {}", e);
        }
    });
    drop(bridge);

    // The display is only ever touched from this thread
    let mut consumer = DisplayConsumer::new(
        TerminalSink::stdout(),
        config.display.text_color,
        config.display.tick_interval(),
    );

    runtime.block_on(async {
        consumer.run(&mut receiver, cancel_token.clone()).await;
        // No-op after Ctrl+C; stops the source if the consumer left on its own
        cancel_token.cancel();
        if let Err(e) = source_handle.await {
            error!(target: LOG_TARGET, "Lyric source task failed: {}", e);
        }
    });

    consumer.sink_mut().finish();
    info!(target: LOG_TARGET, "Shutdown complete");
}

/// Load the config file, falling back to defaults when there is none yet.
fn load_config(path: &Path) -> Result<OsdLyricsConfig, CoreError> {
    match OsdLyricsConfig::load_or_create_at(path) {
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                target: LOG_TARGET,
                "Created config template at {}, running with defaults",
                path.display()
            );
            Ok(OsdLyricsConfig::default())
        }
        Err(CoreError::IoError(e)) => {
            warn!(
                target: LOG_TARGET,
                "Could not read or create config at {}: {}, running with defaults",
                path.display(),
                e
            );
            Ok(OsdLyricsConfig::default())
        }
        other => other,
    }
}

/// Load the config and apply command-line overrides, also returning the
/// color the file itself holds.
fn load_with_overrides(
    path: &Path,
    args: &Args,
) -> Result<(OsdLyricsConfig, DisplayColor), CoreError> {
    let file_config = load_config(path)?;
    let file_color = file_config.display.text_color;
    Ok((apply_overrides(file_config, args)?, file_color))
}

/// Apply command-line overrides on top of the file config.
fn apply_overrides(mut config: OsdLyricsConfig, args: &Args) -> Result<OsdLyricsConfig, CoreError> {
    if let Some(url) = &args.sse_url {
        config.stream.url.clone_from(url);
    }
    if let Some(color) = args.color {
        config.display.text_color = color;
    }
    config.validated()
}

async fn log_connection_states(mut states: watch::Receiver<ConnectionState>) {
    while states.changed().await.is_ok() {
        let state = *states.borrow_and_update();
        info!(target: LOG_TARGET, "Lyric stream {}", state);
        if state == ConnectionState::Stopped {
            break;
        }
    }
}

fn check_file_logging_enabled(config_path: &Path) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }

    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so they don't interleave with the lyric rows on stdout
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = osdlyrics_core::log_file_path();

        // Create cache directory if needed
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
