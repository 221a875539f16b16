pub mod bridge;
pub mod color;
pub mod config;
pub mod consumer;
pub mod error;
pub mod lyric;
pub mod markup;
pub mod paths;
pub mod progress;
pub mod sink;
pub mod source;
pub mod time;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::{bridge, Dispatch, DispatchBridge, DispatchReceiver};
pub use color::{DisplayColor, UNPLAYED_HEX};
pub use config::{
    validate_endpoint, DisplayConfig, LoggingConfig, OsdLyricsConfig, StreamConfig,
    DEFAULT_SSE_URL,
};
pub use consumer::DisplayConsumer;
pub use error::{CoreError, Result};
pub use lyric::{
    classify, classify_and_parse, parse_lrc_text, KrcLine, LineKind, LyricFormat, ParsedLine,
    Syllable,
};
pub use markup::{escape_text, parse_markup, strip_markup, to_markup, HighlightSpan, MarkupSpan};
pub use paths::{config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use progress::{spans_at, ProgressEngine, DEFAULT_TICK_INTERVAL};
pub use sink::{CurrentTextSink, SinkText, TextSink};
pub use source::LyricSource;
pub use time::DurationExt;
