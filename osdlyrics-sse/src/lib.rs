pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;

pub use client::{ConnectionState, SseLyricClient};
pub use config::{StreamSettings, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_DELAY, PROVIDER_NAME};
pub use error::{DecodeError, StreamError};
pub use event::{decode, LyricEvent, LyricsUpdate};
pub use frame::{FrameReassembler, Frames, DATA_PREFIX};
