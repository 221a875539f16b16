//! Decoding of event payloads.

use osdlyrics_core::LyricFormat;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::DecodeError;

/// Wire shape of an event payload. Every field is optional so that unknown
/// or partial events still decode, and non-string values are read as their
/// JSON text.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    format: Option<String>,
    #[serde(rename = "songName", default, deserialize_with = "lenient_string")]
    song_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    artist: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// A lyric line pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsUpdate {
    /// Raw lyric line, timing markup included
    pub text: String,
    pub format: LyricFormat,
    pub song: Option<String>,
    pub artist: Option<String>,
}

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricEvent {
    LyricsUpdate(LyricsUpdate),
    Connected,
    Heartbeat,
    /// Any other `type`, kept for logging only
    Unknown(String),
}

impl LyricEvent {
    /// The `type` value this event was decoded from
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::LyricsUpdate(_) => "lyrics_update",
            Self::Connected => "connected",
            Self::Heartbeat => "heartbeat",
            Self::Unknown(kind) => kind,
        }
    }
}

/// Decode one `data:` payload (prefix already removed).
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] if the payload is not a JSON object
/// of the expected shape.
pub fn decode(payload: &str) -> Result<LyricEvent, DecodeError> {
    let value: Value = serde_json::from_str(payload)?;
    if !value.is_object() {
        return Err(serde_json::Error::custom("expected a JSON object").into());
    }
    let raw = RawEvent::deserialize(value)?;

    let event = match raw.kind.as_deref() {
        Some("lyrics_update") => LyricEvent::LyricsUpdate(LyricsUpdate {
            text: raw.text.unwrap_or_default(),
            format: LyricFormat::from_declared(raw.format.as_deref()),
            song: raw.song_name,
            artist: raw.artist,
        }),
        Some("connected") => LyricEvent::Connected,
        Some("heartbeat") => LyricEvent::Heartbeat,
        Some(other) => LyricEvent::Unknown(other.to_string()),
        None => LyricEvent::Unknown(String::new()),
    };

    Ok(event)
}
