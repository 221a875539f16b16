use crate::color::DisplayColor;
use crate::error::{CoreError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Endpoint used when no URL is configured
pub const DEFAULT_SSE_URL: &str = "http://127.0.0.1:18911/api/osd-lyrics/sse";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsdLyricsConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Event-stream endpoint. Empty means [`DEFAULT_SSE_URL`].
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_reconnect_delay_ms() -> u64 {
    3000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl StreamConfig {
    /// The configured URL, or the built-in default when empty
    #[must_use]
    pub fn endpoint(&self) -> &str {
        let url = self.url.trim();
        if url.is_empty() {
            DEFAULT_SSE_URL
        } else {
            url
        }
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub text_color: DisplayColor,
}

const fn default_tick_interval_ms() -> u64 {
    100
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            text_color: DisplayColor::default(),
        }
    }
}

impl DisplayConfig {
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file under the user cache directory
    #[serde(default)]
    pub enabled: bool,
}

impl OsdLyricsConfig {
    /// Get the config directory path
    #[must_use]
    pub fn config_dir() -> PathBuf {
        paths::config_dir()
    }

    /// Get the config file path
    #[must_use]
    pub fn config_path() -> PathBuf {
        paths::config_path()
    }

    /// Load config from `path`, creating a template there if missing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or a
    /// read, parse or validation error.
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        Self::load_from(path)
    }

    /// Load config from an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validated()
    }

    /// Check the config and normalize what can be normalized.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] for a bad endpoint or a zero
    /// interval.
    pub fn validated(mut self) -> Result<Self> {
        validate_endpoint(self.stream.endpoint())?;

        if self.stream.connect_timeout_secs == 0 {
            return Err(invalid("stream.connect_timeout_secs must be greater than 0"));
        }
        if self.stream.reconnect_delay_ms == 0 {
            return Err(invalid("stream.reconnect_delay_ms must be greater than 0"));
        }
        if self.display.tick_interval_ms == 0 {
            return Err(invalid("display.tick_interval_ms must be greater than 0"));
        }

        self.display.text_color = self.display.text_color.clamped();
        Ok(self)
    }
}

/// Check that `endpoint` is an absolute `http` or `https` URL.
///
/// # Errors
///
/// Returns [`CoreError::ConfigInvalid`] describing the problem.
pub fn validate_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| invalid(&format!("stream.url {endpoint:?} is not a valid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(&format!(
            "stream.url must use http or https, got {other:?}"
        ))),
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::ConfigInvalid {
        message: message.to_string(),
    }
}

const CONFIG_TEMPLATE: &str = r#"# OSD Lyrics Configuration
# ~/.config/osd-lyrics/config.toml

[stream]
# Event-stream endpoint serving lyric updates.
# Leave empty for the default: http://127.0.0.1:18911/api/osd-lyrics/sse
url = ""
connect_timeout_secs = 10
# Wait between reconnect attempts
reconnect_delay_ms = 3000

[display]
# How often a character-timed line is re-rendered
tick_interval_ms = 100

[display.text_color]
# Highlight color for sung syllables, each channel 0.0 - 1.0.
# Changes are picked up while running.
red = 1.0
green = 0.0
blue = 0.0

[logging]
# Also write logs to a file in the cache directory
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = OsdLyricsConfig::from_toml_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, OsdLyricsConfig::default());
        assert_eq!(config.stream.endpoint(), DEFAULT_SSE_URL);
        assert_eq!(config.stream.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.stream.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.display.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = OsdLyricsConfig::from_toml_str("").unwrap();
        assert_eq!(config, OsdLyricsConfig::default());
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_custom_values() {
        let config = OsdLyricsConfig::from_toml_str(
            r#"
[stream]
url = "https://lyrics.example.com/sse"

[display.text_color]
red = 0.0
green = 2.0
blue = -1.0
"#,
        )
        .unwrap();

        assert_eq!(config.stream.endpoint(), "https://lyrics.example.com/sse");
        // Channels are clamped
        assert_eq!(config.display.text_color, DisplayColor::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        for url in ["not a url", "ftp://example.com/sse", "/relative/path"] {
            let toml = format!("[stream]\nurl = \"{url}\"\n");
            let err = OsdLyricsConfig::from_toml_str(&toml).unwrap_err();
            assert!(matches!(err, CoreError::ConfigInvalid { .. }), "{url}: {err}");
        }
    }

    #[test]
    fn test_rejects_zero_intervals() {
        for toml in [
            "[stream]\nreconnect_delay_ms = 0\n",
            "[stream]\nconnect_timeout_secs = 0\n",
            "[display]\ntick_interval_ms = 0\n",
        ] {
            assert!(matches!(
                OsdLyricsConfig::from_toml_str(toml),
                Err(CoreError::ConfigInvalid { .. })
            ));
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            OsdLyricsConfig::from_toml_str("[stream\nurl ="),
            Err(CoreError::ConfigParseError(_))
        ));
    }

    #[test]
    fn test_load_or_create_writes_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("osd-lyrics").join("config.toml");

        let err = OsdLyricsConfig::load_or_create_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
        assert!(path.exists());

        let config = OsdLyricsConfig::load_or_create_at(&path).unwrap();
        assert_eq!(config, OsdLyricsConfig::default());
    }
}
