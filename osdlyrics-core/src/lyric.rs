//! Classification and parsing of single lyric lines.
//!
//! Two timed formats arrive over the stream:
//!
//! - KRC, character-timed: `[171960,5040]<0,240,0>你<240,150,0>走`. The
//!   bracketed header is the line's absolute start and duration; each
//!   `<start,duration,flag>` group gives the start offset of the text that
//!   follows it, relative to the line.
//! - LRC, line-timed: `[02:51.96]你走之后我又 再为谁等候`.
//!
//! Anything else is shown verbatim. Parsing never fails: malformed timing
//! degrades to the last known offset.

use std::fmt;

/// Format declared by the sender of a lyric line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LyricFormat {
    /// Character-timed KRC
    Krc,
    /// Line-timed LRC, also assumed when the sender says nothing
    #[default]
    Lrc,
    /// Any other declared value
    Unspecified,
}

impl LyricFormat {
    /// Map the `format` field of a lyric event. Absent means LRC.
    #[must_use]
    pub fn from_declared(value: Option<&str>) -> Self {
        match value {
            None | Some("lrc") => Self::Lrc,
            Some("krc") => Self::Krc,
            Some(_) => Self::Unspecified,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Krc => "krc",
            Self::Lrc => "lrc",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for LyricFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural class of a raw lyric line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    CharacterTimed,
    LineTimed,
    PlainText,
}

/// Smallest timed unit of a character-timed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syllable {
    pub text: String,
    /// Start offset in milliseconds, relative to the start of the line
    pub start_ms: i64,
}

impl Syllable {
    pub fn new(text: impl Into<String>, start_ms: i64) -> Self {
        Self {
            text: text.into(),
            start_ms,
        }
    }
}

/// A parsed KRC line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KrcLine {
    /// Absolute start from the `[start,duration]` header, if present.
    /// Informational only; highlighting runs on time since receipt.
    pub line_start_ms: Option<i64>,
    /// Line duration from the header, if present
    pub line_duration_ms: Option<i64>,
    /// Syllables in display order
    pub syllables: Vec<Syllable>,
}

/// A lyric line ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    CharacterTimed(KrcLine),
    LineTimed(String),
    PlainText(String),
}

impl ParsedLine {
    #[must_use]
    pub const fn kind(&self) -> LineKind {
        match self {
            Self::CharacterTimed(_) => LineKind::CharacterTimed,
            Self::LineTimed(_) => LineKind::LineTimed,
            Self::PlainText(_) => LineKind::PlainText,
        }
    }
}

/// Decide how a raw line should be parsed.
///
/// A declared KRC format always wins. Otherwise the text is sniffed: KRC
/// markers (`[`, `,` and `]<`) mean character-timed, LRC markers (`[`, `:`
/// and `]`) mean line-timed.
#[must_use]
pub fn classify(raw: &str, declared: LyricFormat) -> LineKind {
    if declared == LyricFormat::Krc || looks_character_timed(raw) {
        LineKind::CharacterTimed
    } else if raw.contains('[') && raw.contains(':') && raw.contains(']') {
        LineKind::LineTimed
    } else {
        LineKind::PlainText
    }
}

/// Classify a raw line and parse it accordingly.
#[must_use]
pub fn classify_and_parse(raw: &str, declared: LyricFormat) -> ParsedLine {
    match classify(raw, declared) {
        LineKind::CharacterTimed => ParsedLine::CharacterTimed(KrcLine::parse(raw)),
        LineKind::LineTimed => ParsedLine::LineTimed(parse_lrc_text(raw)),
        LineKind::PlainText => ParsedLine::PlainText(raw.to_string()),
    }
}

fn looks_character_timed(raw: &str) -> bool {
    raw.contains('[') && raw.contains(',') && raw.contains("]<")
}

impl KrcLine {
    /// Parse a KRC line into syllables.
    ///
    /// Text before the first timing group starts at offset 0. A group whose
    /// first token is missing or not a number keeps the previous offset. An
    /// unterminated `<` or `[` swallows the rest of the line.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut line = Self::default();
        let mut rest = raw;

        // Line header [start,duration]
        if let Some(after_open) = rest.strip_prefix('[') {
            if let Some(end) = after_open.find(']') {
                let mut fields = after_open[..end].split(',');
                line.line_start_ms = fields.next().and_then(parse_millis);
                line.line_duration_ms = fields.next().and_then(parse_millis);
                rest = &after_open[end + 1..];
            } else {
                rest = "";
            }
        }

        let mut offset_ms = 0_i64;
        let mut text = String::new();
        let mut text_start_ms = offset_ms;

        while !rest.is_empty() {
            if let Some(group) = rest.strip_prefix('<') {
                push_syllable(&mut line.syllables, &mut text, text_start_ms);

                if let Some(end) = group.find('>') {
                    if let Some(start) = parse_group_start(&group[..end]) {
                        offset_ms = start;
                    }
                    rest = &group[end + 1..];
                } else {
                    rest = "";
                }
                text_start_ms = offset_ms;
            } else {
                // '<' is ASCII, so this split never lands inside a code point
                let next = rest.find('<').unwrap_or(rest.len());
                text.push_str(&rest[..next]);
                rest = &rest[next..];
            }
        }
        push_syllable(&mut line.syllables, &mut text, text_start_ms);

        line
    }

    /// Concatenated syllable text
    #[must_use]
    pub fn text(&self) -> String {
        self.syllables.iter().map(|s| s.text.as_str()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.syllables.is_empty()
    }
}

fn push_syllable(syllables: &mut Vec<Syllable>, text: &mut String, start_ms: i64) {
    if !text.is_empty() {
        syllables.push(Syllable::new(std::mem::take(text), start_ms));
    }
}

/// First comma-delimited token of `start,duration,flag`. A group without a
/// comma carries no usable start.
fn parse_group_start(group: &str) -> Option<i64> {
    let (start, _) = group.split_once(',')?;
    parse_millis(start)
}

fn parse_millis(token: &str) -> Option<i64> {
    token.trim().parse().ok()
}

/// Extract the display text of an LRC line.
///
/// Everything up to and including the first `]` is dropped, along with
/// spaces and tabs after it. The text ends at the first line break. A line
/// without `]` is returned unchanged.
#[must_use]
pub fn parse_lrc_text(raw: &str) -> String {
    let Some(end) = raw.find(']') else {
        return raw.to_string();
    };

    let text = raw[end + 1..].trim_start_matches([' ', '\t']);
    let text = text.split(['\r', '\n']).next().unwrap_or_default();
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syllables(raw: &str) -> Vec<(String, i64)> {
        KrcLine::parse(raw)
            .syllables
            .into_iter()
            .map(|s| (s.text, s.start_ms))
            .collect()
    }

    #[test]
    fn test_classify_krc_by_structure() {
        let raw = "[171960,5040]<0,240,0>你<240,150,0>走";
        let parsed = classify_and_parse(raw, LyricFormat::Lrc);
        let ParsedLine::CharacterTimed(line) = parsed else {
            panic!("expected character-timed line, got {parsed:?}");
        };
        assert_eq!(
            line.syllables,
            vec![Syllable::new("你", 0), Syllable::new("走", 240)]
        );
        assert_eq!(line.line_start_ms, Some(171_960));
        assert_eq!(line.line_duration_ms, Some(5040));
    }

    #[test]
    fn test_classify_lrc() {
        let parsed = classify_and_parse("[02:51.96]你走之后我又 再为谁等候", LyricFormat::Lrc);
        assert_eq!(
            parsed,
            ParsedLine::LineTimed("你走之后我又 再为谁等候".to_string())
        );
    }

    #[test]
    fn test_classify_plain() {
        let parsed = classify_and_parse("hello world", LyricFormat::Lrc);
        assert_eq!(parsed, ParsedLine::PlainText("hello world".to_string()));
        assert_eq!(parsed.kind(), LineKind::PlainText);
    }

    #[test]
    fn test_declared_krc_wins_without_markers() {
        let parsed = classify_and_parse("just words", LyricFormat::Krc);
        let ParsedLine::CharacterTimed(line) = parsed else {
            panic!("declared krc must be character-timed");
        };
        // No timing at all: the whole line is one syllable at offset 0
        assert_eq!(line.syllables, vec![Syllable::new("just words", 0)]);
    }

    #[test]
    fn test_unspecified_format_is_sniffed() {
        assert_eq!(
            classify("[0,10]<0,5,0>a", LyricFormat::Unspecified),
            LineKind::CharacterTimed
        );
        assert_eq!(
            classify("[00:01.00]a", LyricFormat::Unspecified),
            LineKind::LineTimed
        );
        assert_eq!(classify("a", LyricFormat::Unspecified), LineKind::PlainText);
    }

    #[test]
    fn test_format_from_declared() {
        assert_eq!(LyricFormat::from_declared(None), LyricFormat::Lrc);
        assert_eq!(LyricFormat::from_declared(Some("lrc")), LyricFormat::Lrc);
        assert_eq!(LyricFormat::from_declared(Some("krc")), LyricFormat::Krc);
        assert_eq!(
            LyricFormat::from_declared(Some("txt")),
            LyricFormat::Unspecified
        );
    }

    #[test]
    fn test_krc_multi_character_syllables() {
        let raw = "[0,3000]<0,500,0>Hello <500,400,0>wor<900,300,0>ld";
        assert_eq!(
            syllables(raw),
            vec![
                ("Hello ".to_string(), 0),
                ("wor".to_string(), 500),
                ("ld".to_string(), 900),
            ]
        );
    }

    #[test]
    fn test_krc_round_trip_text() {
        let raw = "[1000,2000]<0,100,0>我<100,100,0>们 <200,100,0>🎵<300,100,0>é&<400,100,0>x";
        let line = KrcLine::parse(raw);
        assert_eq!(line.text(), "我们 🎵é&x");
    }

    #[test]
    fn test_krc_malformed_group_keeps_previous_offset() {
        let raw = "[0,1000]<100,50,0>a<oops,50,0>b<300>c<400,1,0>d";
        assert_eq!(
            syllables(raw),
            vec![
                ("a".to_string(), 100),
                ("b".to_string(), 100),
                ("c".to_string(), 100),
                ("d".to_string(), 400),
            ]
        );
    }

    #[test]
    fn test_krc_text_before_first_group_starts_at_zero() {
        let raw = "[0,1000]intro<500,10,0>x";
        assert_eq!(
            syllables(raw),
            vec![("intro".to_string(), 0), ("x".to_string(), 500)]
        );
    }

    #[test]
    fn test_krc_unterminated_group_swallows_rest() {
        let raw = "[0,1000]<0,10,0>a<20,10";
        assert_eq!(syllables(raw), vec![("a".to_string(), 0)]);
    }

    #[test]
    fn test_krc_unterminated_header() {
        let line = KrcLine::parse("[0,1000<0,10,0>a");
        assert!(line.is_empty());
        assert_eq!(line.line_start_ms, None);
    }

    #[test]
    fn test_krc_consecutive_groups_skip_empty_text() {
        let raw = "[0,1000]<0,10,0><50,10,0>a";
        assert_eq!(syllables(raw), vec![("a".to_string(), 50)]);
    }

    #[test]
    fn test_krc_without_header() {
        let raw = "<0,10,0>a<10,10,0>b";
        let line = KrcLine::parse(raw);
        assert_eq!(line.line_start_ms, None);
        assert_eq!(line.text(), "ab");
    }

    #[test]
    fn test_lrc_strips_whitespace_and_line_breaks() {
        assert_eq!(parse_lrc_text("[00:12.34] \tHello world\r\n"), "Hello world");
    }

    #[test]
    fn test_lrc_without_bracket_is_verbatim() {
        assert_eq!(parse_lrc_text("no timestamp: here"), "no timestamp: here");
    }

    #[test]
    fn test_lrc_only_first_bracket_is_removed() {
        assert_eq!(parse_lrc_text("[00:05.00][00:15.00]Repeated"), "[00:15.00]Repeated");
    }
}
