//! Reassembly of `data:` records from arbitrarily split body chunks.
//!
//! Network reads do not line up with record boundaries, so bytes are
//! buffered until a `\n` arrives. Only complete lines starting with the
//! `data: ` prefix are emitted; the incomplete tail stays buffered for the
//! next feed. One reassembler lives for exactly one connection attempt.

/// Prefix of lines carrying an event payload
pub const DATA_PREFIX: &str = "data: ";

/// Line buffer for one connection.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buffer: Vec<u8>,
    bytes_received: u64,
}

impl FrameReassembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and iterate over the payloads it completes.
    ///
    /// Payloads are yielded lazily. Whatever the iterator has not consumed
    /// when it is dropped is discarded, except the trailing incomplete line,
    /// which is always kept for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.buffer.extend_from_slice(chunk);
        self.bytes_received = self
            .bytes_received
            .saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        Frames {
            reassembler: self,
            consumed: 0,
        }
    }

    /// Total bytes fed into this reassembler
    #[must_use]
    pub const fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Bytes buffered waiting for a line terminator
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Payloads of complete `data: ` lines, see [`FrameReassembler::feed`].
#[derive(Debug)]
pub struct Frames<'a> {
    reassembler: &'a mut FrameReassembler,
    consumed: usize,
}

impl Iterator for Frames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let rest = &self.reassembler.buffer[self.consumed..];
            let newline = rest.iter().position(|b| *b == b'\n')?;
            let line = &rest[..newline];
            self.consumed += newline + 1;

            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if let Some(payload) = line.strip_prefix(DATA_PREFIX.as_bytes()) {
                return Some(String::from_utf8_lossy(payload).into_owned());
            }
        }
    }
}

impl Drop for Frames<'_> {
    fn drop(&mut self) {
        // Skip over every complete line, emitted or not
        let rest = &self.reassembler.buffer[self.consumed..];
        let complete = rest
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(self.consumed, |last| self.consumed + last + 1);
        self.reassembler.buffer.drain(..complete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(reassembler: &mut FrameReassembler, chunk: &str) -> Vec<String> {
        reassembler.feed(chunk.as_bytes()).collect()
    }

    #[test]
    fn test_split_frame_reassembles() {
        let mut split = FrameReassembler::new();
        assert!(feed_all(&mut split, "data: {\"type\":\"heart").is_empty());
        let frames = feed_all(&mut split, "beat\"}\n");

        let mut whole = FrameReassembler::new();
        let expected = feed_all(&mut whole, "data: {\"type\":\"heartbeat\"}\n");

        assert_eq!(frames, vec!["{\"type\":\"heartbeat\"}".to_string()]);
        assert_eq!(frames, expected);
        assert_eq!(split.pending_len(), 0);
    }

    #[test]
    fn test_empty_feed_yields_nothing() {
        let mut reassembler = FrameReassembler::new();
        assert_eq!(reassembler.feed(b"").count(), 0);
        assert_eq!(reassembler.bytes_received(), 0);
    }

    #[test]
    fn test_non_data_lines_are_discarded() {
        let mut reassembler = FrameReassembler::new();
        let frames = feed_all(
            &mut reassembler,
            ": comment\nevent: lyrics\ndata: one\r\n\ndata:two\ndata: three\n",
        );
        assert_eq!(frames, vec!["one".to_string(), "three".to_string()]);
    }

    #[test]
    fn test_tail_kept_across_feeds() {
        let mut reassembler = FrameReassembler::new();
        assert_eq!(feed_all(&mut reassembler, "data: a\ndata: b"), vec!["a"]);
        assert_eq!(reassembler.pending_len(), "data: b".len());
        assert_eq!(feed_all(&mut reassembler, "\n"), vec!["b"]);
        assert_eq!(reassembler.bytes_received(), 16);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let line = "data: 你走\n".as_bytes();
        let mut reassembler = FrameReassembler::new();
        // Split inside the first code point
        assert_eq!(reassembler.feed(&line[..7]).count(), 0);
        let frames: Vec<String> = reassembler.feed(&line[7..]).collect();
        assert_eq!(frames, vec!["你走".to_string()]);
    }

    #[test]
    fn test_partially_consumed_iterator_drops_rest() {
        let mut reassembler = FrameReassembler::new();
        let first = reassembler.feed(b"data: 1\ndata: 2\ndata: 3").next();
        assert_eq!(first.as_deref(), Some("1"));
        assert_eq!(reassembler.pending_len(), "data: 3".len());
    }
}
