//! Server-Sent Events (SSE) frame parser for provider streaming responses.
//!
//! This module provides a robust SSE parser that handles:
//! - Frames split across TCP chunks
//! - Multiple frames in one read
//! - Comment lines and `[DONE]` sentinels
//!
//! Unlike a provider-specific parser, it emits raw frames: Gemini encodes the
//! event kind inside the JSON payload, while the Anthropic API names it on the
//! `event:` line, so both pieces must survive parsing. Provider modules map
//! frames to typed stream events.

/// A parsed SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A data-carrying frame. `event` is the optional `event:` line name,
    /// `data` is the joined payload of all `data:` lines.
    Message {
        event: Option<String>,
        data: String,
    },
    /// End-of-stream sentinel (`data: [DONE]`).
    Done,
}

/// Stateful SSE parser that buffers incomplete frames across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feeds a chunk of data to the parser and returns all complete frames.
    ///
    /// This method handles:
    /// - Partial frames (buffered for next chunk)
    /// - Multiple frames in one chunk
    /// - Empty lines between events
    pub fn feed(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        // SSE events are separated by double newlines
        while let Some(event_end) = self.find_event_boundary() {
            let event_text = self.buffer[..event_end].to_string();
            self.buffer = self.buffer[event_end..]
                .trim_start_matches('\n')
                .to_string();

            if let Some(frame) = Self::parse_frame(&event_text) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Finds the end of a complete SSE event (double newline boundary).
    fn find_event_boundary(&self) -> Option<usize> {
        if let Some(pos) = self.buffer.find("\n\n") {
            return Some(pos + 2);
        }
        // Also handle \r\n\r\n for Windows-style line endings
        if let Some(pos) = self.buffer.find("\r\n\r\n") {
            return Some(pos + 4);
        }
        None
    }

    /// Parses a single SSE event block into a frame.
    fn parse_frame(event_text: &str) -> Option<SseFrame> {
        let mut event_name: Option<String> = None;
        let mut data_lines: Vec<&str> = Vec::new();

        for line in event_text.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(name) = line.strip_prefix("event:") {
                let name = name.trim();
                if !name.is_empty() {
                    event_name = Some(name.to_string());
                }
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data);
                }
            }
        }

        if data_lines.is_empty() {
            return None;
        }

        // Join all data lines (SSE spec allows multi-line data)
        let data = data_lines.join("\n");

        if data == "[DONE]" {
            return Some(SseFrame::Done);
        }

        Some(SseFrame::Message {
            event: event_name,
            data,
        })
    }

    /// Returns any remaining buffered data (for debugging/testing).
    #[must_use]
    pub fn remaining_buffer(&self) -> &str {
        &self.buffer
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(event: Option<&str>, data: &str) -> SseFrame {
        SseFrame::Message {
            event: event.map(str::to_string),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_parse_plain_data_frame() {
        let mut parser = SseParser::new();
        let chunk = "data: {\"candidates\":[]}\n\n";

        let frames = parser.feed(chunk);

        assert_eq!(frames, vec![message(None, "{\"candidates\":[]}")]);
    }

    #[test]
    fn test_parse_named_event_frame() {
        let mut parser = SseParser::new();
        let chunk = "event: content_block_delta\ndata: {\"delta\":{}}\n\n";

        let frames = parser.feed(chunk);

        assert_eq!(
            frames,
            vec![message(Some("content_block_delta"), "{\"delta\":{}}")]
        );
    }

    #[test]
    fn test_parse_done_signal() {
        let mut parser = SseParser::new();
        let frames = parser.feed("data: [DONE]\n\n");

        assert_eq!(frames, vec![SseFrame::Done]);
    }

    #[test]
    fn test_multiple_frames_in_single_chunk() {
        let mut parser = SseParser::new();
        let chunk = concat!(
            "data: {\"a\":1}\n\n",
            "event: ping\ndata: {}\n\n",
            "data: [DONE]\n\n"
        );

        let frames = parser.feed(chunk);

        assert_eq!(
            frames,
            vec![
                message(None, "{\"a\":1}"),
                message(Some("ping"), "{}"),
                SseFrame::Done,
            ]
        );
    }

    #[test]
    fn test_frames_split_across_chunks() {
        let mut parser = SseParser::new();

        let frames1 = parser.feed("data: {\"text\":");
        assert!(frames1.is_empty(), "Should not emit until complete");

        let frames2 = parser.feed("\"Hello\"}\n\n");
        assert_eq!(frames2, vec![message(None, "{\"text\":\"Hello\"}")]);
    }

    #[test]
    fn test_frame_split_at_boundary() {
        let mut parser = SseParser::new();

        let frames1 = parser.feed("data: {\"text\":\"Test\"}\n");
        assert!(frames1.is_empty(), "Should wait for double newline boundary");

        let frames2 = parser.feed("\n");
        assert_eq!(frames2, vec![message(None, "{\"text\":\"Test\"}")]);
    }

    #[test]
    fn test_event_line_split_from_data_line() {
        let mut parser = SseParser::new();

        assert!(parser.feed("event: message_stop\n").is_empty());
        let frames = parser.feed("data: {\"type\":\"message_stop\"}\n\n");

        assert_eq!(
            frames,
            vec![message(Some("message_stop"), "{\"type\":\"message_stop\"}")]
        );
    }

    #[test]
    fn test_ignores_comments() {
        let mut parser = SseParser::new();
        let frames = parser.feed(": keepalive\ndata: {\"x\":1}\n\n");

        assert_eq!(frames, vec![message(None, "{\"x\":1}")]);
    }

    #[test]
    fn test_event_only_frame_is_dropped() {
        let mut parser = SseParser::new();
        // An event name with no data payload carries nothing actionable.
        let frames = parser.feed("event: ping\n\n");

        assert!(frames.is_empty());
    }

    #[test]
    fn test_handles_empty_chunks() {
        let mut parser = SseParser::new();

        assert!(parser.feed("").is_empty());
        assert!(parser.feed("\n\n").is_empty());
    }

    #[test]
    fn test_handles_windows_line_endings() {
        let mut parser = SseParser::new();
        let frames = parser.feed("data: {\"text\":\"Win\"}\r\n\r\n");

        assert_eq!(frames, vec![message(None, "{\"text\":\"Win\"}")]);
    }

    #[test]
    fn test_unicode_in_data() {
        let mut parser = SseParser::new();
        let frames = parser.feed("data: {\"text\":\"Hello 世界 🌍\"}\n\n");

        assert_eq!(frames, vec![message(None, "{\"text\":\"Hello 世界 🌍\"}")]);
    }

    #[test]
    fn test_multi_line_data_is_joined() {
        let mut parser = SseParser::new();
        let frames = parser.feed("data: line1\ndata: line2\n\n");

        assert_eq!(frames, vec![message(None, "line1\nline2")]);
    }

    #[test]
    fn test_remaining_buffer() {
        let mut parser = SseParser::new();

        parser.feed("data: {\"partial");

        assert!(!parser.remaining_buffer().is_empty());
        assert!(parser.remaining_buffer().contains("partial"));
    }

    #[test]
    fn test_clear_buffer() {
        let mut parser = SseParser::new();

        parser.feed("data: {\"partial");
        assert!(!parser.remaining_buffer().is_empty());

        parser.clear();
        assert!(parser.remaining_buffer().is_empty());
    }

    #[test]
    fn test_fragmented_frame_across_many_chunks() {
        let mut parser = SseParser::new();

        let full_event = "event: content_block_delta\ndata: {\"text\":\"Complete message here!\"}\n\n";

        let mut emitted: Vec<SseFrame> = Vec::new();
        for chunk in full_event.as_bytes().chunks(5) {
            let chunk_str = std::str::from_utf8(chunk).unwrap();
            emitted.extend(parser.feed(chunk_str));
        }

        assert_eq!(
            emitted,
            vec![message(
                Some("content_block_delta"),
                "{\"text\":\"Complete message here!\"}"
            )]
        );
        assert!(parser.remaining_buffer().is_empty());
    }
}
