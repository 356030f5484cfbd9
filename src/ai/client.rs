//! Provider-dispatching LLM chat client.
//!
//! Encapsulates all chat API interactions for generating assistant replies,
//! one-shot or streaming.

use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::pin::Pin;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use super::sse::{SseFrame, SseParser};
use super::{ChatMessage, ParseResult, StreamEvent, claude, gemini};
use crate::core::config::{AppConfig, Provider};
use crate::errors::JarvisError;

const MAX_CONTEXT_TOKENS: usize = 128_000;
pub const MAX_OUTPUT_TOKENS: usize = 4096;
const TOKEN_BUFFER: usize = 250;
const MIN_OUTPUT_TOKENS: usize = 256;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const MAX_RETRIES: usize = 3;

/// Bookkeeping SSE event types the providers are known to emit.
const EXPECTED_IGNORED_EVENT_TYPES: &[&str] = &[
    "gemini.metadata",
    "ping",
    "message_start",
    "message_delta",
    "content_block_start",
    "content_block_stop",
    "content_block_delta.non_text",
    "anthropic.unnamed",
];

/// Rough chars/4 token estimate, used only for the context-budget guard.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

fn map_frame(provider: Provider, frame: &SseFrame) -> Vec<ParseResult> {
    match provider {
        Provider::Gemini => gemini::map_frame(frame),
        Provider::Claude => claude::map_frame(frame),
    }
}

/// Chat client for the configured provider.
pub struct LlmClient {
    http: Client,
    provider: Provider,
    api_key: String,
    model: String,
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns an error when the selected provider has no API key or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, JarvisError> {
        let provider = config.provider();
        let api_key = match provider {
            Provider::Gemini => config.google_api_key.clone(),
            Provider::Claude => config.anthropic_api_key.clone(),
        }
        .ok_or_else(|| {
            JarvisError::ConfigError(format!(
                "{} selected but its API key is not set",
                provider.label()
            ))
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| JarvisError::HttpError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            provider,
            api_key,
            model: config.model().to_string(),
        })
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Output-token budget left after the estimated input, or `None` when the
    /// prompt no longer fits.
    fn output_budget(&self, messages: &[ChatMessage], cap: usize) -> Option<usize> {
        let estimated_input_tokens: usize =
            messages.iter().map(|m| estimate_tokens(&m.content)).sum();

        debug!(
            "Estimated input tokens: {} (provider {})",
            estimated_input_tokens,
            self.provider.label()
        );

        let available = MAX_CONTEXT_TOKENS
            .saturating_sub(estimated_input_tokens)
            .saturating_sub(TOKEN_BUFFER)
            .min(cap);

        (available >= MIN_OUTPUT_TOKENS).then_some(available)
    }

    fn request_headers(&self) -> Result<reqwest::header::HeaderMap, JarvisError> {
        match self.provider {
            Provider::Gemini => gemini::headers(&self.api_key),
            Provider::Claude => claude::headers(&self.api_key),
        }
    }

    fn chat_request(
        &self,
        messages: &[ChatMessage],
        max_output_tokens: usize,
        stream: bool,
    ) -> (String, Value) {
        match self.provider {
            Provider::Gemini => (
                gemini::endpoint(&self.model, stream),
                gemini::request_body(messages, max_output_tokens),
            ),
            Provider::Claude => (
                claude::MESSAGES_URL.to_string(),
                claude::request_body(messages, &self.model, max_output_tokens, stream),
            ),
        }
    }

    fn extract_text(&self, response_json: &Value) -> Option<String> {
        match self.provider {
            Provider::Gemini => gemini::extract_text(response_json),
            Provider::Claude => claude::extract_text(response_json),
        }
    }

    async fn request_once(&self, url: &str, body: &Value) -> Result<Value, JarvisError> {
        let headers = self.request_headers()?;

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                JarvisError::HttpError(format!(
                    "{} API request failed: {e}",
                    self.provider.label()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(JarvisError::ProviderError(format!(
                "{} API error (status {status}): {error_text}",
                self.provider.label()
            )));
        }

        response.json().await.map_err(|e| {
            JarvisError::ParseError(format!(
                "Failed to parse {} response: {e}",
                self.provider.label()
            ))
        })
    }

    /// Generates a complete response in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails after retries or the
    /// response cannot be parsed into text.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String, JarvisError> {
        self.generate_with_limit(messages, MAX_OUTPUT_TOKENS).await
    }

    /// Like [`generate`](Self::generate) with a caller-supplied output cap
    /// (routing decisions only need a couple hundred tokens).
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate).
    pub async fn generate_with_limit(
        &self,
        messages: &[ChatMessage],
        cap: usize,
    ) -> Result<String, JarvisError> {
        #[cfg(feature = "debug-logs")]
        info!("Prompt:\n{:?}", messages);

        #[cfg(not(feature = "debug-logs"))]
        info!("Generating response with {} messages in prompt", messages.len());

        let Some(max_output_tokens) = self.output_budget(messages, cap) else {
            return Ok(StreamingResponse::too_large_message().to_string());
        };

        let (url, body) = self.chat_request(messages, max_output_tokens, false);

        // Transport failures are retried; API-level errors are not.
        let strategy = ExponentialBackoff::from_millis(10)
            .map(jitter)
            .take(MAX_RETRIES);
        let response_json = RetryIf::spawn(
            strategy,
            || self.request_once(&url, &body),
            |e: &JarvisError| matches!(e, JarvisError::HttpError(_)),
        )
        .await?;

        self.extract_text(&response_json).ok_or_else(|| {
            JarvisError::ParseError(format!("No text in {} response", self.provider.label()))
        })
    }

    /// Generates a response using streaming, yielding text deltas as they
    /// arrive.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails.
    ///
    /// If the prompt is too large to fit within the model context window,
    /// returns `Ok(StreamingResponse::TooLarge)` so callers can display a
    /// friendly message.
    pub async fn generate_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<StreamingResponse, JarvisError> {
        #[cfg(feature = "debug-logs")]
        info!("Streaming prompt:\n{:?}", messages);

        #[cfg(not(feature = "debug-logs"))]
        info!(
            "Generating streaming response with {} messages in prompt",
            messages.len()
        );

        let Some(max_output_tokens) = self.output_budget(messages, MAX_OUTPUT_TOKENS) else {
            return Ok(StreamingResponse::TooLarge);
        };

        let (url, body) = self.chat_request(messages, max_output_tokens, true);
        let headers = self.request_headers()?;

        let response = self
            .http
            .post(&url)
            .headers(headers)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                JarvisError::HttpError(format!(
                    "{} streaming request failed: {e}",
                    self.provider.label()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(JarvisError::ProviderError(format!(
                "{} streaming API error (status {status}): {error_text}",
                self.provider.label()
            )));
        }

        Ok(StreamingResponse::Active(ActiveStreamingResponse {
            byte_stream: Box::pin(response.bytes_stream()),
            parser: SseParser::new(),
            provider: self.provider,
            pending_results: VecDeque::new(),
            utf8_buffer: Vec::new(),
            unexpected_event_types: HashSet::new(),
            saw_completed_event: false,
            saw_any_text: false,
            completed: false,
        }))
    }
}

/// Response from `generate_stream`.
#[derive(Debug)]
pub enum StreamingResponse {
    /// The input was too large to process.
    TooLarge,
    /// Active streaming response.
    Active(ActiveStreamingResponse),
}

impl StreamingResponse {
    /// Returns `true` if the input was too large to process.
    #[must_use]
    pub const fn is_too_large(&self) -> bool {
        matches!(self, Self::TooLarge)
    }

    /// Returns the too-large message for display to users.
    #[must_use]
    pub fn too_large_message() -> &'static str {
        "The conversation has grown too long to answer in full, Sir. Use /clear to reset the session window and try again."
    }
}

/// Type alias for the boxed byte stream.
type ByteStream = Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

/// An active streaming response from the provider.
pub struct ActiveStreamingResponse {
    byte_stream: ByteStream,
    parser: SseParser,
    provider: Provider,
    pending_results: VecDeque<ParseResult>,
    utf8_buffer: Vec<u8>,
    unexpected_event_types: HashSet<String>,
    saw_completed_event: bool,
    saw_any_text: bool,
    completed: bool,
}

impl std::fmt::Debug for ActiveStreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveStreamingResponse")
            .field("provider", &self.provider)
            .field("completed", &self.completed)
            .field("saw_completed_event", &self.saw_completed_event)
            .field("saw_any_text", &self.saw_any_text)
            .field("pending_results_len", &self.pending_results.len())
            .field("utf8_buffer_len", &self.utf8_buffer.len())
            .field("parser_buffer_len", &self.parser.remaining_buffer().len())
            .finish_non_exhaustive()
    }
}

impl ActiveStreamingResponse {
    fn drain_pending_results(&mut self) -> Result<Option<StreamEvent>, JarvisError> {
        while let Some(result) = self.pending_results.pop_front() {
            match result {
                ParseResult::Event(event) => match event {
                    StreamEvent::Completed => {
                        self.saw_completed_event = true;
                        self.completed = true;
                        return Ok(Some(StreamEvent::Completed));
                    }
                    StreamEvent::Failed(_) | StreamEvent::Error(_) => {
                        self.completed = true;
                        return Ok(Some(event));
                    }
                    StreamEvent::TextDelta(ref delta) => {
                        if !delta.is_empty() {
                            self.saw_any_text = true;
                        }
                        return Ok(Some(event));
                    }
                },
                ParseResult::Done => {
                    self.completed = true;
                    if self.saw_completed_event {
                        return Ok(None);
                    }
                    if self.saw_any_text {
                        // A [DONE] sentinel without a terminal event still
                        // delivered usable text; treat as completion.
                        warn!("Stream ended with [DONE] before a terminal event; treating as completed");
                        self.saw_completed_event = true;
                        return Ok(Some(StreamEvent::Completed));
                    }
                    warn!("Stream ended with [DONE] before a terminal event");
                    return Err(JarvisError::ProviderError(
                        "Stream ended before completion".to_string(),
                    ));
                }
                ParseResult::UnknownEvent(event_type) => {
                    if EXPECTED_IGNORED_EVENT_TYPES.contains(&event_type.as_str()) {
                        debug!(event_type = %event_type, "Ignoring expected SSE event");
                    } else if self.unexpected_event_types.insert(event_type.clone()) {
                        warn!(event_type = %event_type, "Unexpected SSE event type");
                    } else {
                        debug!(event_type = %event_type, "Ignoring repeated unexpected SSE event type");
                    }
                }
            }
        }

        Ok(None)
    }

    /// Returns the next stream event.
    ///
    /// This method handles:
    /// - Reading bytes from the HTTP response
    /// - Parsing SSE frames
    /// - Emitting strongly-typed events
    ///
    /// Returns `None` when the stream is complete.
    ///
    /// # Errors
    ///
    /// Returns an error if there's an HTTP or parsing issue.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>, JarvisError> {
        if self.completed {
            return Ok(None);
        }

        loop {
            // Always drain any already-parsed results first. `SseParser::feed()`
            // consumes all complete frames from its internal buffer, so results
            // must not be dropped when multiple frames arrive in one HTTP chunk.
            if let Some(event) = self.drain_pending_results()? {
                return Ok(Some(event));
            }
            if self.completed {
                return Ok(None);
            }

            match self.byte_stream.next().await {
                Some(Ok(bytes)) => {
                    // Preserve UTF-8 correctness across arbitrary byte chunk
                    // boundaries; lossy decoding would inject U+FFFD when
                    // codepoints are split.
                    self.utf8_buffer.extend_from_slice(&bytes);

                    match std::str::from_utf8(&self.utf8_buffer) {
                        Ok(valid_str) => {
                            let frames = self.parser.feed(valid_str);
                            for frame in &frames {
                                self.pending_results
                                    .extend(map_frame(self.provider, frame));
                            }
                            self.utf8_buffer.clear();
                        }
                        Err(e) => {
                            let valid_up_to = e.valid_up_to();
                            if valid_up_to > 0 {
                                let valid_prefix =
                                    match std::str::from_utf8(&self.utf8_buffer[..valid_up_to]) {
                                        Ok(s) => s,
                                        Err(e) => {
                                            self.completed = true;
                                            return Err(JarvisError::ParseError(format!(
                                                "Invalid UTF-8 in streaming response prefix: {e}"
                                            )));
                                        }
                                    };
                                let frames = self.parser.feed(valid_prefix);
                                for frame in &frames {
                                    self.pending_results
                                        .extend(map_frame(self.provider, frame));
                                }
                                self.utf8_buffer.drain(..valid_up_to);
                            }

                            if e.error_len().is_some() {
                                self.completed = true;
                                return Err(JarvisError::ParseError(
                                    "Invalid UTF-8 in streaming response".to_string(),
                                ));
                            }
                            // Otherwise an incomplete trailing UTF-8 sequence;
                            // wait for more bytes.
                        }
                    }
                }
                Some(Err(e)) => {
                    self.completed = true;
                    return Err(JarvisError::HttpError(format!(
                        "Error reading streaming response: {e}"
                    )));
                }
                None => {
                    self.completed = true;
                    if self.saw_completed_event {
                        return Ok(None);
                    }
                    if self.saw_any_text {
                        // The server closed the connection without a terminal
                        // event but content arrived; keep it.
                        warn!("Stream ended without a terminal event; treating as completed");
                        self.saw_completed_event = true;
                        return Ok(Some(StreamEvent::Completed));
                    }
                    warn!("Stream ended without a terminal event");
                    return Err(JarvisError::ProviderError(
                        "Stream ended without any output".to_string(),
                    ));
                }
            }
        }
    }

    /// Returns `true` if the stream has completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Collects all remaining text deltas into a single string.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream fails.
    pub async fn collect_text(&mut self) -> Result<String, JarvisError> {
        let mut collected = String::new();

        while let Some(event) = self.next_event().await? {
            match event {
                StreamEvent::TextDelta(delta) => {
                    collected.push_str(&delta);
                }
                StreamEvent::Completed => {
                    break;
                }
                StreamEvent::Failed(msg) => {
                    return Err(JarvisError::ProviderError(format!(
                        "Streaming failed: {msg}"
                    )));
                }
                StreamEvent::Error(msg) => {
                    return Err(JarvisError::ProviderError(format!(
                        "Streaming error: {msg}"
                    )));
                }
            }
        }

        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(provider: Provider) -> LlmClient {
        LlmClient {
            http: Client::new(),
            provider,
            api_key: "test_key".to_string(),
            model: "test-model".to_string(),
        }
    }

    fn active(provider: Provider, chunks: Vec<Result<bytes::Bytes, reqwest::Error>>) -> ActiveStreamingResponse {
        ActiveStreamingResponse {
            byte_stream: Box::pin(futures::stream::iter(chunks)),
            parser: SseParser::new(),
            provider,
            pending_results: VecDeque::new(),
            utf8_buffer: Vec::new(),
            unexpected_event_types: HashSet::new(),
            saw_completed_event: false,
            saw_any_text: false,
            completed: false,
        }
    }

    const GEMINI_HELLO: &str =
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello\"}],\"role\":\"model\"}}]}\n\n";
    const GEMINI_WORLD_STOP: &str =
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" World\"}],\"role\":\"model\"},\"finishReason\":\"STOP\"}]}\n\n";

    #[tokio::test]
    async fn test_generate_returns_friendly_message_on_large_input() {
        let big_text = "a".repeat(1_600_000);
        let client = test_client(Provider::Gemini);
        let messages = vec![ChatMessage::user(big_text)];

        // Should return early without performing a network call
        let res = client.generate(&messages).await.unwrap();
        assert_eq!(res, StreamingResponse::too_large_message());
    }

    #[tokio::test]
    async fn test_generate_stream_returns_too_large_on_large_input() {
        let big_text = "a".repeat(1_600_000);
        let client = test_client(Provider::Claude);
        let messages = vec![ChatMessage::user(big_text)];

        let res = client.generate_stream(&messages).await.unwrap();
        assert!(res.is_too_large());
    }

    #[test]
    fn test_streaming_response_is_too_large() {
        assert!(StreamingResponse::TooLarge.is_too_large());
    }

    #[tokio::test]
    async fn test_next_event_does_not_drop_multiple_events_in_single_chunk() {
        let sse = format!("{GEMINI_HELLO}{GEMINI_WORLD_STOP}");
        let mut resp = active(Provider::Gemini, vec![Ok(bytes::Bytes::from(sse))]);

        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::TextDelta("Hello".to_string()))
        );
        assert!(resp.saw_any_text);
        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::TextDelta(" World".to_string()))
        );
        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::Completed)
        );
        assert_eq!(resp.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_event_handles_utf8_split_across_byte_chunks() {
        let event =
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello 世界\"}]}}]}\n\n";
        let event_bytes = event.as_bytes();

        // Split inside the UTF-8 bytes for '世' (0xE4 0xB8 0x96).
        let split_at = event_bytes
            .iter()
            .position(|b| *b == 0xE4)
            .expect("expected UTF-8 multi-byte sequence in test input");

        let chunk1 = bytes::Bytes::copy_from_slice(&event_bytes[..=split_at]);
        let chunk2 = bytes::Bytes::copy_from_slice(&event_bytes[split_at + 1..]);

        let mut resp = active(Provider::Gemini, vec![Ok(chunk1), Ok(chunk2)]);

        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::TextDelta("Hello 世界".to_string()))
        );
    }

    #[tokio::test]
    async fn test_collect_text_happy_path_claude() {
        let sse = concat!(
            "event: message_start\ndata: {\"type\":\"message_start\"}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\" World\"}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n"
        );
        let mut resp = active(Provider::Claude, vec![Ok(bytes::Bytes::from(sse))]);

        assert_eq!(resp.collect_text().await.unwrap(), "Hello World".to_string());
    }

    #[tokio::test]
    async fn test_collect_text_errors_on_error_event() {
        let sse = "event: error\ndata: {\"type\":\"error\",\"error\":{\"message\":\"boom\"}}\n\n";
        let mut resp = active(Provider::Claude, vec![Ok(bytes::Bytes::from(sse))]);

        let err = resp.collect_text().await.unwrap_err();
        assert!(err.to_string().contains("Streaming error"));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_collect_text_completes_on_eof_after_text() {
        // Stream closes without a terminal event; text already arrived.
        let mut resp = active(Provider::Gemini, vec![Ok(bytes::Bytes::from(GEMINI_HELLO))]);

        let text = resp.collect_text().await.unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_next_event_errors_on_eof_without_text() {
        let mut resp = active(Provider::Gemini, vec![]);

        let err = resp.next_event().await.unwrap_err();
        assert!(err.to_string().contains("without any output"));
    }

    #[tokio::test]
    async fn test_next_event_errors_on_network_error() {
        // Build a reqwest::Error without doing any network I/O.
        let req_err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let mut resp = active(Provider::Gemini, vec![Err(req_err)]);

        let err = resp.next_event().await.unwrap_err();
        assert!(err.to_string().contains("Error reading streaming response"));
    }

    #[tokio::test]
    async fn test_next_event_yields_failed_event() {
        let sse = "data: {\"candidates\":[{\"finishReason\":\"SAFETY\"}]}\n\n";
        let mut resp = active(Provider::Gemini, vec![Ok(bytes::Bytes::from(sse))]);

        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::Failed("Generation stopped: SAFETY".to_string()))
        );
        assert_eq!(resp.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_event_errors_on_done_before_any_text() {
        let sse = "data: [DONE]\n\n";
        let mut resp = active(Provider::Claude, vec![Ok(bytes::Bytes::from(sse))]);

        let err = resp.next_event().await.unwrap_err();
        assert!(err.to_string().contains("ended before completion"));
    }

    #[tokio::test]
    async fn test_next_event_treats_done_as_completed_after_text() {
        let sse = concat!(
            "event: content_block_delta\ndata: {\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
            "data: [DONE]\n\n"
        );
        let mut resp = active(Provider::Claude, vec![Ok(bytes::Bytes::from(sse))]);

        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::TextDelta("Hello".to_string()))
        );
        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::Completed)
        );
        assert_eq!(resp.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_event_errors_on_invalid_utf8() {
        let mut resp = active(
            Provider::Gemini,
            vec![Ok(bytes::Bytes::from(vec![0xFF]))],
        );

        let err = resp.next_event().await.unwrap_err();
        assert!(err.to_string().contains("Invalid UTF-8"));
    }

    #[tokio::test]
    async fn test_next_event_surfaces_malformed_json_as_error_event() {
        let sse = "data: {\"candidates\":}\n\n";
        let mut resp = active(Provider::Gemini, vec![Ok(bytes::Bytes::from(sse))]);

        let event = resp.next_event().await.unwrap();
        match event {
            Some(StreamEvent::Error(msg)) => {
                assert!(msg.contains("Failed to parse Gemini SSE payload"));
            }
            other => panic!("expected StreamEvent::Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bookkeeping_events_are_skipped() {
        let sse = concat!(
            "event: ping\ndata: {\"type\":\"ping\"}\n\n",
            "event: content_block_start\ndata: {\"type\":\"content_block_start\"}\n\n",
            "event: content_block_delta\ndata: {\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n"
        );
        let mut resp = active(Provider::Claude, vec![Ok(bytes::Bytes::from(sse))]);

        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::TextDelta("Hi".to_string()))
        );
        assert_eq!(
            resp.next_event().await.unwrap(),
            Some(StreamEvent::Completed)
        );
    }

    #[test]
    fn test_estimate_tokens_scales_with_chars() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abcd"), 2);
        assert!(estimate_tokens(&"a".repeat(4000)) > 900);
    }
}
