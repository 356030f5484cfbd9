//! LLM provider clients and streaming plumbing.
//!
//! `LlmClient` dispatches chat requests to the configured provider (Gemini or
//! Claude) over plain reqwest + JSON. Streaming responses flow through the
//! shared [`sse::SseParser`] and are mapped to typed [`StreamEvent`]s by the
//! provider modules.

pub mod claude;
pub mod client;
pub mod embeddings;
pub mod gemini;
pub mod sse;

pub use client::{ActiveStreamingResponse, LlmClient, StreamingResponse, estimate_tokens};
pub use embeddings::{Embedder, GeminiEmbedder};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A provider-agnostic chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Events emitted by a provider streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text delta.
    TextDelta(String),
    /// The response completed successfully.
    Completed,
    /// The response failed with an error message.
    Failed(String),
    /// An error occurred during streaming.
    Error(String),
}

/// Result of mapping one SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// A complete event was parsed.
    Event(StreamEvent),
    /// The frame was parsed but carried an unknown/bookkeeping event type.
    UnknownEvent(String),
    /// End of stream signal (`[DONE]`).
    Done,
}
