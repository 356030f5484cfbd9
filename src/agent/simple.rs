//! Single-agent mode: one persona, streaming replies, bounded session history
//! plus long-term memory recall.

use std::sync::Arc;

use chrono::{Local, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::memory_context;
use crate::ai::{ChatMessage, LlmClient, StreamEvent, StreamingResponse};
use crate::core::config::AppConfig;
use crate::errors::JarvisError;
use crate::memory::{MemoryManager, MemoryStats, PatternEntry};
use crate::prompts::{SIMPLE_PROMPT, sanitize_custom_internal};

/// Rolling window: last 10 exchanges.
const HISTORY_WINDOW: usize = 20;

static TOPIC_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            "backend",
            r"(?i)\b(python|golang|node(\.js)?|rust|api|database|sql|postgres|redis|server)\b",
        ),
        (
            "frontend",
            r"(?i)\b(react|typescript|css|html|frontend|ui|ux|component|tailwind)\b",
        ),
        (
            "devops",
            r"(?i)\b(terraform|docker|kubernetes|k8s|helm|aws|gcp|azure|nixos?|pipeline|deploy)\b",
        ),
    ]
    .into_iter()
    .map(|(topic, pattern)| (topic, Regex::new(pattern).expect("valid topic pattern")))
    .collect()
});

#[must_use]
fn time_of_day_bucket(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "night",
    }
}

#[must_use]
fn detect_topics(message: &str) -> Vec<&'static str> {
    TOPIC_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(message))
        .map(|(topic, _)| *topic)
        .collect()
}

/// Simple single-agent Jarvis. No supervisor, no routing - just direct LLM
/// calls with memory on the side.
pub struct SimpleAgent {
    client: LlmClient,
    memory: Arc<MemoryManager>,
    session_id: String,
    system: ChatMessage,
    custom_style: Option<String>,
    history: Vec<ChatMessage>,
}

impl SimpleAgent {
    /// # Errors
    ///
    /// Returns an error when no API key is configured for the active provider.
    pub fn new(
        config: &AppConfig,
        memory: Arc<MemoryManager>,
        session_id: String,
        custom_style: Option<&str>,
    ) -> Result<Self, JarvisError> {
        Ok(Self {
            client: LlmClient::from_config(config)?,
            memory,
            session_id,
            system: ChatMessage::system(SIMPLE_PROMPT),
            custom_style: custom_style.map(sanitize_custom_internal),
            history: Vec::new(),
        })
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    async fn build_prompt(&self, message: &str) -> Vec<ChatMessage> {
        let mut prompt = vec![self.system.clone()];

        if let Some(style) = &self.custom_style {
            prompt.push(ChatMessage::system(format!(
                "CUSTOM STYLE (override lower-priority rules): {style}"
            )));
        }

        if let Some(context) = memory_context(&self.memory, message).await {
            prompt.push(ChatMessage::system(context));
        }

        prompt.extend(self.history.iter().cloned());
        prompt.push(ChatMessage::user(message));
        prompt
    }

    /// Pushes the exchange into the session window, persists it, and tracks
    /// usage patterns. Memory failures never fail the turn.
    async fn finish_exchange(&mut self, user_message: &str, assistant_response: &str) {
        self.history.push(ChatMessage::user(user_message));
        self.history.push(ChatMessage::assistant(assistant_response));
        if self.history.len() > HISTORY_WINDOW {
            let excess = self.history.len() - HISTORY_WINDOW;
            self.history.drain(..excess);
        }

        if let Err(e) = self
            .memory
            .store(&self.session_id, user_message, assistant_response, None)
            .await
        {
            warn!("Failed to store exchange: {e}");
        }

        self.track_patterns(user_message).await;
    }

    async fn track_patterns(&self, message: &str) {
        let bucket = time_of_day_bucket(Local::now().hour());
        if let Err(e) = self.memory.track_pattern("time_of_day", bucket).await {
            warn!("Failed to track time-of-day pattern: {e}");
        }

        for topic in detect_topics(message) {
            if let Err(e) = self.memory.track_pattern("topic", topic).await {
                warn!("Failed to track topic pattern: {e}");
            }
        }
    }

    /// Sends a message and returns the complete response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn chat(&mut self, message: &str) -> Result<String, JarvisError> {
        let prompt = self.build_prompt(message).await;
        let response = self.client.generate(&prompt).await?;
        self.finish_exchange(message, &response).await;
        Ok(response)
    }

    /// Streams a response, invoking `on_delta` for every text fragment, and
    /// returns the full text. History and memory are updated only after the
    /// stream completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call or the stream fails.
    pub async fn stream<F>(&mut self, message: &str, mut on_delta: F) -> Result<String, JarvisError>
    where
        F: FnMut(&str),
    {
        let prompt = self.build_prompt(message).await;

        let mut active = match self.client.generate_stream(&prompt).await? {
            StreamingResponse::TooLarge => {
                let notice = StreamingResponse::too_large_message().to_string();
                on_delta(&notice);
                return Ok(notice);
            }
            StreamingResponse::Active(active) => active,
        };

        let mut collected = String::new();
        while let Some(event) = active.next_event().await? {
            match event {
                StreamEvent::TextDelta(delta) => {
                    on_delta(&delta);
                    collected.push_str(&delta);
                }
                StreamEvent::Completed => break,
                StreamEvent::Failed(msg) | StreamEvent::Error(msg) => {
                    return Err(JarvisError::ProviderError(msg));
                }
            }
        }

        self.finish_exchange(message, &collected).await;
        Ok(collected)
    }

    /// Clears the in-session window; persistent memory is untouched.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// # Errors
    ///
    /// Returns an error on any storage failure.
    pub async fn memory_stats(&self) -> Result<MemoryStats, JarvisError> {
        self.memory.stats().await
    }

    /// # Errors
    ///
    /// Returns an error on any storage failure.
    pub async fn patterns(&self) -> Result<Vec<PatternEntry>, JarvisError> {
        self.memory.patterns(None, 2).await
    }

    #[cfg(test)]
    pub(crate) fn history_len(&self) -> usize {
        self.history.len()
    }
}
