//! Request building and stream-event mapping for the Anthropic Messages API.
//!
//! Unlike Gemini, Anthropic names each streaming event on the SSE `event:`
//! line (`content_block_delta`, `message_stop`, ...) with details in the JSON
//! payload.

use reqwest::header::HeaderMap;
use serde_json::{Value, json};

use super::sse::SseFrame;
use super::{ChatMessage, ParseResult, Role, StreamEvent};
use crate::errors::JarvisError;

pub(crate) const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub(crate) fn headers(api_key: &str) -> Result<HeaderMap, JarvisError> {
    let mut headers = HeaderMap::new();

    let key_value = api_key
        .parse()
        .map_err(|e| JarvisError::HttpError(format!("Invalid x-api-key header: {e}")))?;
    headers.insert("x-api-key", key_value);

    let version_value = API_VERSION
        .parse()
        .map_err(|e| JarvisError::HttpError(format!("Invalid anthropic-version header: {e}")))?;
    headers.insert("anthropic-version", version_value);

    Ok(headers)
}

/// Builds a Messages API request body. System messages are folded into the
/// top-level `system` string; the rest must alternate user/assistant.
#[must_use]
pub(crate) fn request_body(
    messages: &[ChatMessage],
    model: &str,
    max_tokens: usize,
    stream: bool,
) -> Value {
    let system_text = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let chat: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = match m.role {
                Role::Assistant => "assistant",
                _ => "user",
            };
            json!({ "role": role, "content": m.content })
        })
        .collect();

    let mut body = json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": chat,
    });

    if !system_text.is_empty() {
        body["system"] = json!(system_text);
    }
    if stream {
        body["stream"] = json!(true);
    }

    body
}

/// Extracts the full response text from a non-streaming Messages response.
#[must_use]
pub(crate) fn extract_text(response_json: &Value) -> Option<String> {
    let blocks = response_json.get("content")?.as_array()?;

    let collected: Vec<&str> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n"))
    }
}

fn error_message(json: &Value) -> String {
    json.pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string()
}

/// Maps one SSE frame to stream events. Falls back to the payload's `type`
/// field when the `event:` line is absent.
#[must_use]
pub(crate) fn map_frame(frame: &SseFrame) -> Vec<ParseResult> {
    let (event, data) = match frame {
        SseFrame::Done => return vec![ParseResult::Done],
        SseFrame::Message { event, data } => (event, data),
    };

    let json: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return vec![ParseResult::Event(StreamEvent::Error(format!(
                "Failed to parse Anthropic SSE payload: {e}"
            )))];
        }
    };

    let event_type = event
        .as_deref()
        .or_else(|| json.get("type").and_then(Value::as_str))
        .unwrap_or("");

    match event_type {
        "content_block_delta" => {
            let delta = &json["delta"];
            if delta.get("type").and_then(Value::as_str) == Some("text_delta") {
                let text = delta.get("text").and_then(Value::as_str).unwrap_or("");
                vec![ParseResult::Event(StreamEvent::TextDelta(
                    text.to_string(),
                ))]
            } else {
                vec![ParseResult::UnknownEvent(
                    "content_block_delta.non_text".to_string(),
                )]
            }
        }
        "message_stop" => vec![ParseResult::Event(StreamEvent::Completed)],
        "error" => vec![ParseResult::Event(StreamEvent::Error(error_message(
            &json,
        )))],
        "" => vec![ParseResult::UnknownEvent("anthropic.unnamed".to_string())],
        other => vec![ParseResult::UnknownEvent(other.to_string())],
    }
}
