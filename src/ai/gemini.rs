//! Request building and stream-event mapping for the Gemini API.
//!
//! Chat goes through `models/{model}:generateContent`; streaming uses
//! `:streamGenerateContent?alt=sse`, which emits plain `data:` frames with the
//! event kind encoded in the JSON payload (no `event:` lines).

use reqwest::header::HeaderMap;
use serde_json::{Value, json};

use super::sse::SseFrame;
use super::{ChatMessage, ParseResult, Role, StreamEvent};
use crate::errors::JarvisError;

pub(crate) const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[must_use]
pub(crate) fn endpoint(model: &str, stream: bool) -> String {
    if stream {
        format!("{BASE_URL}/models/{model}:streamGenerateContent?alt=sse")
    } else {
        format!("{BASE_URL}/models/{model}:generateContent")
    }
}

/// The API key travels in a header rather than the query string so request
/// URLs stay safe to log.
pub(crate) fn headers(api_key: &str) -> Result<HeaderMap, JarvisError> {
    let mut headers = HeaderMap::new();
    let key_value = api_key
        .parse()
        .map_err(|e| JarvisError::HttpError(format!("Invalid x-goog-api-key header: {e}")))?;
    headers.insert("x-goog-api-key", key_value);
    Ok(headers)
}

/// Builds a `generateContent` request body. System messages are folded into
/// `system_instruction`; the assistant role maps to Gemini's `model` role.
#[must_use]
pub(crate) fn request_body(messages: &[ChatMessage], max_output_tokens: usize) -> Value {
    let system_text = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let contents: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = match m.role {
                Role::Assistant => "model",
                _ => "user",
            };
            json!({
                "role": role,
                "parts": [{ "text": m.content }]
            })
        })
        .collect();

    let mut body = json!({
        "contents": contents,
        "generationConfig": { "maxOutputTokens": max_output_tokens }
    });

    if !system_text.is_empty() {
        body["system_instruction"] = json!({ "parts": [{ "text": system_text }] });
    }

    body
}

/// Extracts the full response text from a non-streaming `generateContent`
/// response.
#[must_use]
pub(crate) fn extract_text(response_json: &Value) -> Option<String> {
    let parts = response_json
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let collected: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if collected.is_empty() {
        None
    } else {
        Some(collected.join(""))
    }
}

/// Maps one SSE frame to stream events. A single Gemini chunk can carry both
/// a text delta and a finish reason, hence the `Vec`.
#[must_use]
pub(crate) fn map_frame(frame: &SseFrame) -> Vec<ParseResult> {
    let data = match frame {
        SseFrame::Done => return vec![ParseResult::Done],
        SseFrame::Message { data, .. } => data,
    };

    let json: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return vec![ParseResult::Event(StreamEvent::Error(format!(
                "Failed to parse Gemini SSE payload: {e}"
            )))];
        }
    };

    if let Some(error) = json.get("error") {
        let msg = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return vec![ParseResult::Event(StreamEvent::Error(msg.to_string()))];
    }

    if let Some(reason) = json
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return vec![ParseResult::Event(StreamEvent::Failed(format!(
            "Prompt blocked: {reason}"
        )))];
    }

    let Some(candidate) = json
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        // usageMetadata-only chunks and similar bookkeeping
        return vec![ParseResult::UnknownEvent("gemini.metadata".to_string())];
    };

    let mut results = Vec::new();

    if let Some(parts) = candidate.pointer("/content/parts").and_then(Value::as_array) {
        let delta: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        if !delta.is_empty() {
            results.push(ParseResult::Event(StreamEvent::TextDelta(delta)));
        }
    }

    if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
        match reason {
            // MAX_TOKENS still delivered usable text; the cap is ours.
            "STOP" | "MAX_TOKENS" => results.push(ParseResult::Event(StreamEvent::Completed)),
            other => {
                results.push(ParseResult::Event(StreamEvent::Failed(format!(
                    "Generation stopped: {other}"
                ))));
            }
        }
    }

    if results.is_empty() {
        results.push(ParseResult::UnknownEvent("gemini.metadata".to_string()));
    }

    results
}
