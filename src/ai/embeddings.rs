//! Embedding providers for semantic memory.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use super::gemini;
use crate::core::config::AppConfig;
use crate::errors::JarvisError;

/// Abstract embedding provider.
///
/// The memory subsystem only needs a text-to-vector mapping; tests supply a
/// deterministic implementation so no network is involved.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, JarvisError>;

    /// Model identifier for diagnostics.
    fn model(&self) -> &str;
}

/// Gemini `embedContent` embedding provider.
pub struct GeminiEmbedder {
    http: Client,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: String, model: String) -> Result<Self, JarvisError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| JarvisError::HttpError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    /// Builds an embedder when a Google key is configured; memory degrades to
    /// structured-only storage otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, JarvisError> {
        match &config.google_api_key {
            Some(key) => Ok(Some(Self::new(
                key.clone(),
                config.embedding_model.clone(),
            )?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, JarvisError> {
        let url = format!("{}/models/{}:embedContent", gemini::BASE_URL, self.model);
        let body = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] }
        });

        let headers = gemini::headers(&self.api_key)?;

        let response = self
            .http
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| JarvisError::HttpError(format!("Embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(JarvisError::ProviderError(format!(
                "Embedding API error (status {status}): {error_text}"
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| JarvisError::ParseError(format!("Failed to parse embedding response: {e}")))?;

        let values = response_json
            .pointer("/embedding/values")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                JarvisError::ParseError("No embedding values in response".to_string())
            })?;

        let vector: Vec<f32> = values
            .iter()
            .filter_map(Value::as_f64)
            .map(|v| v as f32)
            .collect();

        if vector.is_empty() {
            return Err(JarvisError::ParseError(
                "Empty embedding in response".to_string(),
            ));
        }

        Ok(vector)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
