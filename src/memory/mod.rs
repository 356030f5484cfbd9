//! Persistent conversational memory.
//!
//! Two layers share one SQLite file: structured history (full conversation
//! log, tracked patterns, session summaries) and a semantic index of embedded
//! exchanges queried by cosine similarity. The semantic layer is best-effort:
//! an embedding failure never loses the structured record of an exchange, and
//! a recall failure never aborts a chat turn.

pub mod store;
pub mod vector;

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::ai::Embedder;
use crate::core::config::AppConfig;
use crate::errors::JarvisError;
pub use store::{ConversationEntry, MemoryStats, PatternEntry, SessionSummary, SqliteStore};
use store::EmbeddedDoc;
use vector::cosine_similarity;

/// A recalled memory chunk.
#[derive(Debug, Clone)]
pub struct MemoryHit {
    pub content: String,
    pub session_id: String,
    pub timestamp: String,
    /// Cosine similarity to the query, higher is closer.
    pub relevance: f32,
}

/// Manages memory across conversations.
pub struct MemoryManager {
    store: SqliteStore,
    embedder: Option<Arc<dyn Embedder>>,
}

impl MemoryManager {
    #[must_use]
    pub fn new(store: SqliteStore, embedder: Option<Arc<dyn Embedder>>) -> Self {
        if embedder.is_none() {
            warn!("No embedding provider configured; semantic recall disabled");
        }
        Self { store, embedder }
    }

    /// Opens the memory database under the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn open(
        config: &AppConfig,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self, JarvisError> {
        let store = SqliteStore::open(&config.db_path()).await?;
        Ok(Self::new(store, embedder))
    }

    /// Stores a conversation exchange in memory.
    ///
    /// The SQLite rows are written first; the embedding is added afterwards
    /// and failures there only log a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the structured insert fails.
    pub async fn store(
        &self,
        session_id: &str,
        user_message: &str,
        assistant_response: &str,
        metadata: Option<&Value>,
    ) -> Result<(), JarvisError> {
        let timestamp = Utc::now().to_rfc3339();
        let meta_json = metadata.map(Value::to_string);

        self.store
            .insert_exchange(
                session_id,
                user_message,
                assistant_response,
                &timestamp,
                meta_json.as_deref(),
            )
            .await?;

        let Some(embedder) = &self.embedder else {
            return Ok(());
        };

        // Combine user + assistant for context
        let combined = format!("User: {user_message}\nJarvis: {assistant_response}");

        match embedder.embed(&combined).await {
            Ok(vector) => {
                let doc = EmbeddedDoc {
                    doc_id: format!("{session_id}_{timestamp}"),
                    session_id: session_id.to_string(),
                    content: combined,
                    vector,
                    created_at: timestamp,
                };
                if let Err(e) = self.store.upsert_embedding(&doc).await {
                    warn!("Failed to store embedding: {e}");
                }
            }
            Err(e) => {
                warn!("Failed to embed exchange: {e}");
            }
        }

        Ok(())
    }

    /// Recalls relevant memories based on semantic similarity.
    ///
    /// Never fails: any embedding or storage error degrades to an empty
    /// result with a warning.
    pub async fn recall(
        &self,
        query: &str,
        n_results: usize,
        session_filter: Option<&str>,
    ) -> Vec<MemoryHit> {
        let Some(embedder) = &self.embedder else {
            return Vec::new();
        };

        let query_vector = match embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to embed recall query: {e}");
                return Vec::new();
            }
        };

        let docs = match self.store.all_embeddings(session_filter).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Failed to load embeddings: {e}");
                return Vec::new();
            }
        };

        let mut hits: Vec<MemoryHit> = docs
            .into_iter()
            .map(|doc| MemoryHit {
                relevance: cosine_similarity(&query_vector, &doc.vector),
                content: doc.content,
                session_id: doc.session_id,
                timestamp: doc.created_at,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(n_results);
        hits
    }

    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn recent_history(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationEntry>, JarvisError> {
        self.store.recent_history(session_id, limit).await
    }

    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn all_sessions(&self) -> Result<Vec<SessionSummary>, JarvisError> {
        self.store.all_sessions().await
    }

    /// Tracks a recurring pattern in user behavior.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn track_pattern(
        &self,
        pattern_type: &str,
        pattern_data: &str,
    ) -> Result<(), JarvisError> {
        self.store.track_pattern(pattern_type, pattern_data).await
    }

    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn patterns(
        &self,
        pattern_type: Option<&str>,
        min_frequency: i64,
    ) -> Result<Vec<PatternEntry>, JarvisError> {
        self.store.patterns(pattern_type, min_frequency).await
    }

    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn store_summary(&self, session_id: &str, summary: &str) -> Result<(), JarvisError> {
        self.store.store_summary(session_id, summary).await
    }

    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn latest_summary(&self, session_id: &str) -> Result<Option<String>, JarvisError> {
        self.store.latest_summary(session_id).await
    }

    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn stats(&self) -> Result<MemoryStats, JarvisError> {
        self.store.stats().await
    }

    /// Closes the database connections.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
