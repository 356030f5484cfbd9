use std::sync::Arc;

use async_trait::async_trait;

use jarvis::ai::Embedder;
use jarvis::errors::JarvisError;
use jarvis::memory::{MemoryManager, SqliteStore};

const KEYWORDS: [&str; 4] = ["docker", "react", "rust", "coffee"];

/// Deterministic embedder: one axis per keyword, counted occurrences.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, JarvisError> {
        let lower = text.to_lowercase();
        Ok(KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect())
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, JarvisError> {
        Err(JarvisError::ProviderError("embedding offline".to_string()))
    }

    fn model(&self) -> &str {
        "failing-test"
    }
}

async fn manager_with(embedder: Option<Arc<dyn Embedder>>) -> MemoryManager {
    let store = SqliteStore::open_in_memory().await.unwrap();
    MemoryManager::new(store, embedder)
}

#[tokio::test]
async fn store_then_recall_orders_by_similarity() {
    let memory = manager_with(Some(Arc::new(KeywordEmbedder))).await;

    memory
        .store("s1", "how do I run docker", "Use docker compose, Sir.", None)
        .await
        .unwrap();
    memory
        .store("s1", "style a react button", "A touch of CSS, Sir.", None)
        .await
        .unwrap();

    let hits = memory.recall("docker networking", 5, None).await;

    assert_eq!(hits.len(), 2);
    assert!(hits[0].content.contains("docker"));
    assert!(hits[0].relevance > 0.9);
    assert!(hits[0].relevance > hits[1].relevance);
}

#[tokio::test]
async fn recall_respects_session_filter() {
    let memory = manager_with(Some(Arc::new(KeywordEmbedder))).await;

    memory
        .store("alpha", "docker question", "docker answer", None)
        .await
        .unwrap();
    memory
        .store("beta", "more docker talk", "docker again", None)
        .await
        .unwrap();

    let hits = memory.recall("docker", 5, Some("beta")).await;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].session_id, "beta");
    assert!(!hits[0].timestamp.is_empty());
}

#[tokio::test]
async fn recall_truncates_to_requested_count() {
    let memory = manager_with(Some(Arc::new(KeywordEmbedder))).await;

    for i in 0..4 {
        memory
            .store("s1", &format!("docker question {i}"), "docker answer", None)
            .await
            .unwrap();
    }

    let hits = memory.recall("docker", 2, None).await;
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn recall_without_embedder_is_empty() {
    let memory = manager_with(None).await;

    memory
        .store("s1", "docker question", "docker answer", None)
        .await
        .unwrap();

    assert!(memory.recall("docker", 5, None).await.is_empty());

    // Structured storage still works without a semantic layer
    let stats = memory.stats().await.unwrap();
    assert_eq!(stats.total_messages, 2);
    assert_eq!(stats.embedded_chunks, 0);
}

#[tokio::test]
async fn embed_failure_keeps_structured_rows() {
    let memory = manager_with(Some(Arc::new(FailingEmbedder))).await;

    memory
        .store("s1", "hello", "Good evening, Sir.", None)
        .await
        .unwrap();

    let stats = memory.stats().await.unwrap();
    assert_eq!(stats.total_messages, 2);
    assert_eq!(stats.total_sessions, 1);
    assert_eq!(stats.embedded_chunks, 0);

    // Query embedding fails too; recall degrades to empty
    assert!(memory.recall("hello", 5, None).await.is_empty());
}

#[tokio::test]
async fn memory_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jarvis_memory.db");

    {
        let store = SqliteStore::open(&db_path).await.unwrap();
        let memory = MemoryManager::new(store, Some(Arc::new(KeywordEmbedder)));
        memory
            .store("s1", "rust borrow checker", "Patience, Sir.", None)
            .await
            .unwrap();
        memory.track_pattern("topic", "rust").await.unwrap();
        memory.close().await;
    }

    let store = SqliteStore::open(&db_path).await.unwrap();
    let memory = MemoryManager::new(store, Some(Arc::new(KeywordEmbedder)));

    let stats = memory.stats().await.unwrap();
    assert_eq!(stats.total_messages, 2);
    assert_eq!(stats.embedded_chunks, 1);

    let hits = memory.recall("rust lifetimes", 5, None).await;
    assert_eq!(hits.len(), 1);
    assert!(hits[0].content.contains("borrow checker"));

    let history = memory.recent_history("s1", 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, "user");
}
