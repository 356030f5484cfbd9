//! SQLite persistence for conversations, patterns, summaries, and embeddings.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::vector::{bytes_to_vector, vector_to_bytes};
use crate::errors::JarvisError;

/// One row of conversation history.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

/// Aggregate view of one session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub started: String,
    pub last_active: String,
    pub message_count: i64,
}

/// A tracked usage pattern.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub pattern_type: String,
    pub pattern_data: String,
    pub frequency: i64,
    pub last_seen: String,
}

/// Memory statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStats {
    pub total_messages: i64,
    pub total_sessions: i64,
    pub total_patterns: i64,
    pub embedded_chunks: i64,
}

/// An embedded conversation chunk.
#[derive(Debug, Clone)]
pub struct EmbeddedDoc {
    pub doc_id: String,
    pub session_id: String,
    pub content: String,
    pub vector: Vec<f32>,
    pub created_at: String,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
        metadata TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_session ON conversations(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_timestamp ON conversations(timestamp)",
    "CREATE TABLE IF NOT EXISTS patterns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pattern_type TEXT NOT NULL,
        pattern_data TEXT NOT NULL,
        frequency INTEGER DEFAULT 1,
        first_seen DATETIME DEFAULT CURRENT_TIMESTAMP,
        last_seen DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS summaries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        summary TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS embeddings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        doc_id TEXT NOT NULL UNIQUE,
        session_id TEXT NOT NULL,
        content TEXT NOT NULL,
        vector BLOB NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
];

/// Structured storage over a SQLite pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or schema cannot be created.
    pub async fn open(path: &Path) -> Result<Self, JarvisError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| JarvisError::MemoryError(format!("Failed to create data dir: {e}")))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory database for tests. A single connection keeps all queries on
    /// the same ephemeral database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn open_in_memory() -> Result<Self, JarvisError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| JarvisError::MemoryError(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), JarvisError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Inserts both sides of an exchange in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn insert_exchange(
        &self,
        session_id: &str,
        user_message: &str,
        assistant_response: &str,
        timestamp: &str,
        metadata: Option<&str>,
    ) -> Result<(), JarvisError> {
        let mut tx = self.pool.begin().await?;

        for (role, content) in [("user", user_message), ("assistant", assistant_response)] {
            sqlx::query(
                "INSERT INTO conversations (session_id, role, content, timestamp, metadata) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(session_id)
            .bind(role)
            .bind(content)
            .bind(timestamp)
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Last `limit` rows for a session, oldest-first.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn recent_history(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationEntry>, JarvisError> {
        let rows = sqlx::query(
            "SELECT role, content, timestamp FROM conversations \
             WHERE session_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(ConversationEntry {
                role: row.try_get("role")?,
                content: row.try_get("content")?,
                timestamp: row.try_get("timestamp")?,
            });
        }
        entries.reverse();
        Ok(entries)
    }

    /// All sessions, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn all_sessions(&self) -> Result<Vec<SessionSummary>, JarvisError> {
        let rows = sqlx::query(
            "SELECT session_id, MIN(timestamp) AS started, MAX(timestamp) AS last_active, \
             COUNT(*) AS message_count FROM conversations \
             GROUP BY session_id ORDER BY last_active DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(SessionSummary {
                session_id: row.try_get("session_id")?,
                started: row.try_get("started")?,
                last_active: row.try_get("last_active")?,
                message_count: row.try_get("message_count")?,
            });
        }
        Ok(sessions)
    }

    /// Inserts a pattern or bumps its frequency and `last_seen`.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn track_pattern(
        &self,
        pattern_type: &str,
        pattern_data: &str,
    ) -> Result<(), JarvisError> {
        let existing = sqlx::query(
            "SELECT id FROM patterns WHERE pattern_type = ?1 AND pattern_data = ?2",
        )
        .bind(pattern_type)
        .bind(pattern_data)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = existing {
            let id: i64 = row.try_get("id")?;
            sqlx::query(
                "UPDATE patterns SET frequency = frequency + 1, last_seen = CURRENT_TIMESTAMP \
                 WHERE id = ?1",
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("INSERT INTO patterns (pattern_type, pattern_data) VALUES (?1, ?2)")
                .bind(pattern_type)
                .bind(pattern_data)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Tracked patterns above `min_frequency`, optionally filtered by type,
    /// frequency-descending.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn patterns(
        &self,
        pattern_type: Option<&str>,
        min_frequency: i64,
    ) -> Result<Vec<PatternEntry>, JarvisError> {
        let rows = if let Some(pattern_type) = pattern_type {
            sqlx::query(
                "SELECT pattern_type, pattern_data, frequency, last_seen FROM patterns \
                 WHERE pattern_type = ?1 AND frequency >= ?2 ORDER BY frequency DESC",
            )
            .bind(pattern_type)
            .bind(min_frequency)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT pattern_type, pattern_data, frequency, last_seen FROM patterns \
                 WHERE frequency >= ?1 ORDER BY frequency DESC",
            )
            .bind(min_frequency)
            .fetch_all(&self.pool)
            .await?
        };

        let mut patterns = Vec::with_capacity(rows.len());
        for row in rows {
            patterns.push(PatternEntry {
                pattern_type: row.try_get("pattern_type")?,
                pattern_data: row.try_get("pattern_data")?,
                frequency: row.try_get("frequency")?,
                last_seen: row.try_get("last_seen")?,
            });
        }
        Ok(patterns)
    }

    /// Stores a session summary.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn store_summary(&self, session_id: &str, summary: &str) -> Result<(), JarvisError> {
        sqlx::query("INSERT INTO summaries (session_id, summary) VALUES (?1, ?2)")
            .bind(session_id)
            .bind(summary)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Most recent summary for a session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn latest_summary(&self, session_id: &str) -> Result<Option<String>, JarvisError> {
        let row = sqlx::query(
            "SELECT summary FROM summaries WHERE session_id = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("summary")?),
            None => None,
        })
    }

    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn stats(&self) -> Result<MemoryStats, JarvisError> {
        let total_messages: i64 = sqlx::query("SELECT COUNT(*) AS n FROM conversations")
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        let total_sessions: i64 =
            sqlx::query("SELECT COUNT(DISTINCT session_id) AS n FROM conversations")
                .fetch_one(&self.pool)
                .await?
                .try_get("n")?;
        let total_patterns: i64 = sqlx::query("SELECT COUNT(*) AS n FROM patterns")
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        let embedded_chunks: i64 = sqlx::query("SELECT COUNT(*) AS n FROM embeddings")
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;

        Ok(MemoryStats {
            total_messages,
            total_sessions,
            total_patterns,
            embedded_chunks,
        })
    }

    /// Inserts or replaces an embedded chunk by `doc_id`.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn upsert_embedding(&self, doc: &EmbeddedDoc) -> Result<(), JarvisError> {
        sqlx::query(
            "INSERT INTO embeddings (doc_id, session_id, content, vector, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(doc_id) DO UPDATE SET \
             session_id = excluded.session_id, content = excluded.content, \
             vector = excluded.vector, created_at = excluded.created_at",
        )
        .bind(&doc.doc_id)
        .bind(&doc.session_id)
        .bind(&doc.content)
        .bind(vector_to_bytes(&doc.vector))
        .bind(&doc.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads all embedded chunks, optionally filtered by session.
    ///
    /// # Errors
    ///
    /// Returns an error on any SQLite failure.
    pub async fn all_embeddings(
        &self,
        session_filter: Option<&str>,
    ) -> Result<Vec<EmbeddedDoc>, JarvisError> {
        let rows = if let Some(session_id) = session_filter {
            sqlx::query(
                "SELECT doc_id, session_id, content, vector, created_at FROM embeddings \
                 WHERE session_id = ?1",
            )
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query("SELECT doc_id, session_id, content, vector, created_at FROM embeddings")
                .fetch_all(&self.pool)
                .await?
        };

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.try_get("vector")?;
            docs.push(EmbeddedDoc {
                doc_id: row.try_get("doc_id")?,
                session_id: row.try_get("session_id")?,
                content: row.try_get("content")?,
                vector: bytes_to_vector(&blob),
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(docs)
    }

    /// Closes the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exchange_round_trips_through_history() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store
            .insert_exchange("s1", "hello", "Good evening, Sir.", "2026-01-01T10:00:00Z", None)
            .await
            .unwrap();

        let history = store.recent_history("s1", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].role, "assistant");
    }

    #[tokio::test]
    async fn history_is_windowed_and_oldest_first() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        for i in 0..5 {
            store
                .insert_exchange(
                    "s1",
                    &format!("q{i}"),
                    &format!("a{i}"),
                    &format!("2026-01-01T10:00:0{i}Z"),
                    None,
                )
                .await
                .unwrap();
        }

        let history = store.recent_history("s1", 4).await.unwrap();
        assert_eq!(history.len(), 4);
        // Two newest exchanges, user before assistant within each
        assert_eq!(history[0].content, "q3");
        assert_eq!(history[1].content, "a3");
        assert_eq!(history[2].content, "q4");
        assert_eq!(history[3].content, "a4");
    }

    #[tokio::test]
    async fn sessions_are_listed_most_recent_first() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store
            .insert_exchange("old", "q", "a", "2026-01-01T08:00:00Z", None)
            .await
            .unwrap();
        store
            .insert_exchange("new", "q", "a", "2026-01-02T08:00:00Z", None)
            .await
            .unwrap();

        let sessions = store.all_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "new");
        assert_eq!(sessions[0].message_count, 2);
        assert_eq!(sessions[1].session_id, "old");
    }

    #[tokio::test]
    async fn pattern_frequency_bumps_on_repeat() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store.track_pattern("topic", "devops").await.unwrap();
        store.track_pattern("topic", "devops").await.unwrap();
        store.track_pattern("topic", "backend").await.unwrap();

        let patterns = store.patterns(None, 2).await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern_data, "devops");
        assert_eq!(patterns[0].frequency, 2);

        let all = store.patterns(Some("topic"), 1).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].pattern_data, "devops");
    }

    #[tokio::test]
    async fn stats_count_all_tables() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store
            .insert_exchange("s1", "q", "a", "2026-01-01T10:00:00Z", None)
            .await
            .unwrap();
        store.track_pattern("topic", "rust").await.unwrap();
        store
            .upsert_embedding(&EmbeddedDoc {
                doc_id: "d1".into(),
                session_id: "s1".into(),
                content: "User: q\nJarvis: a".into(),
                vector: vec![1.0, 0.0],
                created_at: "2026-01-01T10:00:00Z".into(),
            })
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(
            stats,
            MemoryStats {
                total_messages: 2,
                total_sessions: 1,
                total_patterns: 1,
                embedded_chunks: 1,
            }
        );
    }

    #[tokio::test]
    async fn embedding_upsert_replaces_by_doc_id() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        let mut doc = EmbeddedDoc {
            doc_id: "d1".into(),
            session_id: "s1".into(),
            content: "first".into(),
            vector: vec![1.0, 2.0],
            created_at: "2026-01-01T10:00:00Z".into(),
        };
        store.upsert_embedding(&doc).await.unwrap();

        doc.content = "second".into();
        doc.vector = vec![3.0, 4.0];
        store.upsert_embedding(&doc).await.unwrap();

        let docs = store.all_embeddings(None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "second");
        assert_eq!(docs[0].vector, vec![3.0, 4.0]);
    }

    #[tokio::test]
    async fn embeddings_filter_by_session() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        for (doc_id, session) in [("d1", "s1"), ("d2", "s2")] {
            store
                .upsert_embedding(&EmbeddedDoc {
                    doc_id: doc_id.into(),
                    session_id: session.into(),
                    content: "x".into(),
                    vector: vec![1.0],
                    created_at: "2026-01-01T10:00:00Z".into(),
                })
                .await
                .unwrap();
        }

        let filtered = store.all_embeddings(Some("s2")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].doc_id, "d2");
    }

    #[tokio::test]
    async fn latest_summary_returns_newest() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        assert_eq!(store.latest_summary("s1").await.unwrap(), None);

        store.store_summary("s1", "first").await.unwrap();
        store.store_summary("s1", "second").await.unwrap();

        assert_eq!(
            store.latest_summary("s1").await.unwrap(),
            Some("second".to_string())
        );
    }
}
