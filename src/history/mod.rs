//! Append-only store for search queries, their ranked results, and chat turns.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;
use crate::core::security::Owner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryRecord {
    pub id: i64,
    pub owner_id: String,
    pub query: String,
    pub processed_query: String,
    pub created_at: String,
}

/// One ranked result as handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub content: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSearchResult {
    pub id: i64,
    pub search_query_id: i64,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub content: String,
    pub position: u32,
    /// Reserved; always 0.0.
    pub relevance_score: f64,
    pub created_at: String,
}

impl StoredSearchResult {
    pub fn citation_markdown(&self) -> String {
        format!("[[{}]]({})", self.position, self.url)
    }

    pub fn full_citation(&self) -> String {
        format!("**[{}]** [{}]({})", self.position, self.title, self.url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    #[serde(flatten)]
    pub query: SearchQueryRecord,
    pub results: Vec<StoredSearchResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: i64,
    pub owner_id: String,
    pub user_message: String,
    pub assistant_response: String,
    pub search_query_id: Option<i64>,
    pub created_at: String,
}

/// Write side used by the search pipeline.
#[async_trait]
pub trait SearchRecordStore: Send + Sync {
    async fn create_search_query(
        &self,
        owner: &Owner,
        query: &str,
        processed_query: &str,
    ) -> Result<SearchQueryRecord, ApiError>;

    async fn add_search_results(
        &self,
        search_query_id: i64,
        results: &[NewSearchResult],
    ) -> Result<(), ApiError>;
}

/// Write side used by the conversation layer.
#[async_trait]
pub trait ChatTurnStore: Send + Sync {
    async fn add_chat_turn(
        &self,
        owner: &Owner,
        user_message: &str,
        assistant_response: &str,
        search_query_id: Option<i64>,
    ) -> Result<i64, ApiError>;
}

#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to history db: {}", e)))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS search_queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                query TEXT NOT NULL,
                processed_query TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init search_queries table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS search_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                search_query_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                snippet TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                position INTEGER NOT NULL,
                relevance_score REAL NOT NULL DEFAULT 0.0,
                created_at TEXT NOT NULL,
                UNIQUE(search_query_id, url),
                FOREIGN KEY(search_query_id) REFERENCES search_queries(id) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init search_results table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                user_message TEXT NOT NULL,
                assistant_response TEXT NOT NULL,
                search_query_id INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY(search_query_id) REFERENCES search_queries(id) ON DELETE SET NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init chat_history table: {}", e)))?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_search_queries_owner ON search_queries(owner_id)",
            "CREATE INDEX IF NOT EXISTS idx_search_results_query ON search_results(search_query_id)",
            "CREATE INDEX IF NOT EXISTS idx_chat_history_owner ON chat_history(owner_id)",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to create index: {}", e)))?;
        }

        Ok(())
    }

    pub async fn list_chat_history(&self, owner: &Owner, limit: i64) -> Result<Vec<ChatTurn>, ApiError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_history WHERE owner_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(owner.id())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .into_iter()
            .map(|row| ChatTurn {
                id: row.try_get::<i64, _>("id").unwrap_or_default(),
                owner_id: row.try_get::<String, _>("owner_id").unwrap_or_default(),
                user_message: row.try_get::<String, _>("user_message").unwrap_or_default(),
                assistant_response: row
                    .try_get::<String, _>("assistant_response")
                    .unwrap_or_default(),
                search_query_id: row.try_get::<Option<i64>, _>("search_query_id").unwrap_or(None),
                created_at: row.try_get::<String, _>("created_at").unwrap_or_default(),
            })
            .collect())
    }

    /// Newest queries first, each with its results in rank order.
    pub async fn list_search_history(
        &self,
        owner: &Owner,
        limit: i64,
    ) -> Result<Vec<SearchHistoryEntry>, ApiError> {
        let rows = sqlx::query(
            "SELECT * FROM search_queries WHERE owner_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(owner.id())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let query = query_from_row(&row);
            let results = self.get_search_results(query.id).await?;
            entries.push(SearchHistoryEntry { query, results });
        }
        Ok(entries)
    }

    pub async fn get_search_results(&self, search_query_id: i64) -> Result<Vec<StoredSearchResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT * FROM search_results WHERE search_query_id = ? ORDER BY position ASC",
        )
        .bind(search_query_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .into_iter()
            .map(|row| StoredSearchResult {
                id: row.try_get::<i64, _>("id").unwrap_or_default(),
                search_query_id: row.try_get::<i64, _>("search_query_id").unwrap_or_default(),
                title: row.try_get::<String, _>("title").unwrap_or_default(),
                url: row.try_get::<String, _>("url").unwrap_or_default(),
                snippet: row.try_get::<String, _>("snippet").unwrap_or_default(),
                content: row.try_get::<String, _>("content").unwrap_or_default(),
                position: row.try_get::<i64, _>("position").unwrap_or_default() as u32,
                relevance_score: row.try_get::<f64, _>("relevance_score").unwrap_or_default(),
                created_at: row.try_get::<String, _>("created_at").unwrap_or_default(),
            })
            .collect())
    }

    /// Removes everything the owner created; results go with their queries.
    pub async fn delete_owner(&self, owner: &Owner) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM chat_history WHERE owner_id = ?")
            .bind(owner.id())
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM search_queries WHERE owner_id = ?")
            .bind(owner.id())
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }
}

fn query_from_row(row: &SqliteRow) -> SearchQueryRecord {
    SearchQueryRecord {
        id: row.try_get::<i64, _>("id").unwrap_or_default(),
        owner_id: row.try_get::<String, _>("owner_id").unwrap_or_default(),
        query: row.try_get::<String, _>("query").unwrap_or_default(),
        processed_query: row.try_get::<String, _>("processed_query").unwrap_or_default(),
        created_at: row.try_get::<String, _>("created_at").unwrap_or_default(),
    }
}

#[async_trait]
impl SearchRecordStore for HistoryStore {
    async fn create_search_query(
        &self,
        owner: &Owner,
        query: &str,
        processed_query: &str,
    ) -> Result<SearchQueryRecord, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO search_queries (owner_id, query, processed_query, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(owner.id())
        .bind(query)
        .bind(processed_query)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create search query: {}", e)))?;

        Ok(SearchQueryRecord {
            id: result.last_insert_rowid(),
            owner_id: owner.id().to_string(),
            query: query.to_string(),
            processed_query: processed_query.to_string(),
            created_at: now,
        })
    }

    async fn add_search_results(
        &self,
        search_query_id: i64,
        results: &[NewSearchResult],
    ) -> Result<(), ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for result in results {
            sqlx::query(
                "INSERT OR IGNORE INTO search_results \
                 (search_query_id, title, url, snippet, content, position, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(search_query_id)
            .bind(&result.title)
            .bind(&result.url)
            .bind(&result.snippet)
            .bind(&result.content)
            .bind(result.position as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }
}

#[async_trait]
impl ChatTurnStore for HistoryStore {
    async fn add_chat_turn(
        &self,
        owner: &Owner,
        user_message: &str,
        assistant_response: &str,
        search_query_id: Option<i64>,
    ) -> Result<i64, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO chat_history (owner_id, user_message, assistant_response, search_query_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(owner.id())
        .bind(user_message)
        .bind(assistant_response)
        .bind(search_query_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(result.last_insert_rowid())
    }
}
