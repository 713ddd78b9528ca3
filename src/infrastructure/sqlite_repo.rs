use std::{str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow}, Pool, Row, Sqlite};

use crate::domain::{
    clock::{Clock, MonotonicClock, SystemClock},
    repository::TodoRepository,
    todo::{NewTodo, Todo, TodoId, TodoPatch},
};

const COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: Arc<Pool<Sqlite>>,
    clock: Arc<dyn Clock>,
}

impl SqliteTodoRepository {
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_clock(database_url, SystemClock).await
    }

    pub async fn connect_with_clock<C: Clock>(database_url: &str, clock: C) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url {database_url}"))?
            .create_if_missing(true);
        // Every connection to an in-memory database is a separate database,
        // so the pool is pinned to one connection that never expires.
        let pool = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };
        Ok(Self { pool: Arc::new(pool), clock: Arc::new(MonotonicClock::new(clock)) })
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM todos ORDER BY created_at DESC, id DESC"))
            .fetch_all(&*self.pool)
            .await?;
        rows.iter().map(row_to_todo).collect()
    }

    async fn get(&self, id: TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?1"))
            .bind(id.0)
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(row_to_todo).transpose()
    }

    async fn insert(&self, input: NewTodo) -> Result<Todo> {
        let now = self.clock.now();
        let result = sqlx::query(
            "INSERT INTO todos (title, description, completed, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?3)",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(format_timestamp(now))
        .execute(&*self.pool)
        .await?;
        Ok(Todo {
            id: TodoId(result.last_insert_rowid()),
            title: input.title,
            description: input.description,
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<u64> {
        let now = self.clock.now();
        // NULL binds leave the column as it is.
        let result = sqlx::query(
            "UPDATE todos SET
                title = COALESCE(?2, title),
                description = COALESCE(?3, description),
                completed = COALESCE(?4, completed),
                updated_at = ?5
             WHERE id = ?1",
        )
        .bind(id.0)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.completed)
        .bind(format_timestamp(now))
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: TodoId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?1")
            .bind(id.0)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// Fixed width, so lexical order in SQL matches chronological order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("malformed timestamp {raw:?}"))?
        .with_timezone(&Utc))
}

fn row_to_todo(row: &SqliteRow) -> Result<Todo> {
    let description: Option<String> = row.try_get("description")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(Todo {
        id: TodoId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: description.unwrap_or_default(),
        completed: row.try_get("completed")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:shared?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://todos.db"));
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let formatted = format_timestamp(ts);
        assert_eq!(formatted, "2024-05-01T10:00:00.000000Z");
        assert_eq!(parse_timestamp(&formatted).unwrap(), ts);
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
