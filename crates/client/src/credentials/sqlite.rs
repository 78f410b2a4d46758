//! Durable credential store (SQLite).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::Mutex;

use tenantdesk_auth::TtlDays;

use super::{expiry_after, CredentialStore, StoreError};

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed credential store.
///
/// The connection is opened lazily on first use; the handle is cheap to clone
/// and clones share the pool.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    domain: String,
    location: Location,
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

impl SqliteCredentialStore {
    /// Store backed by the database file at `path` (created if missing).
    pub fn open(domain: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::with_location(domain.into(), Location::File(path.as_ref().to_path_buf()))
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory(domain: impl Into<String>) -> Self {
        Self::with_location(domain.into(), Location::Memory)
    }

    fn with_location(domain: String, location: Location) -> Self {
        Self {
            domain,
            location,
            pool: Arc::new(Mutex::new(None)),
        }
    }

    async fn pool(&self) -> Result<SqlitePool, StoreError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }
        let pool = self
            .connect()
            .await
            .map_err(|e| StoreError::Backend(format!("{e:#}")))?;
        *guard = Some(pool.clone());
        Ok(pool)
    }

    async fn connect(&self) -> anyhow::Result<SqlitePool> {
        let url = match &self.location {
            Location::Memory => "sqlite::memory:".to_string(),
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create credentials directory at {parent:?}"))?;
                }
                format!("sqlite://{}?mode=rwc", path.to_string_lossy())
            }
        };

        // A single, never-recycled connection: an in-memory database lives and
        // dies with its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&url)
            .await
            .with_context(|| format!("failed to open credential database ({url})"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                domain      TEXT NOT NULL,
                key         TEXT NOT NULL,
                value       TEXT NOT NULL,
                expires_at  TEXT NOT NULL,
                PRIMARY KEY (domain, key)
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create credentials table")?;

        tracing::debug!(domain = %self.domain, "credential store initialized");
        Ok(pool)
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    fn domain(&self) -> &str {
        &self.domain
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let pool = self.pool().await?;
        let row = sqlx::query("SELECT value, expires_at FROM credentials WHERE domain = ?1 AND key = ?2")
            .bind(&self.domain)
            .bind(key)
            .fetch_optional(&pool)
            .await
            .map_err(StoreError::backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row.try_get("value").map_err(StoreError::backend)?;
        let expires_at: String = row.try_get("expires_at").map_err(StoreError::backend)?;
        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            self.clear(key).await?;
            return Ok(None);
        }
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str, ttl: TtlDays) -> Result<(), StoreError> {
        let expires_at = expiry_after(key, ttl)?;
        let pool = self.pool().await?;
        sqlx::query(
            r#"
            INSERT INTO credentials (domain, key, value, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(domain, key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&self.domain)
        .bind(key)
        .bind(value)
        .bind(expires_at.to_rfc3339())
        .execute(&pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM credentials WHERE domain = ?1 AND key = ?2")
            .bind(&self.domain)
            .bind(key)
            .execute(&pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn purge(&self) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM credentials WHERE domain = ?1")
            .bind(&self.domain)
            .execute(&pool)
            .await
            .map_err(StoreError::backend)?;
        tracing::debug!(domain = %self.domain, removed = result.rows_affected(), "credentials purged");
        Ok(())
    }
}
