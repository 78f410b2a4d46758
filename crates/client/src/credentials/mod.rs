//! Domain-scoped credential storage with per-entry expiry.
//!
//! This plays the role a browser cookie jar plays for a web client: tokens and
//! the cached profile live here, each with its own lifetime, and everything
//! for a domain can be dropped at once on logout.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use tenantdesk_auth::TtlDays;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;

/// Key of the short-lived bearer token.
pub const ACCESS_TOKEN: &str = "accessToken";
/// Key of the long-lived token used to mint new access tokens.
pub const REFRESH_TOKEN: &str = "refreshToken";
/// Key of the cached login profile (JSON).
pub const USER_INFO: &str = "userInfo";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("credential backend error: {0}")]
    Backend(String),

    #[error("stored entry '{key}' is unreadable: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("lifetime of entry '{key}' is out of range")]
    TtlOutOfRange { key: String },
}

impl StoreError {
    pub(crate) fn backend(err: impl core::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Absolute expiry of `key` written now with `ttl`.
pub(crate) fn expiry_after(key: &str, ttl: TtlDays) -> Result<DateTime<Utc>, StoreError> {
    Duration::try_seconds(ttl.as_seconds())
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| StoreError::TtlOutOfRange { key: key.to_string() })
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Domain all entries of this store are scoped to.
    fn domain(&self) -> &str;

    /// Read a live entry. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write (or overwrite) an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: TtlDays) -> Result<(), StoreError>;

    /// Remove the entry entirely.
    async fn clear(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every entry of this store's domain.
    async fn purge(&self) -> Result<(), StoreError>;
}
