//! `tenantdesk-client`
//!
//! **Responsibility:** everything that talks to the backend.
//!
//! - Configuration from the environment
//! - Domain-scoped credential storage (in-memory or SQLite)
//! - The authenticated HTTP client (single retry after a token refresh)
//! - The session controller (login, logout, bootstrap)
//! - Typed endpoint bindings for the access-control and signup APIs
//! - Route gating
//!
//! The composition root creates one [`Session`], wraps it in an
//! [`ApiClient`], and hands both to whoever needs them.

pub mod config;
pub mod credentials;
pub mod dto;
pub mod endpoints;
pub mod error;
pub mod guard;
pub mod http;
pub mod session;

use std::sync::Arc;

pub use config::ClientConfig;
pub use credentials::{CredentialStore, MemoryCredentialStore, SqliteCredentialStore, StoreError};
pub use error::ApiError;
pub use guard::{RouteDecision, RouteGuard};
pub use http::{ApiClient, Method};
pub use session::{LoginOutcome, Session, SessionController, SessionState, SessionStatus};

/// Credential store selected by `config`: SQLite when a database path is set,
/// memory otherwise.
pub fn credential_store(config: &ClientConfig) -> Arc<dyn CredentialStore> {
    match &config.credentials_db {
        Some(path) => Arc::new(SqliteCredentialStore::open(config.cookie_domain.clone(), path)),
        None => Arc::new(MemoryCredentialStore::new(config.cookie_domain.clone())),
    }
}

/// Wire a session, client and controller together from `config`.
pub fn connect(config: &ClientConfig) -> Result<SessionController, ApiError> {
    let session = Arc::new(Session::new(credential_store(config)));
    let client = ApiClient::new(config, session)?;
    Ok(SessionController::new(client))
}
