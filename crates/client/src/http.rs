//! Authenticated JSON client.
//!
//! Every request carries `Content-Type: application/json`, the bearer token
//! when one is given, and `x-request-origin` when the origin is a tenant.
//!
//! An authenticated request answered with 401 is retried exactly once, after
//! refreshing the access token:
//!
//! ```text
//! attempt 1 ──401──► refresh (single-flight) ──► attempt 2 ──401──► Auth error
//! ```
//!
//! Refreshes are serialized. A request that hits 401 after another request
//! already rotated its token reuses the rotated token, and one whose stale
//! token matches a refresh that just failed gets that failure back.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use tenantdesk_auth::RefreshedTokens;
use tenantdesk_core::TenantLabel;

use crate::dto::Data;
use crate::endpoints::REFRESH_TOKEN;
use crate::session::{Session, SessionStatus};
use crate::{ApiError, ClientConfig};

pub use reqwest::Method;

pub const ORIGIN_HEADER: &str = "x-request-origin";

#[derive(Debug, Clone)]
struct RefreshRecord {
    /// Access token the refresh replaced.
    stale: String,
    outcome: Result<String, ApiError>,
}

/// Shared, cheaply cloneable API client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tenant: TenantLabel,
    multi_tenant: bool,
    session: Arc<Session>,
    last_refresh: Arc<Mutex<Option<RefreshRecord>>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        let tenant = config.tenant();
        let multi_tenant = config.resolver().is_multi_tenant(&tenant);
        tracing::debug!(tenant = %tenant, multi_tenant, base_url = %config.base_url, "api client ready");

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tenant,
            multi_tenant,
            session,
            last_refresh: Arc::new(Mutex::new(None)),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn tenant(&self) -> &TenantLabel {
        &self.tenant
    }

    /// Whether requests are tenant-scoped (false on the administrative origin).
    pub fn is_multi_tenant(&self) -> bool {
        self.multi_tenant
    }

    /// Issue a request and decode the JSON body into `T`.
    ///
    /// Only requests that carry a `token` take part in the refresh-and-retry
    /// protocol.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let Some(token) = token else {
            return self.send(&method, path, None, body, headers, 1).await;
        };

        match self.send(&method, path, Some(token), body, headers, 1).await {
            Err(err) if err.is_unauthorized() => {}
            other => return other,
        }

        let fresh = self.refreshed_token(token).await?;
        match self.send(&method, path, Some(&fresh), body, headers, 2).await {
            Err(err) if err.is_unauthorized() => {
                tracing::warn!(%method, path, "request still unauthorized after token refresh");
                Err(ApiError::Auth(format!(
                    "{method} {path} was rejected after refreshing the session"
                )))
            }
            other => other,
        }
    }

    /// Request with the session's current access token.
    pub async fn authed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let token = self
            .session
            .access_token()
            .ok_or_else(|| ApiError::Auth("not signed in".to_string()))?;
        self.request(method, path, Some(&token), body, &[]).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, ApiError> {
        self.request(Method::GET, path, token, None, &[]).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, token, body, &[]).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, token, body, &[]).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, token, body, &[]).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        self.request(Method::PATCH, path, token, body, &[]).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
        headers: &[(&str, &str)],
        attempt: u8,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if self.multi_tenant {
            req = req.header(ORIGIN_HEADER, self.tenant.as_str());
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(%method, path, attempt, error = %e, "request failed");
            ApiError::from_transport(e)
        })?;
        let status = resp.status().as_u16();
        tracing::debug!(%method, path, status, attempt, "api response");

        let bytes = resp.bytes().await.map_err(ApiError::from_transport)?;
        if !(200..300).contains(&status) {
            return Err(ApiError::from_response(status, &bytes));
        }

        let raw: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(raw).map_err(|e| ApiError::unexpected_shape(status, e))
    }

    /// Access token to retry with after `stale` was rejected.
    async fn refreshed_token(&self, stale: &str) -> Result<String, ApiError> {
        let mut last = self.last_refresh.lock().await;

        if let Some(record) = last.as_ref().filter(|r| r.stale == stale) {
            tracing::debug!("reusing result of concurrent token refresh");
            return record.outcome.clone();
        }
        if let Some(current) = self.session.access_token().filter(|t| t != stale) {
            return Ok(current);
        }

        let outcome = self.refresh().await;
        *last = Some(RefreshRecord {
            stale: stale.to_string(),
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn refresh(&self) -> Result<String, ApiError> {
        let epoch = self.session.epoch();
        let Some(refresh_token) = self.session.refresh_token().await? else {
            tracing::info!("access token rejected and no refresh token is stored");
            self.session.end(epoch, false).await?;
            return Err(ApiError::Auth("no refresh token available".to_string()));
        };

        self.session.mark(SessionStatus::Refreshing, epoch);
        tracing::info!("refreshing access token");

        let body = json!({ "refreshToken": refresh_token });
        let response = self
            .send::<Data<RefreshedTokens>>(&Method::POST, REFRESH_TOKEN, None, Some(&body), &[], 1)
            .await
            .and_then(|d| {
                d.data
                    .validate()
                    .map_err(|e| ApiError::unexpected_shape(200, e))?;
                Ok(d.data)
            });

        match response {
            Ok(tokens) => {
                if !self.session.apply_refresh(&tokens, epoch).await? {
                    return Err(ApiError::Auth("session ended while refreshing".to_string()));
                }
                tracing::info!(rotated = tokens.rotated().is_some(), "access token refreshed");
                Ok(tokens.access_token)
            }
            Err(ApiError::Network(reason)) => {
                tracing::warn!(%reason, "token refresh unreachable; keeping stored refresh token");
                self.session.end(epoch, false).await?;
                Err(ApiError::Network(reason))
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh token rejected; clearing session");
                self.session.end(epoch, true).await?;
                Err(ApiError::Auth(format!("session expired: {}", err.user_message())))
            }
        }
    }
}
