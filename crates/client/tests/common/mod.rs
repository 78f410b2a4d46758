#![allow(dead_code)]

//! In-process mock backend for black-box client tests.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use tenantdesk_client::{
    ApiClient, ClientConfig, MemoryCredentialStore, Session, SessionController,
};

pub const EMAIL: &str = "ada@acme.io";
pub const PASSWORD: &str = "correct-horse";
pub const FIRST_ACCESS: &str = "access-1";
pub const REFRESH: &str = "refresh-1";
pub const ROTATED_ACCESS: &str = "access-2";
pub const TENANT_HOST: &str = "acme.tenantdesk.io";
pub const ADMIN_HOST: &str = "admin.tenantdesk.io";

pub fn credentials() -> tenantdesk_auth::LoginCredentials {
    tenantdesk_auth::LoginCredentials::new(EMAIL, PASSWORD)
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub origin: Option<String>,
    pub recaptcha: Option<String>,
    pub body: Value,
}

/// Behaviour knobs and call log of the mock backend.
#[derive(Debug)]
pub struct MockBackend {
    valid_access: Mutex<String>,
    pub refresh_calls: AtomicUsize,
    pub protected_calls: AtomicUsize,
    pub login_delay_ms: AtomicU64,
    pub refresh_delay_ms: AtomicU64,
    pub logout_code: AtomicI64,
    /// `refreshTokenExpiry` handed out at login.
    pub refresh_token_expiry: Mutex<String>,
    /// `code` answered by role and permission saves.
    pub save_code: AtomicI64,
    /// HTTP status forced on role and permission saves; 0 leaves them alone.
    pub save_http_status: AtomicU16,
    /// Reject every bearer token on protected endpoints.
    pub reject_all: AtomicBool,
    /// Answer the refresh endpoint with 401.
    pub reject_refresh: AtomicBool,
    pub requests: Mutex<Vec<Recorded>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            valid_access: Mutex::new(FIRST_ACCESS.to_string()),
            refresh_calls: AtomicUsize::new(0),
            protected_calls: AtomicUsize::new(0),
            login_delay_ms: AtomicU64::new(0),
            refresh_delay_ms: AtomicU64::new(50),
            logout_code: AtomicI64::new(200),
            refresh_token_expiry: Mutex::new("604800".to_string()),
            save_code: AtomicI64::new(200),
            save_http_status: AtomicU16::new(0),
            reject_all: AtomicBool::new(false),
            reject_refresh: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    /// Pretend the current access token expired server-side.
    pub fn expire_access_token(&self) {
        *self.valid_access.lock().unwrap() = ROTATED_ACCESS.to_string();
    }

    pub fn recorded(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn record(&self, method: &'static str, path: impl Into<String>, headers: &HeaderMap, body: Value) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(Recorded {
            method,
            path: path.into(),
            origin: header("x-request-origin"),
            recaptcha: header("x-recaptcha-token"),
            body,
        });
    }

    /// Reply to a role or permission save.
    fn save_reply(&self, success: &str) -> Reply {
        let forced = self.save_http_status.load(Ordering::SeqCst);
        if forced != 0 {
            let status = StatusCode::from_u16(forced).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(json!({"code": forced, "message": "Service unavailable"})));
        }
        let code = self.save_code.load(Ordering::SeqCst);
        if code != 200 {
            return ok(json!({"code": code}));
        }
        ok(json!({"code": 200, "message": success}))
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if self.reject_all.load(Ordering::SeqCst) {
            return false;
        }
        let expected = format!("Bearer {}", self.valid_access.lock().unwrap());
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

type Reply = (StatusCode, Json<Value>);

fn unauthorized() -> Reply {
    (StatusCode::UNAUTHORIZED, Json(json!({"code": 401, "message": "Token expired"})))
}

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

async fn login(State(mock): State<Arc<MockBackend>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    mock.record("POST", "/api/users/login", &headers, body.clone());
    let delay = mock.login_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if body["emailId"] != EMAIL || body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "message": "Invalid email or password"})),
        );
    }
    let refresh_expiry = mock.refresh_token_expiry.lock().unwrap().clone();
    ok(json!({
        "code": 200,
        "message": "Login successful",
        "data": {
            "tokens": {
                "accessToken": FIRST_ACCESS,
                "refreshToken": REFRESH,
                "accessTokenExpiry": "300",
                "refreshTokenExpiry": refresh_expiry
            },
            "firstName": "Ada",
            "lastName": "Lovelace",
            "emailId": EMAIL,
            "userType": "admin",
            "permissions": [{"resource": "roles", "actions": ["read", "update"]}]
        }
    }))
}

async fn refresh(State(mock): State<Arc<MockBackend>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    mock.record("POST", "/api/users/refresh-token", &headers, body.clone());
    mock.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(mock.refresh_delay_ms.load(Ordering::SeqCst))).await;

    if mock.reject_refresh.load(Ordering::SeqCst) || body["refreshToken"] != REFRESH {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "message": "Invalid refresh token"})),
        );
    }
    *mock.valid_access.lock().unwrap() = ROTATED_ACCESS.to_string();
    ok(json!({"code": 200, "data": {"accessToken": ROTATED_ACCESS, "accessTokenExpiry": "300"}}))
}

async fn logout(State(mock): State<Arc<MockBackend>>, headers: HeaderMap) -> Reply {
    mock.record("DELETE", "/api/users/logout", &headers, Value::Null);
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    let code = mock.logout_code.load(Ordering::SeqCst);
    let message = if code == 200 { "Logged out" } else { "Logout failed" };
    ok(json!({"code": code, "message": message}))
}

async fn change_password(State(mock): State<Arc<MockBackend>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    mock.record("PUT", "/api/users/changePassword", &headers, body);
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    ok(json!({"code": 200, "message": "Password changed"}))
}

async fn list_permissions(State(mock): State<Arc<MockBackend>>, headers: HeaderMap) -> Reply {
    mock.record("GET", "/api/permissions/list", &headers, Value::Null);
    mock.protected_calls.fetch_add(1, Ordering::SeqCst);
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    ok(json!({
        "code": 200,
        "data": [
            {"id": 1, "resource": "customers", "actions": ["read"]},
            {"id": "5", "resource": "bookings", "actions": ["create", "read", "update", "delete"]},
            {"id": 9, "resource": "staff", "actions": ["read", "update"]}
        ]
    }))
}

async fn update_permissions(State(mock): State<Arc<MockBackend>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    mock.record("PUT", "/api/permissions/update-multiple", &headers, body);
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    mock.save_reply("Permissions updated successfully")
}

async fn get_role(State(mock): State<Arc<MockBackend>>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    mock.record("GET", format!("/api/roles/{id}"), &headers, Value::Null);
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    if id == "list" {
        return ok(json!({"code": 200, "data": [
            {"roleId": "r-1", "role": "Receptionist", "isDeleted": 0},
            {"roleId": "r-2", "role": "Retired", "isDeleted": 1}
        ]}));
    }
    ok(json!({"code": 200, "data": {
        "id": id,
        "role": "Receptionist",
        "description": "Front desk",
        "grants": [{"id": 1, "resource": "customers", "actions": ["read"]}]
    }}))
}

async fn write_role(
    State(mock): State<Arc<MockBackend>>,
    Path(id): Path<String>,
    method: axum::http::Method,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Reply {
    let method = match method.as_str() {
        "PUT" => "PUT",
        "POST" => "POST",
        _ => "DELETE",
    };
    mock.record(method, format!("/api/roles/{id}"), &headers, body.map(|Json(b)| b).unwrap_or(Value::Null));
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    match method {
        "PUT" => mock.save_reply("Role updated successfully"),
        "POST" => mock.save_reply("Role created successfully"),
        _ => ok(json!({"code": 200, "message": "Role deleted"})),
    }
}

async fn signup(State(mock): State<Arc<MockBackend>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    mock.record("POST", "/api/tenants/customer/signup", &headers, body);
    ok(json!({"code": 200, "message": "Signup successful"}))
}

fn router(mock: Arc<MockBackend>) -> Router {
    Router::new()
        .route("/api/users/login", post(login))
        .route("/api/users/refresh-token", post(refresh))
        .route("/api/users/logout", delete(logout))
        .route("/api/users/changePassword", put(change_password))
        .route("/api/permissions/list", get(list_permissions))
        .route("/api/permissions/update-multiple", put(update_permissions))
        .route("/api/roles/:id", get(get_role).put(write_role).post(write_role).delete(write_role))
        .route("/api/tenants/customer/signup", post(signup))
        .with_state(mock)
}

pub struct TestServer {
    pub base_url: String,
    pub mock: Arc<MockBackend>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(MockBackend::default()).await
    }

    pub async fn spawn_with(mock: MockBackend) -> Self {
        let mock = Arc::new(mock);
        let app = router(mock.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            mock,
            handle,
        }
    }

    pub fn config_for(&self, host: &str) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
            .with_origin_host(host)
            .with_admin_domain("admin")
            .with_cookie_domain(host)
    }

    /// Client acting for `host` (e.g. `acme.tenantdesk.io`).
    pub fn client_for(&self, host: &str) -> (Arc<MemoryCredentialStore>, SessionController) {
        self.client_with(self.config_for(host))
    }

    pub fn client_with(&self, config: ClientConfig) -> (Arc<MemoryCredentialStore>, SessionController) {
        let store = Arc::new(MemoryCredentialStore::new(config.cookie_domain.clone()));
        let session = Arc::new(Session::new(store.clone()));
        let client = ApiClient::new(&config, session).expect("client");
        (store, SessionController::new(client))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
