//! In-process mock of the catalogue backend for integration tests.
//!
//! The mock accepts exactly one access token at a time (`accepted_access`),
//! issues `T{n+1}` on the n-th refresh, and records what the client sent so
//! tests can assert on bearers, query strings and multipart fields.

// Not every test binary uses every helper
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, RawQuery, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use npc_catalog_core::auth::{MemoryTokenStore, TokenStore};
use npc_catalog_core::{ApiClient, Config, SessionStore};

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "secret";

#[derive(Debug)]
pub struct Backend {
    /// The only access token protected routes accept
    pub accepted_access: Option<String>,
    /// The refresh token `/auth/refresh` accepts
    pub refresh_token: String,
    pub refresh_succeeds: bool,
    pub refresh_delay: Duration,
    pub refresh_calls: usize,
    /// Reject every protected request, even with a fresh token
    pub always_unauthorized: bool,
    pub logout_status: StatusCode,
    pub logout_calls: usize,
    pub delete_status: StatusCode,
    /// Bearer tokens seen on protected routes, in arrival order
    pub bearers: Vec<String>,
    pub last_query: Option<String>,
    pub last_body: Option<Value>,
    pub upload_fields: Vec<(String, String)>,
    /// Authorization header of the last preview request
    pub preview_authorization: Option<Option<String>>,
    /// Decoded hash of the last preview request that reached the handler
    pub preview_hash: Option<String>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            accepted_access: None,
            refresh_token: "R1".to_string(),
            refresh_succeeds: true,
            refresh_delay: Duration::ZERO,
            refresh_calls: 0,
            always_unauthorized: false,
            logout_status: StatusCode::OK,
            logout_calls: 0,
            delete_status: StatusCode::OK,
            bearers: Vec::new(),
            last_query: None,
            last_body: None,
            upload_fields: Vec::new(),
            preview_authorization: None,
            preview_hash: None,
        }
    }
}

pub type SharedBackend = Arc<Mutex<Backend>>;

pub struct MockServer {
    pub base_url: String,
    pub backend: SharedBackend,
}

impl MockServer {
    pub fn with<R>(&self, f: impl FnOnce(&mut Backend) -> R) -> R {
        f(&mut self.backend.lock().unwrap())
    }

    /// Client over a fresh in-memory session
    pub fn client(&self) -> ApiClient {
        self.client_with_store(Arc::new(MemoryTokenStore::new()))
    }

    pub fn client_with_store(&self, store: impl TokenStore + 'static) -> ApiClient {
        let config = Config::default().with_api_url(self.base_url.clone());
        let session = Arc::new(SessionStore::new(store));
        ApiClient::new(&config, session).unwrap()
    }

    /// Client that is already logged in as user 1 with T1/R1
    pub async fn logged_in_client(&self) -> ApiClient {
        let client = self.client();
        client.login(EMAIL, PASSWORD).await.unwrap();
        client
    }
}

pub fn user_json() -> Value {
    json!({"id": 1, "username": "a", "email": EMAIL, "isActive": true})
}

pub fn npc_json(id: i64) -> Value {
    json!({
        "id": id,
        "blob": "iVBORw0KGgo=",
        "gender": "male",
        "class": ["warrior"],
        "age": "adult",
        "race": "human",
        "culture": "pyarroni",
        "uploader": user_json(),
        "createdAt": "2021-03-01T10:00:00Z",
        "modifiedAt": "2021-03-01T10:00:00Z",
        "noteCount": 0
    })
}

pub fn note_json(id: i64) -> Value {
    json!({
        "id": id,
        "npc": npc_json(1),
        "name": "Aldric",
        "description": "Blacksmith",
        "isPrivate": false,
        "createdBy": user_json(),
        "modifiedBy": user_json(),
        "hash": "f3a9c0"
    })
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn authorize(backend: &SharedBackend, headers: &HeaderMap) -> Result<(), StatusCode> {
    let mut backend = backend.lock().unwrap();
    let token = bearer(headers);
    if let Some(ref token) = token {
        backend.bearers.push(token.clone());
    }
    if backend.always_unauthorized || token.is_none() || token != backend.accepted_access {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

async fn login(State(backend): State<SharedBackend>, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return Err(StatusCode::FORBIDDEN);
    }
    let mut backend = backend.lock().unwrap();
    backend.accepted_access = Some("T1".to_string());
    backend.refresh_token = "R1".to_string();
    Ok(Json(json!({"access_token": "T1", "refresh_token": "R1", "data": user_json()})))
}

async fn refresh(State(backend): State<SharedBackend>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let (call, delay, accepted) = {
        let mut b = backend.lock().unwrap();
        b.refresh_calls += 1;
        let expected = format!("Refresh {}", b.refresh_token);
        let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        (b.refresh_calls, b.refresh_delay, b.refresh_succeeds && presented == Some(expected.as_str()))
    };

    tokio::time::sleep(delay).await;

    if !accepted {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let token = format!("T{}", call + 1);
    backend.lock().unwrap().accepted_access = Some(token.clone());
    Ok(Json(json!({"access_token": token, "data": user_json()})))
}

async fn logout(State(backend): State<SharedBackend>, headers: HeaderMap) -> StatusCode {
    if let Err(status) = authorize(&backend, &headers) {
        return status;
    }
    let mut backend = backend.lock().unwrap();
    backend.logout_calls += 1;
    backend.logout_status
}

async fn users(State(backend): State<SharedBackend>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    Ok(Json(json!([user_json()])))
}

async fn list_npcs(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    backend.lock().unwrap().last_query = query;
    Ok(Json(json!({"data": [npc_json(1)], "page": 1, "limit": 12, "totalCount": 1})))
}

async fn create_npc(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                fields.push((name, format!("{}:{}", file_name, bytes.len())));
            }
            None => {
                let text = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                fields.push((name, text));
            }
        }
    }
    backend.lock().unwrap().upload_fields = fields;
    Ok(Json(npc_json(2)))
}

async fn update_npc(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    backend.lock().unwrap().last_body = Some(body);
    Ok(Json(npc_json(id)))
}

async fn delete_resource(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> StatusCode {
    if let Err(status) = authorize(&backend, &headers) {
        return status;
    }
    backend.lock().unwrap().delete_status
}

async fn classes(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    backend.lock().unwrap().last_query = query;
    Ok(Json(json!(["mage", "warrior"])))
}

async fn generate_name(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<String, StatusCode> {
    authorize(&backend, &headers)?;
    backend.lock().unwrap().last_query = query;
    Ok("Aldric Vane".to_string())
}

async fn generate_names(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    backend.lock().unwrap().last_query = query;
    Ok(Json(json!(["Aldric", "Bryn", "Cael"])))
}

async fn list_notes(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    backend.lock().unwrap().last_query = query;
    Ok(Json(json!({"data": [note_json(5)], "page": 1, "limit": 12, "totalCount": 30})))
}

async fn create_note(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    backend.lock().unwrap().last_body = Some(body);
    Ok(Json(note_json(6)))
}

async fn update_note(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    backend.lock().unwrap().last_body = Some(body);
    Ok(Json(note_json(id)))
}

async fn preview(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(hash): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    {
        let mut backend = backend.lock().unwrap();
        backend.preview_authorization = Some(authorization);
        backend.preview_hash = Some(hash.clone());
    }
    if hash != "f3a9c0" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({"blob": "AAAA", "name": "Aldric", "description": "Blacksmith"})))
}

fn router(backend: SharedBackend) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", get(refresh))
        .route("/auth/logout", post(logout))
        .route("/users", get(users))
        .route("/npcs", get(list_npcs).post(create_npc))
        .route("/npcs/classes", get(classes))
        .route("/npcs/{id}", put(update_npc).delete(delete_resource))
        .route("/names/generate", get(generate_name))
        .route("/names/generate-list", get(generate_names))
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", put(update_note).delete(delete_resource))
        .route("/preview/{hash}", get(preview))
        .with_state(backend)
}

/// Start the mock backend on an ephemeral local port.
pub async fn spawn() -> MockServer {
    let backend: SharedBackend = Arc::new(Mutex::new(Backend::default()));
    let app = router(Arc::clone(&backend));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: format!("http://{}", addr),
        backend,
    }
}
