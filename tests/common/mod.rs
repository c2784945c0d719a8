//! Shared fixtures for integration tests.
//!
//! [`FakeBackend`] is an in-process stand-in for the Taskdeck server that
//! plugs in below the middleware chain as an [`HttpTransport`], so the whole
//! pipeline (bearer attachment, 401 invalidation, status mapping) runs for
//! real while the dataset stays under test control.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::Method;
use parking_lot::Mutex;
use serde_json::{json, Value};
use taskdeck::client::{HttpRequest, HttpResponse, HttpTransport};
use taskdeck::store::{CredentialStore, InMemoryCredentialStore, StorageError};
use taskdeck::{ClientConfig, Core, CoreBuilder};

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "secret1";
pub const TOKEN: &str = "tok1";

pub fn user_u1() -> Value {
    json!({"id": "u1", "name": "A", "email": EMAIL, "created_at": "2024-01-01T00:00:00"})
}

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct State {
    tasks: Vec<Value>,
    next_id: u32,
    tokens: HashSet<String>,
    users: Vec<Value>,
    profile_name: Option<String>,
    fail_next: Option<u16>,
    seen: Vec<Seen>,
}

/// In-memory Taskdeck server.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

fn reply(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string().into_bytes())
}

fn detail(status: u16, message: &str) -> HttpResponse {
    reply(status, json!({ "detail": message }))
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.state.lock().users.push(user_u1());
        Arc::new(backend)
    }

    /// Every token issued so far stops being accepted.
    pub fn revoke_tokens(&self) {
        self.state.lock().tokens.clear();
    }

    /// Accept `token` as if it had been issued earlier.
    pub fn accept_token(&self, token: &str) {
        self.state.lock().tokens.insert(token.to_string());
    }

    /// The next request is answered with `status` and a generic detail.
    pub fn fail_next(&self, status: u16) {
        self.state.lock().fail_next = Some(status);
    }

    /// Rename the profile returned by `/api/user/profile`.
    pub fn rename_user(&self, name: &str) {
        self.state.lock().profile_name = Some(name.to_string());
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.state.lock().seen.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().seen.len()
    }

    fn route(&self, request: &HttpRequest) -> HttpResponse {
        let mut state = self.state.lock();
        state.seen.push(Seen {
            method: request.method.clone(),
            path: request.url.path().to_string(),
            query: request.url.query().map(str::to_string),
            authorization: request.get_header(&AUTHORIZATION).map(str::to_string),
        });
        if let Some(status) = state.fail_next.take() {
            return detail(status, "Injected failure");
        }

        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let segments: Vec<&str> = request.url.path().trim_start_matches('/').split('/').collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("POST", ["api", "auth", "login"]) => {
                if body["email"] == EMAIL && body["password"] == PASSWORD {
                    state.tokens.insert(TOKEN.to_string());
                    reply(
                        200,
                        json!({"access_token": TOKEN, "token_type": "bearer", "user": user_u1()}),
                    )
                } else {
                    detail(401, "Invalid email or password")
                }
            },
            ("POST", ["api", "auth", "signup"]) => {
                let email = body["email"].as_str().unwrap_or_default().to_string();
                if state.users.iter().any(|u| u["email"] == email.as_str()) {
                    return detail(400, "Email already registered");
                }
                let id = format!("u{}", state.users.len() + 1);
                let user = json!({
                    "id": id,
                    "name": body["name"],
                    "email": email,
                    "created_at": "2024-02-01T00:00:00"
                });
                state.users.push(user.clone());
                let token = format!("tok-{id}");
                state.tokens.insert(token.clone());
                reply(201, json!({"access_token": token, "token_type": "bearer", "user": user}))
            },
            (_, ["api", ..]) => {
                let authorized = request
                    .get_header(&AUTHORIZATION)
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .is_some_and(|t| state.tokens.contains(t));
                if !authorized {
                    return detail(401, "Could not validate credentials");
                }
                Self::authorized_route(&mut state, request, &segments, body)
            },
            _ => detail(404, "Not Found"),
        }
    }

    fn authorized_route(
        state: &mut State,
        request: &HttpRequest,
        segments: &[&str],
        body: Value,
    ) -> HttpResponse {
        match (request.method.as_str(), segments) {
            ("GET", ["api", "user", "profile"]) => {
                let mut user = user_u1();
                if let Some(name) = &state.profile_name {
                    user["name"] = json!(name);
                }
                reply(200, user)
            },
            ("GET", ["api", "todos"]) => {
                let status = request
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "status")
                    .map(|(_, v)| v.into_owned());
                let tasks: Vec<Value> = state
                    .tasks
                    .iter()
                    .filter(|t| status.as_deref().map_or(true, |s| t["status"] == s))
                    .cloned()
                    .collect();
                reply(200, Value::Array(tasks))
            },
            ("POST", ["api", "todos"]) => {
                state.next_id += 1;
                let task = json!({
                    "id": format!("t{}", state.next_id),
                    "title": body["title"],
                    "description": body["description"],
                    "status": "pending",
                    "created_at": "2024-03-01T12:00:00",
                    "updated_at": "2024-03-01T12:00:00",
                    "user_id": "u1"
                });
                state.tasks.push(task.clone());
                reply(201, task)
            },
            ("GET", ["api", "todos", "stats", "summary"]) => {
                let total = state.tasks.len();
                let completed = state
                    .tasks
                    .iter()
                    .filter(|t| t["status"] == "completed")
                    .count();
                reply(
                    200,
                    json!({"total": total, "completed": completed, "pending": total - completed}),
                )
            },
            (method, ["api", "todos", id]) => {
                let Some(index) = state.tasks.iter().position(|t| t["id"] == *id) else {
                    return detail(404, "Todo not found");
                };
                match method {
                    "GET" => reply(200, state.tasks[index].clone()),
                    "PUT" => {
                        let task = &mut state.tasks[index];
                        for field in ["title", "description", "status"] {
                            if let Some(value) = body.get(field) {
                                task[field] = value.clone();
                            }
                        }
                        reply(200, task.clone())
                    },
                    "DELETE" => {
                        state.tasks.remove(index);
                        HttpResponse::new(204, Vec::new())
                    },
                    _ => detail(405, "Method Not Allowed"),
                }
            },
            _ => detail(404, "Not Found"),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeBackend {
    async fn send(&self, request: HttpRequest) -> taskdeck::Result<HttpResponse> {
        Ok(self.route(&request))
    }
}

/// A core talking to `backend` with an in-memory store.
pub fn core_with(backend: Arc<FakeBackend>) -> (Core, Arc<InMemoryCredentialStore>) {
    let store = Arc::new(InMemoryCredentialStore::new());
    let core = CoreBuilder::new(ClientConfig::default())
        .with_store(store.clone())
        .with_transport(backend)
        .build()
        .unwrap();
    (core, store)
}

/// A core that has already logged in as `u1`.
pub async fn logged_in(backend: Arc<FakeBackend>) -> (Core, Arc<InMemoryCredentialStore>) {
    let (core, store) = core_with(backend);
    core.session.init().await;
    let outcome = core.session.login(EMAIL, PASSWORD).await;
    assert!(outcome.is_success(), "{outcome:?}");
    (core, store)
}

/// Which operations of [`FailingStore`] fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub get: bool,
    pub set: bool,
    pub remove: bool,
}

/// In-memory store with injectable failures.
#[derive(Default)]
pub struct FailingStore {
    pub inner: InMemoryCredentialStore,
    pub failures: Mutex<Failures>,
}

impl FailingStore {
    pub fn new(failures: Failures) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryCredentialStore::new(),
            failures: Mutex::new(failures),
        })
    }

    fn broken(what: &str) -> StorageError {
        StorageError::Backend {
            message: format!("{what} unavailable"),
            source: None,
        }
    }
}

#[async_trait]
impl CredentialStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.failures.lock().get {
            return Err(Self::broken("read"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failures.lock().set {
            return Err(Self::broken("write"));
        }
        self.inner.set(key, value).await
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        if self.failures.lock().remove {
            return Err(Self::broken("remove"));
        }
        self.inner.remove_all(keys).await
    }
}
