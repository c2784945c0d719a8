//! HTTP pipeline against a mock server: wire contract, credential
//! attachment, invalidation on 401, middleware ordering and transport
//! failures.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{EMAIL, PASSWORD};
use mockito::{Matcher, Server, ServerGuard};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use taskdeck::client::{HttpMiddleware, HttpMiddlewareContext, HttpRequest, HttpResponse};
use taskdeck::store::{CredentialStore, InMemoryCredentialStore, PROFILE_KEY, TOKEN_KEY};
use taskdeck::{
    ClientConfig, Core, CoreBuilder, Error, SessionState, TaskFilter, TaskStatus, TaskUpdate,
};

const TASK_JSON: &str = r#"{"id":"t1","title":"Buy milk","description":"","status":"pending","created_at":"2024-01-01T00:00:00"}"#;

fn core_for(server: &ServerGuard, store: Arc<InMemoryCredentialStore>) -> Core {
    CoreBuilder::new(ClientConfig::new().with_base_url(server.url()))
        .with_store(store)
        .with_http_logging(true)
        .build()
        .unwrap()
}

async fn seeded_store() -> Arc<InMemoryCredentialStore> {
    let store = Arc::new(InMemoryCredentialStore::new());
    store.set(TOKEN_KEY, "tok1").await.unwrap();
    store
        .set(PROFILE_KEY, &common::user_u1().to_string())
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn login_posts_credentials_and_stores_response() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/auth/login")
        .match_header("content-type", "application/json")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"email": EMAIL, "password": PASSWORD})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"access_token": "tok1", "token_type": "bearer", "user": common::user_u1()})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(InMemoryCredentialStore::new());
    let core = core_for(&server, store.clone());
    core.session.init().await;
    assert!(core.session.login(EMAIL, PASSWORD).await.is_success());

    mock.assert_async().await;
    assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("tok1"));
    assert_eq!(core.session.state(), SessionState::LoggedIn);
    assert_eq!(core.session.user().map(|u| u.id), Some("u1".to_string()));
}

#[tokio::test]
async fn stored_token_is_sent_as_bearer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/todos/stats/summary")
        .match_header("authorization", "Bearer tok1")
        .with_status(200)
        .with_body(r#"{"total":3,"completed":1,"pending":2,"completion_rate":33.3}"#)
        .create_async()
        .await;

    let core = core_for(&server, seeded_store().await);
    let stats = core.tasks.stats().await.unwrap();

    mock.assert_async().await;
    assert_eq!((stats.total, stats.completed, stats.pending), (3, 1, 2));
    assert_eq!(stats.completion_rate, Some(33.3));
}

#[tokio::test]
async fn all_filter_sends_no_status_parameter() {
    let mut server = Server::new_async().await;
    let all = server
        .mock("GET", "/api/todos")
        .with_status(200)
        .with_body(format!("[{TASK_JSON}]"))
        .expect(1)
        .create_async()
        .await;
    let pending = server
        .mock("GET", "/api/todos")
        .match_query(Matcher::UrlEncoded("status".into(), "pending".into()))
        .with_status(200)
        .with_body(format!("[{TASK_JSON}]"))
        .expect(1)
        .create_async()
        .await;

    let core = core_for(&server, seeded_store().await);
    assert_eq!(core.tasks.list(TaskFilter::All).await.unwrap().len(), 1);
    assert_eq!(core.tasks.list(TaskFilter::Pending).await.unwrap().len(), 1);

    all.assert_async().await;
    pending.assert_async().await;
}

#[tokio::test]
async fn create_sends_title_and_description() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/todos")
        .match_header("authorization", "Bearer tok1")
        .match_body(Matcher::Json(json!({"title": "Buy milk", "description": ""})))
        .with_status(201)
        .with_body(TASK_JSON)
        .create_async()
        .await;

    let core = core_for(&server, seeded_store().await);
    let task = core.tasks.create("Buy milk", "").await.unwrap();

    mock.assert_async().await;
    assert_eq!(task.id, "t1");
}

#[tokio::test]
async fn update_sends_only_set_fields() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/api/todos/t1")
        .match_body(Matcher::Json(json!({"status": "completed"})))
        .with_status(200)
        .with_body(TASK_JSON.replace("pending", "completed"))
        .create_async()
        .await;

    let core = core_for(&server, seeded_store().await);
    let task = core
        .tasks
        .update("t1", &TaskUpdate::new().status(TaskStatus::Completed))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(task.is_completed());
}

#[tokio::test]
async fn task_ids_are_path_encoded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/api/todos/a%2Fb")
        .with_status(204)
        .create_async()
        .await;

    let core = core_for(&server, seeded_store().await);
    core.tasks.delete("a/b").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn unauthorized_from_any_operation_clears_store() {
    let mut server = Server::new_async().await;
    let mut mocks = Vec::new();
    for method in ["GET", "POST", "PUT", "DELETE"] {
        let mock = server
            .mock(method, Matcher::Any)
            .with_status(401)
            .with_body(r#"{"detail":"Could not validate credentials"}"#)
            .create_async()
            .await;
        mocks.push(mock);
    }

    for operation in 0..7 {
        let store = seeded_store().await;
        let core = core_for(&server, store.clone());
        core.session.init().await;
        assert!(core.session.is_authenticated());

        let result = match operation {
            0 => core.tasks.list(TaskFilter::All).await.map(|_| ()),
            1 => core.tasks.get("t1").await.map(|_| ()),
            2 => core.tasks.create("Buy milk", "").await.map(|_| ()),
            3 => core
                .tasks
                .update("t1", &TaskUpdate::new().title("x"))
                .await
                .map(|_| ()),
            4 => core.tasks.delete("t1").await,
            5 => core.tasks.stats().await.map(|_| ()),
            _ => core.session.refresh_profile().await.map(|_| ()),
        };

        let err = result.unwrap_err();
        assert!(err.is_unauthorized(), "operation {operation}: {err:?}");
        assert!(store.is_empty(), "operation {operation} left credentials");
        assert_eq!(core.session.state(), SessionState::LoggedOut);
    }
}

#[tokio::test]
async fn server_error_is_http_error_and_keeps_credentials() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/todos")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let store = seeded_store().await;
    let core = core_for(&server, store.clone());
    let err = core.tasks.list(TaskFilter::All).await.unwrap_err();

    assert!(matches!(err, Error::Http { status: 500, ref body } if body == "Internal Server Error"));
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn malformed_success_body_is_decode_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/todos/t1")
        .with_status(200)
        .with_body(r#"{"id":"t1"}"#)
        .create_async()
        .await;

    let core = core_for(&server, seeded_store().await);
    let err = core.tasks.get("t1").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn configured_headers_are_sent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/todos")
        .match_header("x-client", "taskdeck-tests")
        .match_header("user-agent", Matcher::Regex("^taskdeck/".into()))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let core = CoreBuilder::new(
        ClientConfig::new()
            .with_base_url(server.url())
            .with_header("x-client", "taskdeck-tests"),
    )
    .with_store(seeded_store().await)
    .build()
    .unwrap();
    core.tasks.list(TaskFilter::All).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn request_times_out() {
    // Connections are queued by the kernel but never answered.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let store = seeded_store().await;
    let core = CoreBuilder::new(
        ClientConfig::new()
            .with_base_url(format!("http://{addr}"))
            .with_timeout_ms(200),
    )
    .with_store(store.clone())
    .build()
    .unwrap();

    let started = Instant::now();
    let err = core.tasks.list(TaskFilter::All).await.unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(store.len(), 2);
    drop(listener);
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = seeded_store().await;
    let core = CoreBuilder::new(ClientConfig::new().with_base_url(format!("http://{addr}")))
        .with_store(store.clone())
        .build()
        .unwrap();

    let err = core.tasks.stats().await.unwrap_err();
    assert!(matches!(err, Error::Network { timed_out: false, .. }));
    assert_eq!(store.len(), 2);
}

/// Records what it observed at each hook.
#[derive(Default)]
struct Probe {
    saw_authorization: Mutex<Option<bool>>,
    token_present_at_response: Mutex<Option<bool>>,
    errors: Mutex<Vec<String>>,
    store: Option<Arc<InMemoryCredentialStore>>,
}

#[async_trait]
impl HttpMiddleware for Probe {
    async fn on_request(
        &self,
        request: &mut HttpRequest,
        _context: &HttpMiddlewareContext,
    ) -> taskdeck::Result<()> {
        *self.saw_authorization.lock() = Some(request.has_header(&http::header::AUTHORIZATION));
        Ok(())
    }

    async fn on_response(
        &self,
        _response: &mut HttpResponse,
        _context: &HttpMiddlewareContext,
    ) -> taskdeck::Result<()> {
        if let Some(store) = &self.store {
            let present = store.get(TOKEN_KEY).await.unwrap().is_some();
            *self.token_present_at_response.lock() = Some(present);
        }
        Ok(())
    }

    async fn on_error(
        &self,
        error: &Error,
        _context: &HttpMiddlewareContext,
    ) -> taskdeck::Result<()> {
        self.errors.lock().push(error.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn custom_middleware_runs_between_bearer_and_invalidation() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/todos")
        .with_status(401)
        .with_body(r#"{"detail":"expired"}"#)
        .create_async()
        .await;

    let store = seeded_store().await;
    let probe = Arc::new(Probe {
        store: Some(store.clone()),
        ..Probe::default()
    });
    let core = CoreBuilder::new(ClientConfig::new().with_base_url(server.url()))
        .with_store(store.clone())
        .with_middleware(probe.clone())
        .build()
        .unwrap();

    let err = core.tasks.list(TaskFilter::All).await.unwrap_err();

    assert!(err.is_unauthorized());
    // Default priority 50: requests see the attached token, responses run
    // before the session is torn down.
    assert_eq!(*probe.saw_authorization.lock(), Some(true));
    assert_eq!(*probe.token_present_at_response.lock(), Some(true));
    assert_eq!(probe.errors.lock().len(), 1);
    assert!(store.is_empty());
}

struct FailingResponseHook;

#[async_trait]
impl HttpMiddleware for FailingResponseHook {
    async fn on_response(
        &self,
        _response: &mut HttpResponse,
        _context: &HttpMiddlewareContext,
    ) -> taskdeck::Result<()> {
        Err(Error::Middleware("response hook failed".to_string()))
    }
}

#[tokio::test]
async fn failing_response_hook_cannot_block_invalidation() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/todos")
        .with_status(401)
        .with_body(r#"{"detail":"expired"}"#)
        .create_async()
        .await;

    let store = seeded_store().await;
    let core = CoreBuilder::new(ClientConfig::new().with_base_url(server.url()))
        .with_store(store.clone())
        .with_middleware(Arc::new(FailingResponseHook))
        .build()
        .unwrap();
    assert_eq!(core.session.init().await, SessionState::LoggedIn);

    let err = core.tasks.list(TaskFilter::All).await.unwrap_err();

    assert!(err.is_unauthorized(), "{err:?}");
    assert!(store.is_empty());
    assert_eq!(core.session.state(), SessionState::LoggedOut);
}

struct RejectAll;

#[async_trait]
impl HttpMiddleware for RejectAll {
    async fn on_request(
        &self,
        _request: &mut HttpRequest,
        _context: &HttpMiddlewareContext,
    ) -> taskdeck::Result<()> {
        Err(Error::Middleware("offline mode".to_string()))
    }
}

#[tokio::test]
async fn request_middleware_can_veto_dispatch() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let core = CoreBuilder::new(ClientConfig::new().with_base_url(server.url()))
        .with_store(seeded_store().await)
        .with_middleware(Arc::new(RejectAll))
        .build()
        .unwrap();

    let err = core.tasks.stats().await.unwrap_err();
    assert!(matches!(err, Error::Middleware(_)));
    mock.assert_async().await;
}
