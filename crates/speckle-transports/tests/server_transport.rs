//! ServerTransport against an in-process mock of the Speckle object API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Form, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use speckle_transports::{
    MemoryTransport, ServerTransport, ServerTransportConfig, Transport, TransportError,
};
use speckle_types::ObjectId;

#[derive(Default)]
struct MockState {
    objects: HashMap<String, String>,
    auth_headers: Vec<String>,
    upload_attempts: usize,
    uploads_accepted: usize,
    failures_remaining: usize,
}

type Shared = Arc<Mutex<MockState>>;

async fn upload(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(_stream): Path<String>,
    mut multipart: Multipart,
) -> StatusCode {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if let Ok(text) = field.text().await {
            parts.push(text);
        }
    }

    let mut state = state.lock().unwrap();
    state.upload_attempts += 1;
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        state.auth_headers.push(auth.to_string());
    }
    if state.failures_remaining > 0 {
        state.failures_remaining -= 1;
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    for part in parts {
        let batch: Vec<serde_json::Value> = serde_json::from_str(&part).unwrap();
        for object in batch {
            let id = object["id"].as_str().unwrap().to_string();
            state.objects.insert(id, object.to_string());
        }
    }
    state.uploads_accepted += 1;
    StatusCode::CREATED
}

async fn download(
    State(state): State<Shared>,
    Path((_stream, id)): Path<(String, String)>,
) -> Result<String, StatusCode> {
    let state = state.lock().unwrap();
    let root = state.objects.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let mut body = format!("{id}\t{root}\n");
    let parsed: serde_json::Value = serde_json::from_str(root).unwrap();
    if let Some(closure) = parsed.get("__closure").and_then(|c| c.as_object()) {
        for child in closure.keys() {
            if let Some(object) = state.objects.get(child) {
                body.push_str(&format!("{child}\t{object}\n"));
            }
        }
    }
    Ok(body)
}

async fn single(
    State(state): State<Shared>,
    Path((_stream, id)): Path<(String, String)>,
) -> Result<String, StatusCode> {
    let state = state.lock().unwrap();
    state.objects.get(&id).cloned().ok_or(StatusCode::NOT_FOUND)
}

async fn diff(
    State(state): State<Shared>,
    Path(_stream): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> String {
    let ids: Vec<String> = serde_json::from_str(&form["objects"]).unwrap();
    let state = state.lock().unwrap();
    let answer: HashMap<String, bool> = ids
        .into_iter()
        .map(|id| {
            let present = state.objects.contains_key(&id);
            (id, present)
        })
        .collect();
    serde_json::to_string(&answer).unwrap()
}

fn spawn_server(state: Shared) -> SocketAddr {
    let app = Router::new()
        .route("/objects/:stream", post(upload))
        .route("/objects/:stream/:id", get(download))
        .route("/objects/:stream/:id/single", get(single))
        .route("/api/diff/:stream", post(diff))
        .with_state(state);

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

fn setup(failures: usize) -> (Shared, ServerTransportConfig) {
    let state: Shared = Arc::new(Mutex::new(MockState {
        failures_remaining: failures,
        ..Default::default()
    }));
    let addr = spawn_server(Arc::clone(&state));
    let mut config = ServerTransportConfig::new(format!("http://{addr}"), "stream1").with_token("secret");
    config.initial_backoff_ms = 1;
    config.max_backoff_ms = 5;
    (state, config)
}

fn id(byte: u8) -> ObjectId {
    ObjectId::from_digest([byte; 16])
}

fn sample_records() -> (ObjectId, String, ObjectId, String) {
    let child = id(2);
    let child_json = format!(r#"{{"id":"{child}","speckle_type":"Base","x":1}}"#);
    let root = id(1);
    let root_json = format!(
        r#"{{"id":"{root}","speckle_type":"Base","child":{{"referencedId":"{child}","speckle_type":"reference"}},"__closure":{{"{child}":1}}}}"#
    );
    (root, root_json, child, child_json)
}

fn send(transport: &ServerTransport) -> (ObjectId, ObjectId) {
    let (root, root_json, child, child_json) = sample_records();
    transport.begin_write().unwrap();
    transport.save(&child, &child_json).unwrap();
    transport.save(&root, &root_json).unwrap();
    transport.end_write().unwrap();
    (root, child)
}

#[test]
fn upload_then_download_closure() {
    let (state, config) = setup(0);
    let transport = ServerTransport::new(config).unwrap();
    let (root, child) = send(&transport);

    {
        let state = state.lock().unwrap();
        assert_eq!(state.objects.len(), 2);
        assert!(state.auth_headers.iter().all(|h| h == "Bearer secret"));
    }
    assert_eq!(transport.saved_count(), 2);

    let local = MemoryTransport::new();
    let root_json = transport.copy_object_and_children(&root, &local).unwrap();
    assert!(root_json.contains("__closure"));
    assert_eq!(local.len(), 2);
    assert!(local.get(&child).unwrap().is_some());
}

#[test]
fn has_uses_diff_endpoint() {
    let (_state, config) = setup(0);
    let transport = ServerTransport::new(config).unwrap();
    let (root, child) = send(&transport);

    let found = transport.has(&[root, child, id(9)]).unwrap();
    assert!(found[&root]);
    assert!(found[&child]);
    assert!(!found[&id(9)]);
}

#[test]
fn get_single_object() {
    let (_state, config) = setup(0);
    let transport = ServerTransport::new(config).unwrap();
    let (_, child) = send(&transport);

    let json = transport.get(&child).unwrap().unwrap();
    assert!(json.contains("\"x\":1"));
    assert!(transport.get(&id(9)).unwrap().is_none());
}

#[test]
fn already_present_objects_are_not_uploaded_again() {
    let (state, config) = setup(0);
    let transport = ServerTransport::new(config).unwrap();
    send(&transport);
    send(&transport);
    assert_eq!(state.lock().unwrap().uploads_accepted, 1);
}

#[test]
fn transient_failures_are_retried() {
    let (state, mut config) = setup(2);
    config.max_retries = 3;
    let transport = ServerTransport::new(config).unwrap();
    send(&transport);

    let state = state.lock().unwrap();
    assert_eq!(state.upload_attempts, 3);
    assert_eq!(state.objects.len(), 2);
}

#[test]
fn gives_up_after_max_retries() {
    let (state, mut config) = setup(5);
    config.max_retries = 1;
    let transport = ServerTransport::new(config).unwrap();
    let (root, root_json, _, _) = sample_records();
    transport.begin_write().unwrap();
    transport.save(&root, &root_json).unwrap();
    let err = transport.end_write().unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 503, .. }));
    assert_eq!(state.lock().unwrap().upload_attempts, 2);
}

#[test]
fn missing_root_is_an_error() {
    let (_state, config) = setup(0);
    let transport = ServerTransport::new(config).unwrap();
    let err = transport
        .copy_object_and_children(&id(7), &MemoryTransport::new())
        .unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 404, .. }));
}
