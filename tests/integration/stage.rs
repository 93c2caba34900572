//! HTTP stage client against a local mock of the stage's command API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use relief_devices::stage::{HttpStage, MotionStage, MoveTarget, StageError};

/// What the session handshake hands back as the session token.
const SESSION_TOKEN: &str = "session-0001";

#[derive(Clone, Default)]
struct MockStage {
    /// (token, code) pairs received at /execute_code, in order.
    codes: Arc<Mutex<Vec<(String, String)>>>,
    polls: Arc<AtomicUsize>,
    reject_codes: Arc<AtomicBool>,
}

#[derive(Deserialize)]
struct TokenForm {
    #[allow(dead_code)]
    token: String,
}

#[derive(Deserialize)]
struct ExecForm {
    token: String,
    code: String,
}

async fn connect(Form(_): Form<TokenForm>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "token": SESSION_TOKEN }))
}

async fn execute_code(State(mock): State<MockStage>, Form(form): Form<ExecForm>) -> StatusCode {
    mock.codes.lock().unwrap().push((form.token, form.code));
    if mock.reject_codes.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn status(
    State(mock): State<MockStage>,
    Query(_): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    mock.polls.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({ "status": "IDLE" }))
}

async fn spawn_mock(mock: MockStage) -> SocketAddr {
    let app = Router::new()
        .route("/connect", post(connect))
        .route("/execute_code", post(execute_code))
        .route("/status", get(status))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn received_codes(mock: &MockStage) -> Vec<String> {
    mock.codes.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
}

#[tokio::test]
async fn handshake_swaps_the_shared_secret_for_a_session_token() {
    let mock = MockStage::default();
    let addr = spawn_mock(mock.clone()).await;

    let mut stage = HttpStage::new(&format!("http://{addr}"), "shared-secret");
    stage.connect().await.unwrap();
    stage.home().await.unwrap();
    stage.close();

    // Every command after the handshake carries the issued session token.
    let codes = mock.codes.lock().unwrap();
    assert!(!codes.is_empty());
    for (token, _) in codes.iter() {
        assert_eq!(token, SESSION_TOKEN);
    }
}

#[tokio::test]
async fn home_sends_the_setup_sequence() {
    let mock = MockStage::default();
    let addr = spawn_mock(mock.clone()).await;

    let mut stage = HttpStage::new(&format!("http://{addr}"), "secret");
    stage.connect().await.unwrap();
    stage.home().await.unwrap();
    stage.close();

    assert_eq!(received_codes(&mock), vec!["G53", "G21", "G28", "G90"]);
}

#[tokio::test]
async fn move_encapsulates_the_completion_wait() {
    let mock = MockStage::default();
    let addr = spawn_mock(mock.clone()).await;

    let mut stage = HttpStage::new(&format!("http://{addr}"), "secret");
    stage.connect().await.unwrap();
    stage.move_to(MoveTarget::xy(110.0, 120.0, 1500.0)).await.unwrap();
    stage.close();

    assert_eq!(received_codes(&mock), vec!["G0 X110 Y120 F1500", "M400"]);
}

#[tokio::test]
async fn rejected_command_surfaces_code_and_status() {
    let mock = MockStage::default();
    mock.reject_codes.store(true, Ordering::SeqCst);
    let addr = spawn_mock(mock.clone()).await;

    let mut stage = HttpStage::new(&format!("http://{addr}"), "secret");
    stage.connect().await.unwrap();

    match stage.home().await {
        Err(StageError::CommandRejected { code, status: 500 }) => assert_eq!(code, "G53"),
        other => panic!("expected CommandRejected, got {other:?}"),
    }
    stage.close();
}

#[tokio::test]
async fn commands_before_connect_are_rejected() {
    let mut stage = HttpStage::new("http://127.0.0.1:1", "secret");
    assert!(matches!(
        stage.move_to(MoveTarget::xy(0.0, 0.0, 100.0)).await,
        Err(StageError::NotConnected)
    ));
}

#[tokio::test]
async fn keep_alive_polls_until_close() {
    let mock = MockStage::default();
    let addr = spawn_mock(mock.clone()).await;

    let mut stage = HttpStage::new(&format!("http://{addr}"), "secret")
        .with_keep_alive_period(Duration::from_millis(25));
    stage.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let while_open = mock.polls.load(Ordering::SeqCst);
    assert!(while_open >= 2, "expected repeated polls, saw {while_open}");

    stage.close();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_close = mock.polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.polls.load(Ordering::SeqCst), after_close);
}
