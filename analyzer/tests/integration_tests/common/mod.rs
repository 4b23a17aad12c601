//! Common test utilities and helpers for integration tests.
//!
//! Provides a mock Kademlia activity log API served by axum on an ephemeral
//! port, plus record builders.

use analyzer::source::ACTIVITY_LOG_PATH;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use tokio::net::TcpListener;

/// How the mock answers one window.
#[derive(Debug, Clone)]
pub enum WindowReply {
    /// A JSON array of records.
    Records(Vec<Value>),
    /// An HTTP 500.
    ServerError,
    /// A 200 with a body that is not JSON.
    Garbage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowParams {
    start_time: i64,
    end_time: i64,
}

/// Mock activity log API.
///
/// By default every window gets the stored records whose `ts` lies inside
/// it. Replies can be overridden per window start.
#[derive(Default)]
pub struct MockKademlia {
    records: Mutex<Vec<Value>>,
    overrides: Mutex<HashMap<i64, WindowReply>>,
    failing: Mutex<HashSet<i64>>,
    calls: Mutex<Vec<(i64, i64)>>,
}

impl MockKademlia {
    /// Adds records served by timestamp.
    pub fn with_records(self, records: Vec<Value>) -> Self {
        self.records.lock().unwrap().extend(records);
        self
    }

    /// Forces the reply for the window starting at `start`.
    pub fn with_reply(self, start: i64, reply: WindowReply) -> Self {
        self.overrides.lock().unwrap().insert(start, reply);
        self
    }

    /// Makes the window starting at `start` fail with HTTP 500.
    pub fn failing_at(self, start: i64) -> Self {
        self.failing.lock().unwrap().insert(start);
        self
    }

    /// Every `(startTime, endTime)` requested so far.
    pub fn calls(&self) -> Vec<(i64, i64)> {
        self.calls.lock().unwrap().clone()
    }

    fn reply(&self, params: &WindowParams) -> WindowReply {
        if self.failing.lock().unwrap().contains(&params.start_time) {
            return WindowReply::ServerError;
        }
        if let Some(reply) = self.overrides.lock().unwrap().get(&params.start_time) {
            return reply.clone();
        }
        let records = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r["ts"]
                    .as_i64()
                    .is_some_and(|ts| ts >= params.start_time && ts < params.end_time)
            })
            .cloned()
            .collect();
        WindowReply::Records(records)
    }
}

async fn activity_log(
    State(api): State<Arc<MockKademlia>>,
    Query(params): Query<WindowParams>,
) -> Response {
    api.calls
        .lock()
        .unwrap()
        .push((params.start_time, params.end_time));

    match api.reply(&params) {
        WindowReply::Records(records) => Json(Value::Array(records)).into_response(),
        WindowReply::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        WindowReply::Garbage => (StatusCode::OK, "<html>maintenance</html>").into_response(),
    }
}

/// Serves `api` on an ephemeral local port and returns its base URL.
pub async fn spawn_mock(api: Arc<MockKademlia>) -> String {
    let app = Router::new()
        .route(ACTIVITY_LOG_PATH, get(activity_log))
        .with_state(api);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// Installs a test log subscriber once per process.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A storage report as the API returns it.
pub fn storage_record(ts: i64, name: &str, total: i64, available: i64) -> Value {
    json!({
        "ts": ts,
        "name": name,
        "type": "storage",
        "totalSize": total,
        "availableSize": available,
        "peerCount": 12
    })
}
