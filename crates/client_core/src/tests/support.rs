//! Scripted mock backend for exercising the client over real HTTP.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::{RetryPolicy, Session, StaticSessionProvider};
use shared::domain::Role;
use shared::protocol::PaginationMeta;

/// In-memory backend double. Responses are scripted in order; once the
/// script runs out, the last response repeats.
#[derive(Clone, Default)]
pub struct MockBackend {
    hits: Arc<Mutex<u32>>,
    responses: Arc<Mutex<VecDeque<Value>>>,
    last_response: Arc<Mutex<Option<Value>>>,
    last_query: Arc<Mutex<Option<String>>>,
    last_body: Arc<Mutex<Option<Value>>>,
    last_auth: Arc<Mutex<Option<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, response: Value) {
        self.responses.lock().expect("lock").push_back(response);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("lock") = Some(delay);
    }

    pub fn hits(&self) -> u32 {
        *self.hits.lock().expect("lock")
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().expect("lock").clone()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().expect("lock").clone()
    }

    pub fn last_auth(&self) -> Option<String> {
        self.last_auth.lock().expect("lock").clone()
    }

    fn record_hit(&self, headers: &HeaderMap, query: Option<String>) {
        *self.hits.lock().expect("lock") += 1;
        *self.last_query.lock().expect("lock") = query;
        *self.last_auth.lock().expect("lock") = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }

    fn next_response(&self) -> Value {
        let mut queue = self.responses.lock().expect("lock");
        if let Some(next) = queue.pop_front() {
            *self.last_response.lock().expect("lock") = Some(next.clone());
            return next;
        }
        self.last_response
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(|| json!({ "status": 500, "message": "no scripted response" }))
    }

    async fn sleep_if_configured(&self) {
        let delay = *self.delay.lock().expect("lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

async fn list_handler(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    mock.record_hit(&headers, query);
    mock.sleep_if_configured().await;
    Json(mock.next_response())
}

async fn mutation_handler(
    State(mock): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    mock.record_hit(&headers, None);
    *mock.last_body.lock().expect("lock") = Some(body);
    mock.sleep_if_configured().await;
    Json(mock.next_response())
}

/// Bind the mock on an ephemeral port and return its base url.
pub async fn spawn(mock: MockBackend) -> String {
    let router = Router::new()
        .route("/company/invoices/:id", get(list_handler))
        .route("/company/invoices/:id/summary", get(list_handler))
        .route("/company/invoices/:id/monthly", get(list_handler))
        .route("/company/invoices/:id/status", put(mutation_handler))
        .route("/company/consultants", get(list_handler))
        .route("/company/time-logs/approve", post(mutation_handler))
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

pub fn company_session() -> Arc<StaticSessionProvider> {
    Arc::new(StaticSessionProvider::new(Session {
        user_id: "user-1".into(),
        role: Role::CompanyAdmin,
        company_id: Some("company-1".into()),
        auth_token: Some("test-token".to_string()),
    }))
}

/// Millisecond-scale policy so retry tests finish quickly.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(5),
        request_timeout: Duration::from_millis(250),
    }
}

pub fn invoice_page(count: usize, page: u64, limit: u64, total: u64) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": format!("inv-{i}"),
                "invoiceNumber": format!("INV-{i:04}"),
                "clientName": "Acme GmbH",
                "amount": 100.0 + i as f64,
                "currency": "USD",
                "status": "pending",
                "issuedOn": "2026-03-01"
            })
        })
        .collect();
    let meta = PaginationMeta::compute(page, limit, total);
    json!({
        "status": 200,
        "data": {
            "items": items,
            "pagination": serde_json::to_value(meta).expect("meta"),
        }
    })
}

pub fn consultant_page(count: usize, page: u64, limit: u64, total: u64) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": format!("con-{i}"),
                "name": format!("Consultant {i}"),
                "email": format!("c{i}@example.com"),
                "status": "active"
            })
        })
        .collect();
    let meta = PaginationMeta::compute(page, limit, total);
    json!({
        "status": 200,
        "data": {
            "items": items,
            "pagination": serde_json::to_value(meta).expect("meta"),
        }
    })
}

pub fn error_envelope(status: u16, message: &str) -> Value {
    json!({ "status": status, "message": message })
}
