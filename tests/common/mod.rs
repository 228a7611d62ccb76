#![allow(dead_code)]
//! Shared helpers for integration tests: a stub Prometheus HTTP API served
//! by axum on an ephemeral port, plus payload fixtures.

use anyhow::Result;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use monitoring_console::datamodel::RawObservation;
use monitoring_console::test_utils::observation;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Params = HashMap<String, String>;
type Responder = dyn Fn(&Params) -> (StatusCode, String) + Send + Sync;

#[derive(Clone)]
pub struct PrometheusStub {
    responder: Arc<Responder>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<Params>>>,
}

impl PrometheusStub {
    pub fn new(
        responder: impl Fn(&Params) -> (StatusCode, String) + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Arc::new(responder),
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<Params> {
        self.requests.lock().unwrap().clone()
    }

    /// Serves the stub on 127.0.0.1 and returns its base URL.
    pub async fn serve(&self) -> Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let app = Router::new()
            .route("/api/v1/query_range", get(query_range))
            .with_state(self.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{}", address))
    }
}

async fn query_range(
    State(stub): State<PrometheusStub>,
    Query(params): Query<Params>,
) -> impl IntoResponse {
    stub.requests.lock().unwrap().push(params.clone());
    if let Some(delay) = stub.delay {
        tokio::time::sleep(delay).await;
    }
    let (status, body) = (stub.responder)(&params);
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

pub fn matrix_body(result: serde_json::Value) -> String {
    serde_json::json!({
        "status": "success",
        "data": { "resultType": "matrix", "result": result },
    })
    .to_string()
}

pub fn error_body(error_type: &str, message: &str) -> String {
    serde_json::json!({
        "status": "error",
        "errorType": error_type,
        "error": message,
    })
    .to_string()
}

/// One member of an incident group as the incidents metric reports it.
pub fn incident_member(
    group_id: &str,
    alert: &str,
    component: &str,
    layer: &str,
    values: &[(f64, &str)],
) -> RawObservation {
    observation(
        &[
            ("group_id", group_id),
            ("src_alertname", alert),
            ("component", component),
            ("layer", layer),
        ],
        values,
    )
}
