//! Test utilities for monitoring console tests
//!
//! Provides a scripted in-memory [`QueryBackend`] and small builders for
//! backend payloads, shared by unit and integration tests.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::datamodel::{LabelSet, RawObservation, RawValue};
use crate::query::{QueryBackend, QueryError, QueryResponse, RangeQuery};

type Responder = dyn Fn(&RangeQuery) -> Result<QueryResponse, QueryError> + Send + Sync;

/// A backend answering every request through a closure.
///
/// With a delay, requests wait before answering; by default they stop
/// waiting when cancelled, `ignoring_cancel` makes them answer late instead.
pub struct ScriptedBackend {
    responder: Box<Responder>,
    delay: Option<std::time::Duration>,
    honor_cancel: bool,
    requests: Mutex<Vec<RangeQuery>>,
}

impl ScriptedBackend {
    pub fn new(
        responder: impl Fn(&RangeQuery) -> Result<QueryResponse, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: None,
            honor_cancel: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn ignoring_cancel(mut self) -> Self {
        self.honor_cancel = false;
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RangeQuery> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedBackend")
            .field("delay", &self.delay)
            .field("honor_cancel", &self.honor_cancel)
            .finish()
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn query_range(
        &self,
        request: &RangeQuery,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse, QueryError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            if self.honor_cancel {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(QueryError::Aborted),
                    _ = tokio::time::sleep(delay) => {}
                }
            } else {
                tokio::time::sleep(delay).await;
            }
        }
        (self.responder)(request)
    }
}

pub fn labels(pairs: &[(&str, &str)]) -> LabelSet {
    pairs.iter().copied().collect()
}

pub fn observation(pairs: &[(&str, &str)], values: &[(f64, &str)]) -> RawObservation {
    RawObservation::new(
        labels(pairs),
        values
            .iter()
            .map(|(timestamp, value)| RawValue::new(*timestamp, *value))
            .collect(),
    )
}

/// A matrix response with `series` series of `points` points each, spread
/// evenly over the request window.
pub fn dense_matrix(request: &RangeQuery, series: usize, points: usize) -> QueryResponse {
    let start = request.window.start().to_unix_seconds();
    let spacing = request.window.duration.to_seconds() / points.max(1) as f64;
    QueryResponse::matrix(
        (0..series)
            .map(|index| {
                let name = index.to_string();
                RawObservation::new(
                    labels(&[("series", name.as_str())]),
                    (0..points)
                        .map(|i| RawValue::new(start + spacing * i as f64, "1"))
                        .collect(),
                )
            })
            .collect(),
    )
}
