use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::backend::{QueryBackend, RangeQuery};
use super::error::QueryError;
use super::response::QueryResponse;

/// Range queries against a Prometheus-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct PrometheusBackend {
    base_url: String,
    client: reqwest::Client,
}

impl PrometheusBackend {
    pub fn connect(base_url: &str, timeout: std::time::Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query_params(request: &RangeQuery) -> [(&'static str, String); 4] {
        let step_seconds = request.step.to_seconds().floor().max(1.0);
        [
            ("query", request.query.clone()),
            (
                "start",
                format!("{:.3}", request.window.start().to_unix_seconds()),
            ),
            ("end", format!("{:.3}", request.window.end.to_unix_seconds())),
            ("step", format!("{}", step_seconds as u64)),
        ]
    }

    async fn send(&self, request: &RangeQuery) -> Result<QueryResponse, QueryError> {
        let url = format!("{}/api/v1/query_range", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&Self::query_params(request))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        // Prometheus answers bad queries with 4xx and a JSON error envelope
        match serde_json::from_slice::<QueryResponse>(&body) {
            Ok(parsed) => parsed.into_checked(),
            Err(_) if !status.is_success() => Err(QueryError::Transport(format!(
                "HTTP {} from {}",
                status, url
            ))),
            Err(err) => Err(QueryError::Decode(err.to_string())),
        }
    }
}

#[async_trait]
impl QueryBackend for PrometheusBackend {
    async fn query_range(
        &self,
        request: &RangeQuery,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse, QueryError> {
        debug!(
            "query_range: {} [{} .. {}] step={}",
            request.query,
            request.window.start(),
            request.window.end,
            request.step
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("query_range aborted: {}", request.query);
                Err(QueryError::Aborted)
            }
            result = self.send(request) => {
                if let Err(err) = &result {
                    warn!("query_range failed for {}: {}", request.query, err);
                }
                result
            }
        }
    }
}
