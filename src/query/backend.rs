use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::QueryError;
use super::prometheus::PrometheusBackend;
use super::response::QueryResponse;
use crate::datamodel::{ConsoleDuration, TimeWindow};

/// One range request: a query evaluated over a window at a fixed step.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub query: String,
    pub window: TimeWindow,
    pub step: ConsoleDuration,
}

impl RangeQuery {
    pub fn new(query: impl Into<String>, window: TimeWindow, step: ConsoleDuration) -> Self {
        Self {
            query: query.into(),
            window,
            step,
        }
    }
}

#[async_trait]
pub trait QueryBackend: Send + Sync + Debug {
    /// Runs a range query. Error envelopes come back as
    /// [`QueryError::Backend`], never as `Ok`.
    ///
    /// Implementations must return [`QueryError::Aborted`] once `cancel`
    /// fires, but callers still tolerate a late success.
    async fn query_range(
        &self,
        request: &RangeQuery,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse, QueryError>;
}

pub fn create_backend_from_url(
    url: &str,
    timeout: std::time::Duration,
) -> Result<Arc<dyn QueryBackend>> {
    Ok(match url {
        s if s.starts_with("http://") || s.starts_with("https://") => {
            Arc::new(PrometheusBackend::connect(s, timeout)?)
        }
        _ => {
            bail!("Unsupported metrics backend URL: {}", url)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_from_url() {
        let timeout = std::time::Duration::from_secs(5);
        assert!(create_backend_from_url("http://localhost:9090", timeout).is_ok());
        assert!(create_backend_from_url("https://thanos.example:9091/", timeout).is_ok());
        assert!(create_backend_from_url("postgres://localhost", timeout).is_err());
    }
}
