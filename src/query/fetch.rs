use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::backend::{QueryBackend, RangeQuery};
use super::error::QueryError;
use super::merger::merge_chunk_responses;
use super::response::QueryResponse;
use crate::datamodel::{ConsoleDuration, TimeWindow};

/// Fetches every window of one query concurrently, then merges them.
///
/// Merging only starts once every chunk has settled. If any chunk fails,
/// the whole fetch fails with the first error in window order.
pub async fn fetch_windows(
    backend: &dyn QueryBackend,
    query: &str,
    windows: &[TimeWindow],
    step: ConsoleDuration,
    cancel: &CancellationToken,
) -> Result<QueryResponse, QueryError> {
    let requests: Vec<RangeQuery> = windows
        .iter()
        .map(|window| RangeQuery::new(query, *window, step))
        .collect();

    let settled = join_all(
        requests
            .iter()
            .map(|request| backend.query_range(request, cancel)),
    )
    .await;

    let mut responses = Vec::with_capacity(settled.len());
    for result in settled {
        responses.push(result?);
    }
    debug!("Merging {} chunk(s) for {}", responses.len(), query);

    merge_chunk_responses(responses)
        .ok_or_else(|| QueryError::Decode("no chunk responses to merge".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{ConsoleInstant, LabelSet, RawObservation, RawValue};
    use crate::query::TimeRangeChunker;
    use crate::test_utils::ScriptedBackend;
    use hifitime::Unit;

    fn window_response(request: &RangeQuery) -> Result<QueryResponse, QueryError> {
        let labels: LabelSet = [("pod", "a")].into_iter().collect();
        let ts = request.window.end.to_unix_seconds();
        Ok(QueryResponse::matrix(vec![RawObservation::new(
            labels,
            vec![RawValue::new(ts, "1")],
        )]))
    }

    #[tokio::test]
    async fn test_fetch_windows_merges_all_chunks() {
        let backend = ScriptedBackend::new(window_response);
        let end = ConsoleInstant::from_unix_seconds(1_700_000_000.0);
        let windows = TimeRangeChunker::default().windows(50 * Unit::Hour, end);

        let response = fetch_windows(
            &backend,
            "up",
            &windows,
            300 * Unit::Second,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(backend.requests().len(), 3);
        assert_eq!(response.observations().len(), 1);
        assert_eq!(response.total_points(), 3);
    }

    #[test]
    fn test_any_failed_chunk_fails_the_fetch() {
        let end = ConsoleInstant::from_unix_seconds(1_700_000_000.0);
        let windows = TimeRangeChunker::default().windows(50 * Unit::Hour, end);
        let failing_end = windows[1].end;
        let backend = ScriptedBackend::new(move |request: &RangeQuery| {
            if request.window.end == failing_end {
                Err(QueryError::Transport("connection reset".to_string()))
            } else {
                window_response(request)
            }
        });

        let result = tokio_test::block_on(fetch_windows(
            &backend,
            "up",
            &windows,
            300 * Unit::Second,
            &CancellationToken::new(),
        ));

        assert_eq!(
            result,
            Err(QueryError::Transport("connection reset".to_string()))
        );
        // All chunks were still issued and awaited
        assert_eq!(backend.requests().len(), 3);
    }
}
