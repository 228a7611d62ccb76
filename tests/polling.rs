//! Run-loop behavior of the polling controller under a paused clock.

use hifitime::Unit;
use monitoring_console::datamodel::ConsoleInstant;
use monitoring_console::polling::{
    CommitOutcome, CycleStatus, PollCommand, PollingController, PollingSettings, QueryEdit,
    ViewState,
};
use monitoring_console::query::{QueryBackend, QueryError, QueryResponse, RangeQuery};
use monitoring_console::test_utils::{ScriptedBackend, dense_matrix, labels, observation};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

fn steady_backend() -> Arc<ScriptedBackend> {
    Arc::new(ScriptedBackend::new(|request: &RangeQuery| {
        Ok(dense_matrix(request, 2, 10))
    }))
}

fn controller(backend: Arc<dyn QueryBackend>, view: ViewState) -> PollingController {
    PollingController::new(
        backend,
        PollingSettings::default(),
        view,
        vec!["up".to_string()],
    )
}

#[tokio::test(start_paused = true)]
async fn test_polls_at_the_derived_interval() {
    let backend = steady_backend();
    let controller = controller(backend.clone(), ViewState::new(1 * Unit::Hour));
    let mut updates = controller.subscribe();
    let (commands, receiver) = mpsc::channel(8);
    let started = tokio::time::Instant::now();
    let task = tokio::spawn(controller.run(receiver));

    updates.wait_for(|state| state.generation == 1).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    // One hour span: one cycle every 30 seconds
    updates.wait_for(|state| state.generation == 2).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(30));

    commands.send(PollCommand::Shutdown).await.unwrap();
    let controller = task.await.unwrap();
    assert_eq!(backend.requests().len(), 2);
    assert_eq!(controller.last_status(), Some(CycleStatus::Success));
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_does_not_block_next_tick() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let backend = Arc::new(ScriptedBackend::new(move |request: &RangeQuery| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(QueryError::Transport("connection refused".to_string()))
        } else {
            Ok(dense_matrix(request, 2, 10))
        }
    }));
    let controller = controller(backend.clone(), ViewState::new(1 * Unit::Hour));
    let mut updates = controller.subscribe();
    let (commands, receiver) = mpsc::channel(8);
    let task = tokio::spawn(controller.run(receiver));

    {
        let state = updates.wait_for(|state| state.generation == 1).await.unwrap();
        assert!(matches!(
            state.queries[0].error,
            Some(QueryError::Transport(_))
        ));
        assert!(state.queries[0].series.is_empty());
    }

    {
        let state = updates.wait_for(|state| state.generation == 2).await.unwrap();
        assert_eq!(state.queries[0].error, None);
        assert_eq!(state.queries[0].series.len(), 2);
    }

    commands.send(PollCommand::Shutdown).await.unwrap();
    let controller = task.await.unwrap();
    assert_eq!(controller.last_status(), Some(CycleStatus::Success));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_view_does_not_poll() {
    let backend = steady_backend();
    let mut view = ViewState::new(1 * Unit::Hour);
    view.hidden = true;
    let controller = controller(backend.clone(), view);
    let mut updates = controller.subscribe();
    let (commands, receiver) = mpsc::channel(8);
    let task = tokio::spawn(controller.run(receiver));

    commands.send(PollCommand::Rerun).await.unwrap();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert!(backend.requests().is_empty());

    // Becoming visible fetches right away
    commands.send(PollCommand::SetHidden(false)).await.unwrap();
    updates.wait_for(|state| state.generation >= 1).await.unwrap();

    commands.send(PollCommand::Shutdown).await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_fixed_end_time_only_fetches_on_request() {
    let backend = steady_backend();
    let mut view = ViewState::new(1 * Unit::Hour);
    view.end_time = Some(ConsoleInstant::from_unix_seconds(1_700_000_000.0));
    let controller = controller(backend.clone(), view);
    let mut updates = controller.subscribe();
    let (commands, receiver) = mpsc::channel(8);
    let task = tokio::spawn(controller.run(receiver));

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(backend.requests().is_empty());

    commands.send(PollCommand::Rerun).await.unwrap();
    updates.wait_for(|state| state.generation >= 1).await.unwrap();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(backend.requests().len(), 1);
    assert_eq!(
        backend.requests()[0].window.end,
        ConsoleInstant::from_unix_seconds(1_700_000_000.0)
    );

    commands.send(PollCommand::Shutdown).await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_late_answer_of_superseded_cycle_never_shows() {
    let backend = Arc::new(
        ScriptedBackend::new(|request: &RangeQuery| {
            let marker = if request.query == "up" { "old" } else { "new" };
            Ok(QueryResponse::matrix(vec![observation(
                &[("marker", marker)],
                &[(1.0, "1")],
            )]))
        })
        .with_delay(Duration::from_secs(20))
        .ignoring_cancel(),
    );
    let controller = controller(backend.clone(), ViewState::new(1 * Unit::Hour));
    let mut updates = controller.subscribe();
    let (commands, receiver) = mpsc::channel(8);
    let task = tokio::spawn(controller.run(receiver));

    tokio::time::sleep(Duration::from_secs(1)).await;
    commands
        .send(PollCommand::Edit(QueryEdit::replace(0, "node_load1")))
        .await
        .unwrap();

    let state = updates
        .wait_for(|state| state.generation > 0)
        .await
        .unwrap()
        .clone();
    assert_eq!(state.queries[0].query, "node_load1");
    assert_eq!(
        state.queries[0].series[0].labels,
        labels(&[("marker", "new")])
    );

    commands.send(PollCommand::Shutdown).await.unwrap();
    task.await.unwrap();
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test]
async fn test_long_span_is_fetched_in_chunks() {
    let backend = steady_backend();
    let mut controller = controller(backend.clone(), ViewState::new(72 * Unit::Hour));
    let now = ConsoleInstant::from_unix_seconds(1_700_000_000.0);

    let outcome = controller.poll_once(now).await;
    assert_eq!(outcome, CommitOutcome::Applied(CycleStatus::Success));

    let requests = backend.requests();
    assert_eq!(requests.len(), 3);
    // 72h over 300 samples
    assert!(requests.iter().all(|r| r.step == 864 * Unit::Second));
    assert_eq!(requests[0].window.start(), now - 72 * Unit::Hour);

    // Two series, each merged across the three windows
    let visible = controller.visible();
    assert_eq!(visible.queries[0].series.len(), 2);
    assert_eq!(visible.queries[0].series[0].len(), 30);
}

#[tokio::test]
async fn test_span_change_resets_sampling() {
    let backend = Arc::new(ScriptedBackend::new(|request: &RangeQuery| {
        Ok(dense_matrix(request, 60, 300))
    }));
    let mut controller = controller(backend.clone(), ViewState::new(1 * Unit::Hour));
    let now = ConsoleInstant::from_unix_seconds(1_700_000_000.0);

    controller.poll_once(now).await;
    assert_eq!(controller.sampler(0).unwrap().samples(), 100);

    assert!(controller.set_span(2 * Unit::Hour));
    assert_eq!(controller.sampler(0).unwrap().samples(), 300);
    assert!(!controller.set_span(2 * Unit::Hour));
}
