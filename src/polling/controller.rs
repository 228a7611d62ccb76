use std::sync::Arc;

use futures::future::join_all;
use hifitime::Unit;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::edit::{EditOutcome, QueryChange, QueryEdit, QueryList};
use super::view_state::ViewState;
use super::zoom::ZoomController;
use crate::datamodel::datetime::to_std_duration;
use crate::datamodel::{ConsoleDuration, ConsoleInstant, LabelSet, Series, TimeRange, TimeWindow};
use crate::query::{
    AdaptiveSampler, QueryBackend, QueryError, QueryResponse, SamplerDecision, SamplerSettings,
    TimeRangeChunker, fetch_windows,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollingSettings {
    pub min_poll_interval: ConsoleDuration,
    pub chunker: TimeRangeChunker,
    pub sampler: SamplerSettings,
    pub zoom: ZoomController,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            min_poll_interval: 10 * Unit::Second,
            chunker: TimeRangeChunker::default(),
            sampler: SamplerSettings::default(),
            zoom: ZoomController::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching { generation: u64 },
}

/// How the last cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Success,
    /// At least one query failed; its previous series stay visible.
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied(CycleStatus),
    /// The result belongs to a superseded cycle and was discarded.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub query: String,
    pub windows: Vec<TimeWindow>,
    pub step: ConsoleDuration,
}

/// The requests of one poll cycle, detached from the controller so they
/// can run while the controller keeps handling commands.
#[derive(Debug)]
pub struct FetchCycle {
    pub generation: u64,
    pub domain: TimeRange,
    /// `None` for queries that are not fetched this cycle.
    pub plans: Vec<Option<QueryPlan>>,
    cancel: CancellationToken,
}

impl FetchCycle {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn run(self, backend: Arc<dyn QueryBackend>) -> CycleResult {
        let results = join_all(self.plans.iter().map(|plan| {
            let backend = backend.as_ref();
            let cancel = &self.cancel;
            async move {
                match plan {
                    Some(plan) => Some(
                        fetch_windows(backend, &plan.query, &plan.windows, plan.step, cancel)
                            .await,
                    ),
                    None => None,
                }
            }
        }))
        .await;

        CycleResult {
            generation: self.generation,
            domain: self.domain,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleResult {
    pub generation: u64,
    pub domain: TimeRange,
    pub results: Vec<Option<Result<QueryResponse, QueryError>>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CommittedQuery {
    series: Vec<Series>,
    error: Option<QueryError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleQuery {
    pub query: String,
    /// Committed series minus the disabled ones.
    pub series: Vec<Series>,
    pub error: Option<QueryError>,
    pub samples: usize,
}

/// What the chart renderer sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleState {
    /// Generation of the last applied cycle.
    pub generation: u64,
    pub domain: Option<TimeRange>,
    pub queries: Vec<VisibleQuery>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollCommand {
    Rerun,
    SetSpan(ConsoleDuration),
    SetEndTime(Option<ConsoleInstant>),
    SetHidden(bool),
    Edit(QueryEdit),
    SetSeriesDisabled { labels: LabelSet, disabled: bool },
    Zoom { x1: f64, x2: f64, width: f64 },
    Shutdown,
}

/// Periodic re-fetch of chunked, sampled queries for one view.
///
/// Every cycle gets a generation number; results are only committed when
/// their generation is still the current one, so a superseded request that
/// answers late never overwrites newer state.
#[derive(Debug)]
pub struct PollingController {
    backend: Arc<dyn QueryBackend>,
    settings: PollingSettings,
    view: ViewState,
    queries: QueryList,
    samplers: Vec<AdaptiveSampler>,
    committed: Vec<CommittedQuery>,
    generation: u64,
    applied_generation: u64,
    state: PollState,
    last_status: Option<CycleStatus>,
    in_flight: Option<CancellationToken>,
    domain: Option<TimeRange>,
    published: watch::Sender<VisibleState>,
}

impl PollingController {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        settings: PollingSettings,
        view: ViewState,
        queries: Vec<String>,
    ) -> Self {
        let samplers = queries
            .iter()
            .map(|_| AdaptiveSampler::new(settings.sampler, view.span))
            .collect();
        let committed = vec![CommittedQuery::default(); queries.len()];
        let (published, _) = watch::channel(VisibleState::default());
        let controller = Self {
            backend,
            settings,
            view,
            queries: QueryList::new(queries),
            samplers,
            committed,
            generation: 0,
            applied_generation: 0,
            state: PollState::Idle,
            last_status: None,
            in_flight: None,
            domain: None,
            published,
        };
        controller.publish();
        controller
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn last_status(&self) -> Option<CycleStatus> {
        self.last_status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn queries(&self) -> &[String] {
        self.queries.as_slice()
    }

    pub fn sampler(&self, index: usize) -> Option<&AdaptiveSampler> {
        self.samplers.get(index)
    }

    pub fn subscribe(&self) -> watch::Receiver<VisibleState> {
        self.published.subscribe()
    }

    pub fn visible(&self) -> VisibleState {
        self.published.borrow().clone()
    }

    pub fn poll_interval(&self) -> ConsoleDuration {
        self.view
            .effective_poll_interval(self.settings.min_poll_interval)
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        if let PollState::Fetching { generation } = self.state {
            debug!("Cycle {} superseded", generation);
            self.last_status = Some(CycleStatus::Cancelled);
        }
        self.state = PollState::Idle;
    }

    /// Cancels the running cycle and makes any result still on its way stale.
    fn invalidate(&mut self) {
        self.cancel_in_flight();
        self.generation += 1;
    }

    /// Starts a new cycle, superseding the one in flight.
    pub fn begin_cycle(&mut self, now: ConsoleInstant) -> FetchCycle {
        self.invalidate();
        let generation = self.generation;
        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        self.state = PollState::Fetching { generation };

        let domain = self.view.domain(now);
        let windows = self.settings.chunker.plan(self.view.span, domain.to);
        let plans = self
            .queries
            .as_slice()
            .iter()
            .zip(&self.samplers)
            .map(|(query, sampler)| {
                if query.trim().is_empty() || sampler.is_too_large() {
                    None
                } else {
                    Some(QueryPlan {
                        query: query.clone(),
                        windows: windows.clone(),
                        step: sampler.step(),
                    })
                }
            })
            .collect();
        debug!("Starting cycle {} over {} window(s)", generation, windows.len());

        FetchCycle {
            generation,
            domain,
            plans,
            cancel,
        }
    }

    /// Applies a cycle result if it is still current.
    pub fn commit(&mut self, result: CycleResult) -> CommitOutcome {
        let current = matches!(
            self.state,
            PollState::Fetching { generation } if generation == result.generation
        );
        if !current || result.results.len() != self.committed.len() {
            debug!(
                "Discarding result of cycle {} (current is {})",
                result.generation, self.generation
            );
            return CommitOutcome::Stale;
        }
        self.in_flight = None;
        self.state = PollState::Idle;

        if result
            .results
            .iter()
            .any(|r| matches!(r, Some(Err(QueryError::Aborted))))
        {
            debug!("Cycle {} was cancelled", result.generation);
            self.last_status = Some(CycleStatus::Cancelled);
            return CommitOutcome::Applied(CycleStatus::Cancelled);
        }

        let mut status = CycleStatus::Success;
        for (index, outcome) in result.results.into_iter().enumerate() {
            let Some(outcome) = outcome else {
                continue;
            };
            match outcome {
                Ok(response) => {
                    let points = response.total_points();
                    match self.samplers[index].observe(points) {
                        SamplerDecision::TooLarge { points } => {
                            self.committed[index] = CommittedQuery {
                                series: Vec::new(),
                                error: Some(QueryError::VolumeExceeded { points }),
                            };
                            status = CycleStatus::Failed;
                        }
                        decision => {
                            if let SamplerDecision::Adjust { from, to } = decision {
                                info!("Query {} samples {} -> {}", index, from, to);
                            }
                            self.committed[index] = CommittedQuery {
                                series: response.to_series(),
                                error: None,
                            };
                        }
                    }
                }
                Err(err) => {
                    warn!("Query {} failed: {}", index, err);
                    self.committed[index].error = Some(err);
                    status = CycleStatus::Failed;
                }
            }
        }

        self.applied_generation = result.generation;
        self.domain = Some(result.domain);
        self.last_status = Some(status);
        self.publish();
        CommitOutcome::Applied(status)
    }

    /// Fetches and commits one cycle inline.
    pub async fn poll_once(&mut self, now: ConsoleInstant) -> CommitOutcome {
        let cycle = self.begin_cycle(now);
        let result = cycle.run(self.backend.clone()).await;
        self.commit(result)
    }

    fn publish(&self) {
        let queries = self
            .queries
            .as_slice()
            .iter()
            .zip(&self.committed)
            .zip(&self.samplers)
            .map(|((query, committed), sampler)| VisibleQuery {
                query: query.clone(),
                series: committed
                    .series
                    .iter()
                    .filter(|series| !self.view.is_series_disabled(&series.labels))
                    .cloned()
                    .collect(),
                error: committed.error.clone(),
                samples: sampler.samples(),
            })
            .collect();
        self.published.send_replace(VisibleState {
            generation: self.applied_generation,
            domain: self.domain,
            queries,
        });
    }

    pub fn apply_edit(&mut self, edit: QueryEdit) -> EditOutcome {
        let index = edit.index;
        let removed = matches!(edit.change, QueryChange::Remove);
        let outcome = self.queries.apply(edit);
        if !outcome.changed {
            return outcome;
        }
        self.invalidate();
        if removed {
            self.samplers.remove(index);
            self.committed.remove(index);
        } else if index == self.samplers.len() {
            self.samplers
                .push(AdaptiveSampler::new(self.settings.sampler, self.view.span));
            self.committed.push(CommittedQuery::default());
        } else {
            self.samplers[index].reset(self.view.span);
            self.committed[index] = CommittedQuery::default();
        }
        self.publish();
        outcome
    }

    pub fn set_span(&mut self, span: ConsoleDuration) -> bool {
        if span == self.view.span {
            return false;
        }
        self.view.span = span;
        for sampler in &mut self.samplers {
            sampler.reset(span);
        }
        self.invalidate();
        true
    }

    pub fn set_end_time(&mut self, end_time: Option<ConsoleInstant>) -> bool {
        if end_time == self.view.end_time {
            return false;
        }
        self.view.end_time = end_time;
        self.invalidate();
        true
    }

    pub fn set_hidden(&mut self, hidden: bool) -> bool {
        let changed = self.view.hidden != hidden;
        self.view.hidden = hidden;
        changed
    }

    pub fn set_series_disabled(&mut self, labels: &LabelSet, disabled: bool) {
        if self.view.set_series_disabled(labels, disabled) {
            self.publish();
        }
    }

    /// Turns a drag selection into a fixed, non-live domain.
    pub fn zoom(&mut self, x1: f64, x2: f64, width: f64, now: ConsoleInstant) -> Option<TimeRange> {
        let domain = self.domain.unwrap_or_else(|| self.view.domain(now));
        let range = self.settings.zoom.zoom(x1, x2, width, domain)?;
        self.set_span(range.span());
        self.set_end_time(Some(range.to));
        Some(range)
    }

    /// Applies a command, returning whether it asks for a fetch.
    fn handle(&mut self, command: PollCommand, now: ConsoleInstant) -> bool {
        match command {
            PollCommand::Rerun => true,
            PollCommand::SetSpan(span) => self.set_span(span),
            PollCommand::SetEndTime(end_time) => self.set_end_time(end_time),
            PollCommand::SetHidden(hidden) => self.set_hidden(hidden) && !hidden,
            PollCommand::Edit(edit) => self.apply_edit(edit).changed,
            PollCommand::SetSeriesDisabled { labels, disabled } => {
                self.set_series_disabled(&labels, disabled);
                false
            }
            PollCommand::Zoom { x1, x2, width } => self.zoom(x1, x2, width, now).is_some(),
            PollCommand::Shutdown => false,
        }
    }

    fn launch(&mut self, cycles: &mut JoinSet<CycleResult>, now: ConsoleInstant) {
        let cycle = self.begin_cycle(now);
        cycles.spawn(cycle.run(self.backend.clone()));
    }

    /// Polls until the command channel closes or `Shutdown` arrives.
    ///
    /// Ticks only fire while the view is visible and live; explicit
    /// commands fetch immediately unless the view is hidden.
    pub async fn run(mut self, mut commands: mpsc::Receiver<PollCommand>) -> Self {
        let mut cycles: JoinSet<CycleResult> = JoinSet::new();
        let mut next_tick = Instant::now();

        loop {
            let polling = self.view.is_polling();
            tokio::select! {
                _ = tokio::time::sleep_until(next_tick), if polling => {
                    match ConsoleInstant::now() {
                        Ok(now) => self.launch(&mut cycles, now),
                        Err(err) => error!("Cannot read the clock: {}", err),
                    }
                    next_tick = Instant::now() + to_std_duration(self.poll_interval());
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    match joined {
                        Ok(result) => {
                            self.commit(result);
                        }
                        Err(err) => error!("Fetch task failed: {}", err),
                    }
                }
                command = commands.recv() => {
                    let command = match command {
                        None | Some(PollCommand::Shutdown) => break,
                        Some(command) => command,
                    };
                    let now = match ConsoleInstant::now() {
                        Ok(now) => now,
                        Err(err) => {
                            error!("Cannot read the clock: {}", err);
                            continue;
                        }
                    };
                    if self.handle(command, now) && !self.view.hidden {
                        self.launch(&mut cycles, now);
                        next_tick = Instant::now() + to_std_duration(self.poll_interval());
                    }
                }
            }
        }

        self.cancel_in_flight();
        cycles.shutdown().await;
        self
    }
}
