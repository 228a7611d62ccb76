#![forbid(unsafe_code)]
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use monitoring_console::config::{self, ConsoleConfig, load_configuration};
use monitoring_console::datamodel::datetime::{format_prometheus_duration, parse_prometheus_duration};
use monitoring_console::datamodel::{ConsoleDuration, ConsoleInstant};
use monitoring_console::incidents::IncidentsPipeline;
use monitoring_console::polling::{PollCommand, PollingController, VisibleState};
use monitoring_console::query::{QueryBackend, TimeRangeChunker, create_backend_from_url};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, event, info};

#[derive(Debug, Parser)]
#[command(name = "monitoring-console", version, about = "Chunked, sampled polling of a Prometheus-compatible backend")]
struct Cli {
    /// Overrides the configured backend URL.
    #[arg(long)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Polls queries and prints each committed cycle.
    Poll {
        #[arg(required = true)]
        queries: Vec<String>,
        #[arg(long, value_parser = parse_span)]
        span: Option<ConsoleDuration>,
        /// Stops after this many committed cycles.
        #[arg(long)]
        cycles: Option<usize>,
    },
    /// Loads incidents once and prints them.
    Incidents {
        #[arg(long, value_parser = parse_span, default_value = "7d")]
        span: ConsoleDuration,
    },
    /// Prints the fetch windows covering a span ending now.
    Chunks {
        #[arg(value_parser = parse_span)]
        span: ConsoleDuration,
    },
}

fn parse_span(input: &str) -> Result<ConsoleDuration, String> {
    parse_prometheus_duration(input).ok_or_else(|| format!("invalid duration: {}", input))
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    load_configuration().context("Failed to load configuration")?;
    let config = config::get().context("Failed to get configuration")?;

    let now = ConsoleInstant::now().map_err(|err| anyhow!("Failed to read the clock: {}", err))?;

    if let Command::Chunks { span } = &cli.command {
        print_chunks(&config, *span, now);
        return Ok(());
    }

    let backend_url = cli.backend_url.as_deref().unwrap_or(&config.backend_url);
    info!("Using metrics backend {}", backend_url);
    let backend = create_backend_from_url(backend_url, config.request_timeout())
        .context("Failed to create metrics backend")?;

    match cli.command {
        Command::Poll {
            queries,
            span,
            cycles,
        } => poll(backend, &config, queries, span, cycles).await,
        Command::Incidents { span } => incidents(backend, &config, span, now).await,
        Command::Chunks { .. } => Ok(()),
    }
}

fn print_chunks(config: &ConsoleConfig, span: ConsoleDuration, now: ConsoleInstant) {
    let chunker = TimeRangeChunker::from(config);
    for window in chunker.windows(span, now) {
        println!(
            "{} .. {} ({})",
            window.start(),
            window.end,
            format_prometheus_duration(window.duration)
        );
    }
}

fn print_state(state: &VisibleState) {
    println!("cycle {}", state.generation);
    for visible in &state.queries {
        match &visible.error {
            Some(err) => match err.empty_state_message() {
                Some(message) => println!("  {}: {}", visible.query, message),
                None => println!("  {}: error: {}", visible.query, err),
            },
            None => {
                let points: usize = visible.series.iter().map(|series| series.len()).sum();
                println!(
                    "  {}: {} series, {} points, {} samples",
                    visible.query,
                    visible.series.len(),
                    points,
                    visible.samples
                );
            }
        }
    }
}

async fn poll(
    backend: Arc<dyn QueryBackend>,
    config: &ConsoleConfig,
    queries: Vec<String>,
    span: Option<ConsoleDuration>,
    cycles: Option<usize>,
) -> Result<()> {
    let mut view = config.default_view();
    if let Some(span) = span {
        view.span = span;
    }
    let controller = PollingController::new(backend, config.into(), view, queries);
    let mut updates = controller.subscribe();
    let (commands, receiver) = mpsc::channel(16);
    let task = tokio::spawn(controller.run(receiver));

    let mut committed = 0;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                print_state(&state);
                committed += 1;
                if cycles.is_some_and(|limit| committed >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                event!(Level::INFO, "Interrupted");
                break;
            }
        }
    }

    // The loop also ends when the channel is dropped
    let _ = commands.send(PollCommand::Shutdown).await;
    task.await.context("Polling task failed")?;
    Ok(())
}

async fn incidents(
    backend: Arc<dyn QueryBackend>,
    config: &ConsoleConfig,
    span: ConsoleDuration,
    now: ConsoleInstant,
) -> Result<()> {
    let pipeline = IncidentsPipeline::new(
        backend,
        config.into(),
        config.into(),
        config.into(),
    );
    let snapshot = pipeline
        .load(span, now, now, &CancellationToken::new())
        .await
        .context("Failed to load incidents")?;

    for incident in &snapshot.incidents {
        println!(
            "#{} {} {} .. {}{}{}",
            incident.chart_index,
            incident.group_id,
            incident.firing_start,
            incident.firing_end,
            if incident.long_standing { " long-standing" } else { "" },
            if incident.inactive { " inactive" } else { "" },
        );
        println!(
            "    components: {}  layers: {}",
            incident.components.join(","),
            incident.layers.join(",")
        );
    }
    if let Some(query) = &snapshot.correlation_query {
        println!("correlation: {}", query);
    }
    for alert in &snapshot.alerts {
        println!("alerts for {}: {} point(s)", alert.key, alert.values.len());
    }
    Ok(())
}
