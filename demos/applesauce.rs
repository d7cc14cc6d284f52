//! Applesauce factory: a small dependency graph of simulated production steps
//!
//! ```text
//! apples ─┐
//! sugars ─┼─> applesauce
//! metals ─> cans ─┘      (apples, sugars and cans also feed qa)
//! ```
//!
//! Run with `cargo run --example applesauce -- --stats`.

use anyhow::{bail, Result};
use clap::Parser;
use depflow::{CancellationToken, Graph, Recorder, Statistics};
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "applesauce", about = "Resolve a simulated applesauce factory")]
struct Args {
    /// Cancel before resolving to watch every step get skipped
    #[arg(long)]
    done: bool,

    /// Add a qa -> sugars link, turning the graph cyclic
    #[arg(long)]
    cycle: bool,

    /// Print per-step wait/action/total timings
    #[arg(long)]
    stats: bool,

    /// Print timings as JSON instead of text
    #[arg(long, requires = "stats")]
    json: bool,

    /// Number of resolutions to run
    #[arg(long, default_value_t = 1)]
    resolves: usize,

    /// Run all resolutions at the same time instead of one after another
    #[arg(long)]
    concurrent: bool,

    /// Minimum step duration in milliseconds
    #[arg(long, default_value_t = 10)]
    time_min: u64,

    /// Maximum step duration in milliseconds
    #[arg(long, default_value_t = 100)]
    time_max: u64,

    /// Minimum value a step produces
    #[arg(long, default_value_t = 10)]
    value_min: u64,

    /// Maximum value a step produces
    #[arg(long, default_value_t = 100)]
    value_max: u64,
}

#[derive(Debug, Clone, Copy)]
struct Ranges {
    time_min: u64,
    time_max: u64,
    value_min: u64,
    value_max: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Answers {
    apples: Option<u64>,
    sugars: Option<u64>,
    metals: Option<u64>,
    cans: Option<u64>,
    applesauce: Option<u64>,
    qa: Option<u64>,
}

#[derive(Debug, Default)]
struct Factory {
    answers: Mutex<Answers>,
}

impl Factory {
    fn snapshot(&self) -> Answers {
        *self.answers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

type Assign = fn(&mut Answers, u64);

fn add_step(graph: &mut Graph<Factory>, name: &'static str, ranges: Ranges, assign: Assign) -> Result<()> {
    graph.add_fn(name, move |cancel: CancellationToken, factory: Arc<Factory>| async move {
        debug!("-> {}", name);
        let millis = fastrand::u64(ranges.time_min..=ranges.time_max);
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("{} cancelled", name);
            }
            _ = tokio::time::sleep(Duration::from_millis(millis)) => {
                let made = fastrand::u64(ranges.value_min..=ranges.value_max);
                let mut answers = factory.answers.lock().unwrap_or_else(|e| e.into_inner());
                assign(&mut answers, made);
                debug!("<- {}: made {}", name, made);
            }
        }
    })?;
    Ok(())
}

fn build_factory(args: &Args) -> Result<Graph<Factory>> {
    let ranges = Ranges {
        time_min: args.time_min,
        time_max: args.time_max,
        value_min: args.value_min,
        value_max: args.value_max,
    };

    let mut graph = Graph::new();
    add_step(&mut graph, "apples", ranges, |answers, made| {
        answers.apples = Some(made)
    })?;
    add_step(&mut graph, "sugars", ranges, |answers, made| {
        answers.sugars = Some(made)
    })?;
    add_step(&mut graph, "metals", ranges, |answers, made| {
        answers.metals = Some(made)
    })?;
    // 2 metals per can
    add_step(&mut graph, "cans", ranges, |answers, _| {
        answers.cans = Some(answers.metals.unwrap_or(0) / 2)
    })?;
    // 2 apples, 4 sugars and 1 can per jar
    add_step(&mut graph, "applesauce", ranges, |answers, _| {
        let apples = answers.apples.unwrap_or(0) / 2;
        let sugars = answers.sugars.unwrap_or(0) / 4;
        let cans = answers.cans.unwrap_or(0);
        answers.applesauce = Some(apples.min(sugars).min(cans))
    })?;
    add_step(&mut graph, "qa", ranges, |answers, made| answers.qa = Some(made))?;

    graph.link_dependency("metals", "cans")?;
    for prerequisite in ["apples", "sugars", "cans"] {
        graph.link_dependency(prerequisite, "applesauce")?;
        graph.link_dependency(prerequisite, "qa")?;
    }
    if args.cycle {
        graph.link_dependency("qa", "sugars")?;
    }
    Ok(graph)
}

async fn run_once(
    graph: &Graph<Factory>,
    cancel: &CancellationToken,
    args: &Args,
    index: usize,
) -> Result<()> {
    let factory = Arc::new(Factory::default());
    let stats = Arc::new(Statistics::new());
    let recorder: Arc<dyn Recorder> = stats.clone();

    let resolution = graph.resolve_with(cancel, factory.clone(), vec![recorder])?;
    info!("Resolution {} started ({})", index, resolution.run_id());
    resolution.settled().await;

    let answers = factory.snapshot();
    println!(
        "[{}] apples={:?} sugars={:?} metals={:?} cans={:?} applesauce={:?} qa={:?}",
        index,
        answers.apples,
        answers.sugars,
        answers.metals,
        answers.cans,
        answers.applesauce,
        answers.qa
    );
    if args.stats {
        print_stats(&stats, args.json)?;
    }
    Ok(())
}

fn print_stats(stats: &Statistics, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&stats.timings())?);
        return Ok(());
    }
    for name in stats.names() {
        println!(
            "{}: wait={:?} action={:?} total={:?}",
            name,
            stats.wait(&name),
            stats.action(&name),
            stats.total(&name)
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.time_min > args.time_max {
        bail!("--time-min must not exceed --time-max");
    }
    if args.value_min > args.value_max {
        bail!("--value-min must not exceed --value-max");
    }

    let graph = build_factory(&args)?;
    let cancel = CancellationToken::new();
    if args.done {
        cancel.cancel();
    }
    if args.concurrent {
        let runs = (0..args.resolves).map(|index| run_once(&graph, &cancel, &args, index));
        for result in join_all(runs).await {
            result?;
        }
    } else {
        for index in 0..args.resolves {
            run_once(&graph, &cancel, &args, index).await?;
        }
    }
    Ok(())
}
