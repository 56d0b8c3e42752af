//! pullgraph - run a pipeline definition file
//!
//! ```bash
//! # Drain the sources and print every collected value
//! pullgraph positives.toml
//!
//! # One pass only, plus the graph as Graphviz DOT on stderr
//! pullgraph positives.toml --single --dot
//! ```
//!
//! `RUST_LOG` controls logging (default: `info,pullgraph_rs=debug`). Ctrl+C
//! stops an aggregate run between passes and prints what was gathered; a
//! second Ctrl+C exits immediately.

use anyhow::Context;
use clap::Parser;
use pullgraph_rs::config::PipelineFile;
use pullgraph_rs::pipeline::{Graph, Pipeline, PipelineBuilder};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pullgraph", version, about = "Run a lazy, cached pipeline definition")]
struct Args {
    /// Pipeline definition (TOML, or JSON with a .json extension)
    file: PathBuf,

    /// Print the topology as Graphviz DOT to stderr before running
    #[arg(long)]
    dot: bool,

    /// Run a single pass instead of draining the sources
    #[arg(long)]
    single: bool,

    /// Aggregate without keeping the produced values
    #[arg(long)]
    no_collect: bool,

    /// Print timing summaries of nodes marked `timeit`
    #[arg(long)]
    timings: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pullgraph_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut file = PipelineFile::load(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    if args.single {
        file.settings.aggregate = false;
    }
    if args.no_collect {
        file.settings.collect = false;
    }

    let (mut graph, pipeline) = PipelineBuilder::new().build(&file)?;

    if args.dot {
        eprint!("{}", pipeline.snapshot(&graph)?.to_dot());
    }

    install_cancel_handler(&graph)?;

    let evaluation = pipeline.run(&mut graph)?;
    println!("{}", serde_json::to_string_pretty(&evaluation)?);

    if args.timings {
        print_timings(&graph, &pipeline)?;
    }
    Ok(())
}

/// First Ctrl+C cancels the run between passes, the second exits.
fn install_cancel_handler(graph: &Graph) -> anyhow::Result<()> {
    let token = graph.cancel_token();
    let requested = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler(move || {
        if requested.swap(true, Ordering::SeqCst) {
            eprintln!("Cancellation already requested, exiting");
            std::process::exit(130);
        }
        tracing::warn!("Ctrl+C received, stopping after the current pass");
        token.cancel();
    })
    .context("Failed to install Ctrl+C handler")
}

fn print_timings(graph: &Graph, pipeline: &Pipeline) -> anyhow::Result<()> {
    let topology = pipeline.topology(graph)?;
    for &id in topology.order() {
        if let Some(summary) = graph.timing_summary(id)? {
            eprintln!(
                "{:<24} {:>6} call(s)  total {:>10.3?}  mean {:>10.3?}  max {:>10.3?}",
                graph.name(id)?,
                summary.count,
                summary.total,
                summary.mean,
                summary.max
            );
        }
    }
    Ok(())
}
