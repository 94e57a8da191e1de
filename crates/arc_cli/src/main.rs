//! Arc CLI
//!
//! Feeds JSONL telemetry frames through a compiled Arc graph and prints the
//! channel writes each frame produces.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod wire;

use arc_ir::Ir;
use arc_runtime::{CancellationToken, Runtime, RuntimeError};
use arc_wasm::WasmFactory;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{bail, Result, WrapErr};
use config::CliConfig;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arc")]
#[command(about = "Arc - reactive dataflow runtime for compiled telemetry graphs", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run frames through a graph
    Run(RunArgs),
    /// Check a graph for structural errors
    Validate {
        /// Path to the IR JSON
        #[arg(short, long)]
        ir: PathBuf,
    },
    /// Summarize a graph
    Inspect {
        /// Path to the IR JSON
        #[arg(short, long)]
        ir: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to the IR JSON
    #[arg(short, long)]
    ir: PathBuf,
    /// JSONL frames, one per line; stdin when omitted
    #[arg(short, long)]
    frames: Option<PathBuf>,
    /// JSON config with optional `runtime` and `sandbox` sections
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log a failed frame and continue with the next one
    #[arg(long)]
    keep_going: bool,
    /// Print statistics to stderr when done
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Validate { ir } => validate(&ir),
        Commands::Inspect { ir } => inspect(&ir),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,arc_runtime=info,arc_wasm=info,arc_cli=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_ir(path: &Path) -> Result<Ir> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading IR {}", path.display()))?;
    Ir::from_json(&text).wrap_err_with(|| format!("parsing IR {}", path.display()))
}

async fn run(args: RunArgs) -> Result<()> {
    let ir = load_ir(&args.ir)?;
    let config = CliConfig::load(args.config.as_deref())?;
    let cancel = CancellationToken::new();

    let mut worker = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || process(&ir, &config, &args, cancel))
    };
    tokio::select! {
        joined = &mut worker => return joined?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            warn!("interrupted, stopping after the current node");
            cancel.cancel();
        }
    }
    worker.await?
}

fn process(ir: &Ir, config: &CliConfig, args: &RunArgs, cancel: CancellationToken) -> Result<()> {
    let types = ir.channel_types()?;
    let factory = WasmFactory::new(config.sandbox.clone())?;
    let mut runtime = Runtime::new(ir, &factory, config.runtime.clone())?.with_cancellation(cancel);
    info!(nodes = ir.nodes.len(), channels = types.len(), "graph loaded");

    let input: Box<dyn BufRead> = match &args.frames {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };
    let mut out = std::io::stdout().lock();
    let mut skipped = 0;

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let decoded = match wire::decode_frame(&line, &types) {
            Ok(decoded) => decoded,
            Err(err) if args.keep_going => {
                error!(line = index + 1, error = %err, "undecodable frame, continuing");
                continue;
            }
            Err(err) => return Err(err).wrap_err_with(|| format!("frame on line {}", index + 1)),
        };
        skipped += decoded.skipped as u64;

        let result = runtime.next(decoded.frame);
        let writes = runtime.flush_writes();
        if !writes.is_empty() {
            serde_json::to_writer(&mut out, &wire::encode_writes(&writes))?;
            writeln!(out)?;
        }
        match result {
            Ok(()) => {}
            Err(RuntimeError::Cancelled) => {
                warn!(line = index + 1, "cancelled");
                break;
            }
            Err(err) if args.keep_going => {
                error!(line = index + 1, error = %err, "frame failed, continuing");
            }
            Err(err) => return Err(err).wrap_err_with(|| format!("frame on line {}", index + 1)),
        }
    }
    out.flush()?;

    let mut stats = runtime.stats();
    stats.series_dropped += skipped;
    runtime.close()?;
    info!(
        frames = stats.frames,
        executions = stats.node_executions,
        invocations = stats.invocations,
        dropped = stats.series_dropped,
        "run finished"
    );
    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let ir = load_ir(path)?;
    match ir.validate() {
        Ok(()) => {
            println!("{}: ok", path.display());
            Ok(())
        }
        Err(errors) => {
            for err in &errors {
                println!("{}: {err}", path.display());
            }
            bail!("{} structural errors", errors.len())
        }
    }
}

fn inspect(path: &Path) -> Result<()> {
    let ir = load_ir(path)?;
    let types = ir.channel_types()?;

    println!("Stages:");
    for stage in &ir.stages {
        let names = |params: &[arc_ir::Param]| {
            params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.data_type))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  {} ({}) -> ({}){}",
            stage.key,
            names(&stage.params),
            names(&stage.outputs),
            stage
                .module
                .as_ref()
                .map_or_else(String::new, |m| format!(" [{} byte module]", m.len()))
        );
    }

    println!("Nodes:");
    for node in &ir.nodes {
        let level = ir
            .strata
            .level(&node.key)
            .map_or_else(|| "-".to_string(), |l| l.to_string());
        println!("  {} = {} @ stratum {level}", node.key, node.stage);
    }

    println!("Channels:");
    for (channel, data_type) in &types {
        println!("  {}: {data_type}", channel.as_u32());
    }

    println!("Edges:");
    for edge in &ir.edges {
        println!("  {} -> {}", edge.source, edge.target);
    }
    Ok(())
}
