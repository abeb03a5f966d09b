//! splitbrain — compile a dataflow model graph into per-component execution
//! plans for a distributed runtime.
//!
//! Reads a JSON model description, partitions it, compiles the per-component
//! schedules with explicit Send/Recv placeholders, and writes the encoded
//! plan (MessagePack by default, pretty JSON with `--json`).

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use splitbrain_core::CompilerConfig;
use splitbrain_encode::compile;
use splitbrain_graph::ModelGraph;

/// Compile a model graph into a distributed execution plan.
#[derive(Parser, Debug)]
#[command(name = "splitbrain", version, about)]
struct Cli {
    /// Path to the JSON model description.
    #[arg(long)]
    model: PathBuf,

    /// Where to write the compiled plan.
    #[arg(long, short)]
    output: PathBuf,

    /// Path to a splitbrain.toml config file.
    #[arg(long, env = "SPLITBRAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Number of components to compile for (overrides config).
    #[arg(long, short)]
    n_components: Option<usize>,

    /// Partition strategy: random, balanced, spectral or multilevel
    /// (overrides config).
    #[arg(long, short)]
    strategy: Option<String>,

    /// Filtered edges at or above this size cannot cross a boundary
    /// (overrides config).
    #[arg(long)]
    straddle_limit: Option<f64>,

    /// Seed for the random strategy (overrides config).
    #[arg(long)]
    seed: Option<u64>,

    /// Write pretty JSON instead of MessagePack.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            let default_path = "splitbrain.toml";
            match CompilerConfig::from_file(default_path) {
                Ok(config) => {
                    info!(path = default_path, "loaded config");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "no config file, using defaults");
                    CompilerConfig::default()
                }
            }
        }
    };
    if let Some(n) = cli.n_components {
        config.n_components = n;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = Some(strategy);
    }
    if let Some(limit) = cli.straddle_limit {
        config.straddle_limit = Some(limit);
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let text = std::fs::read_to_string(&cli.model)
        .with_context(|| format!("reading model from {}", cli.model.display()))?;
    let model: ModelGraph = serde_json::from_str(&text).context("parsing model description")?;

    info!(
        objects = model.objects.len(),
        edges = model.edges.len(),
        operators = model.ops().len(),
        probes = model.probes.len(),
        n_components = config.n_components,
        "compiling model"
    );

    let plan = compile(&model, &config)?;
    plan.write(&cli.output, cli.json)?;

    info!(
        n_components = plan.n_components,
        output = %cli.output.display(),
        "compilation complete"
    );
    Ok(())
}
