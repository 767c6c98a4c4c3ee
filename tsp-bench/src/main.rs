//! Benchmarking CLI for the TSP branch-and-cut solver.

mod choices;
mod logging;
mod report;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tsp_core::lp::MicroLpRelaxation;
use tsp_core::{EdgePlan, Executor, Instance, LogObserver, TspSettings};

use choices::{BranchingChoice, CutChoice, LogFormat, LogLevel, SelectionChoice};
use report::{BenchReport, RunRecord};

#[derive(Parser)]
#[command(name = "tsp-bench")]
#[command(about = "Run the branch-and-cut TSP solver on benchmark instances")]
struct Cmd {
    #[command(flatten)]
    solver: SolverArgs,

    /// Write a JSON report here
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Prefix log lines with a millisecond timestamp
    #[arg(long)]
    log_timestamp: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Random Euclidean instances on a 1000x1000 grid
    Random {
        #[arg(long, default_value_t = 12)]
        cities: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Number of instances, with seeds seed, seed+1, ...
        #[arg(long, default_value_t = 5)]
        instances: usize,
    },
    /// A symmetric cost matrix stored as a JSON array of rows
    Matrix {
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Args)]
struct SolverArgs {
    /// Time limit per instance, in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    #[arg(long, default_value_t = 100_000)]
    max_nodes: u64,

    #[arg(long, value_enum, default_value_t = BranchingChoice::MostFractional)]
    branching: BranchingChoice,

    /// Candidates probed by strong branching
    #[arg(long, default_value_t = 5)]
    strong_candidates: usize,

    #[arg(long, value_enum, default_value_t = SelectionChoice::DepthFirst)]
    selection: SelectionChoice,

    #[arg(long, value_enum, default_value_t = CutChoice::Default)]
    cuts: CutChoice,

    /// Start the LP from the k nearest neighbors of each city; other
    /// edges enter by pricing
    #[arg(long)]
    nearest: Option<usize>,

    /// Separation rounds per node before branching on a fractional point
    #[arg(long, default_value_t = 50)]
    max_cut_rounds: usize,

    /// Purged cuts kept for re-separation (0 disables the pool)
    #[arg(long, default_value_t = 500)]
    pool_capacity: usize,

    /// Keep only cuts that are tight at the incumbent
    #[arg(long)]
    primal_filter: bool,

    /// Log progress every N nodes
    #[arg(long, default_value_t = 100)]
    log_freq: u64,
}

impl SolverArgs {
    fn settings(&self) -> TspSettings {
        let mut settings = TspSettings::default()
            .with_max_nodes(self.max_nodes)
            .with_branching(self.branching.to_rule(self.strong_candidates))
            .with_node_selection(self.selection.into())
            .with_aggressiveness(self.cuts.into())
            .with_primal_filter(self.primal_filter)
            .with_max_cut_rounds(self.max_cut_rounds)
            .with_pool_capacity(self.pool_capacity);
        if let Some(seconds) = self.time_limit {
            settings = settings.with_time_limit(seconds);
        }
        if let Some(k) = self.nearest {
            settings = settings.with_edge_plan(EdgePlan::Nearest { k });
        }
        settings.log_freq = self.log_freq;
        settings
    }
}

fn load_matrix(path: &PathBuf) -> Result<Instance> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;
    let rows: Vec<Vec<f64>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "matrix".to_string());
    Ok(Instance::from_matrix(rows)?.with_name(name))
}

fn run_instance(inst: &Instance, settings: &TspSettings) -> Result<RunRecord> {
    let name = inst.name().unwrap_or("unnamed").to_string();
    let mut exec = Executor::new(inst, settings.clone(), MicroLpRelaxation::new(), None)
        .with_context(|| format!("Failed to set up {}", name))?
        .with_observer(Box::new(LogObserver::new(settings.log_freq)));
    let sol = exec
        .run()
        .with_context(|| format!("Solve failed on {}", name))?;
    log::debug!("{}: {:?}", name, exec.stats());
    Ok(RunRecord::new(name, inst.num_nodes(), &sol))
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    logging::init_logger(cmd.log_level, cmd.log_format, cmd.log_timestamp)
        .context("Failed to initialise logging")?;

    let settings = cmd.solver.settings();
    let instances: Vec<Instance> = match &cmd.action {
        Action::Random {
            cities,
            seed,
            instances,
        } => (0..*instances as u64)
            .map(|i| Instance::random_euclidean(*cities, seed + i))
            .collect::<Result<_, _>>()?,
        Action::Matrix { input } => vec![load_matrix(input)?],
    };

    let mut runs = Vec::with_capacity(instances.len());
    for inst in &instances {
        runs.push(run_instance(inst, &settings)?);
    }

    report::print_table(&runs);
    let bench = BenchReport::new(runs);
    println!(
        "\n{} instances, {} optimal ({} proven), {:.1}s total",
        bench.summary.total,
        bench.summary.optimal,
        bench.summary.proven,
        bench.summary.total_time_ms as f64 / 1000.0
    );

    if let Some(path) = &cmd.out {
        bench.save_json(path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}
