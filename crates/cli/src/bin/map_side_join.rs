use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use msj_core::MalformedPolicy;
use msj_runtime::metrics::{MetricsRegistry, StageTimer};
use msj_runtime::output::write_partitions;
use msj_runtime::{init_tracing, run_job, JobConfig, OutputFormat};

/// Count ratings per user and join the top users with their attributes.
#[derive(Parser, Debug)]
#[command(name = "map_side_join")]
struct Args {
    /// JSON job config. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reference dataset (users.dat).
    #[arg(long)]
    reference: Option<PathBuf>,
    /// Primary inputs (ratings.dat), read in order.
    primary: Vec<PathBuf>,
    /// Directory for part-m-* files. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Users kept per partition.
    #[arg(short = 'k', long = "top")]
    k: Option<usize>,
    #[arg(long)]
    delimiter: Option<String>,
    /// Number of partitions, one per worker thread.
    #[arg(short, long)]
    workers: Option<usize>,
    /// skip or fail
    #[arg(long)]
    malformed: Option<MalformedPolicy>,
    /// text or json
    #[arg(long)]
    format: Option<OutputFormat>,
    /// Print a JSON metrics line to stderr when the job finishes.
    #[arg(long)]
    metrics: bool,
}

impl Args {
    fn into_config(self) -> Result<JobConfig> {
        let mut cfg = match &self.config {
            Some(path) => JobConfig::from_json_file(path)?,
            None => JobConfig::default(),
        };
        if let Some(reference) = self.reference {
            cfg.reference_path = reference;
        }
        if !self.primary.is_empty() {
            cfg.primary_paths = self.primary;
        }
        if self.output.is_some() {
            cfg.output = self.output;
        }
        if let Some(k) = self.k {
            cfg.k = k;
        }
        if let Some(delimiter) = self.delimiter {
            cfg.delimiter = delimiter;
        }
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(malformed) = self.malformed {
            cfg.malformed = malformed;
        }
        if let Some(format) = self.format {
            cfg.format = format;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let print_metrics = args.metrics;
    let cfg = args.into_config()?;

    let metrics = MetricsRegistry::default();
    let timer = StageTimer::start();
    let outputs = run_job(&cfg, &metrics)?;
    write_partitions(&outputs, cfg.output.as_deref(), cfg.format).context("writing job output")?;

    let elapsed = timer.elapsed();
    let snapshot = metrics.snapshot();
    info!(
        partitions = outputs.len(),
        duration_ms = elapsed.as_millis() as u64,
        ?snapshot,
        "job complete"
    );
    if print_metrics {
        eprintln!("{}", snapshot.to_json_line("map_side_join", Some(elapsed)));
    }
    Ok(())
}
