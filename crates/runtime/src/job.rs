use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use msj_core::{CoreError, DecodedLines, OutputRecord};
use msj_views::RankingSummary;

use crate::config::JobConfig;
use crate::metrics::{MetricsRegistry, StageTimer};
use crate::pipeline::{LineTally, Uninitialized};
use crate::{start_partitions, PipelineError};

/// Round-robin slice of the primary stream: worker `index` of `peers` owns
/// every line whose zero-based position across all inputs is congruent to
/// `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSlice {
    pub index: usize,
    pub peers: usize,
}

impl PartitionSlice {
    pub fn single() -> Self {
        Self { index: 0, peers: 1 }
    }

    pub fn owns(&self, position: u64) -> bool {
        position % self.peers as u64 == self.index as u64
    }
}

#[derive(Debug, Clone)]
pub struct PartitionOutput {
    pub partition: PartitionSlice,
    pub records: Vec<OutputRecord>,
    pub summary: RankingSummary,
    pub tally: LineTally,
}

/// Load the reference dataset, count this partition's share of the primary
/// inputs and emit its top-K.
pub fn run_partition(
    cfg: &JobConfig,
    partition: PartitionSlice,
    metrics: &MetricsRegistry,
) -> Result<PartitionOutput, PipelineError> {
    let timer = StageTimer::start();
    let mut aggregating = Uninitialized::new(cfg.delimiter.as_str(), cfg.malformed, metrics.clone())
        .load_path(&cfg.reference_path)?
        .start_aggregating();

    let mut position: u64 = 0;
    for path in &cfg.primary_paths {
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|e| CoreError::unavailable(origin.as_str(), e))?;
        for next in DecodedLines::new(BufReader::new(file)) {
            let (line_no, decoded) = next.map_err(|e| CoreError::unavailable(origin.as_str(), e))?;
            let owned = partition.owns(position);
            position += 1;
            if owned {
                aggregating.observe_decoded(&origin, line_no, decoded)?;
            }
        }
    }

    let finalized = aggregating.finalize(cfg.top_k().k);
    info!(
        partition = partition.index,
        peers = partition.peers,
        lines = position,
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "partition complete"
    );

    Ok(PartitionOutput {
        partition,
        summary: finalized.summary(),
        tally: finalized.tally(),
        records: finalized.into_output(),
    })
}

/// Run every partition of the job on the timely worker pool. Any partition
/// failure fails the job.
pub fn run_job(cfg: &JobConfig, metrics: &MetricsRegistry) -> Result<Vec<PartitionOutput>> {
    cfg.validate()?;
    info!(
        reference = %cfg.reference_path.display(),
        inputs = cfg.primary_paths.len(),
        workers = cfg.workers,
        k = cfg.k,
        "starting map-side join"
    );

    let shared = Arc::new(cfg.clone());
    let worker_metrics = metrics.clone();
    let results = start_partitions(cfg.workers, move |index, peers| {
        run_partition(&shared, PartitionSlice { index, peers }, &worker_metrics)
    })?;

    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| result.with_context(|| format!("partition {index} failed")))
        .collect()
}
