//! Runtime bootstrap: tracing, the timely worker pool that hosts partitions,
//! and the per-partition pipeline.

use anyhow::{anyhow, Result};
use tracing::{info, Level};

pub mod config;
pub mod error;
pub mod job;
pub mod metrics;
pub mod output;
pub mod pipeline;

pub use config::{JobConfig, OutputFormat};
pub use error::PipelineError;
pub use job::{run_job, run_partition, PartitionOutput, PartitionSlice};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .try_init();
}

/// Start a single-process timely runtime with `workers` threads and run `f`
/// once per worker with `(index, peers)`. Results come back in worker order.
pub fn start_partitions<T, F>(workers: usize, f: F) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Fn(usize, usize) -> T + Send + Sync + 'static,
{
    info!(%workers, "starting timely runtime");
    timely::execute(timely::Config::process(workers), move |worker| {
        f(worker.index(), worker.peers())
    })
    .map_err(|e| anyhow!("failed to start timely runtime: {e}"))?
    .join()
    .into_iter()
    .enumerate()
    .map(|(index, result)| result.map_err(|e| anyhow!("worker {index} terminated abnormally: {e}")))
    .collect()
}
