//! Per-partition pipeline stages.
//!
//! `Uninitialized -> ReferenceLoaded -> Aggregating -> Finalized`. Each stage is
//! its own type and every transition consumes the previous one, so a partition
//! cannot count records before its reference table exists or resume counting
//! once it has been finalized.

use std::fmt;
use std::io::BufRead;
use std::path::Path;

use tracing::{debug, info};

use msj_core::{
    CoreError, CounterTable, DecodedLines, FrequencyAggregator, LineOutcome, LoadStats,
    MalformedPolicy, OutputRecord, ParseError, RankedEntry, ReferenceTable,
};
use msj_views::{join_results, select_top_k, RankingSummary};

use crate::metrics::MetricsRegistry;
use crate::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uninitialized,
    ReferenceLoaded,
    Aggregating,
    Finalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Uninitialized => "uninitialized",
            Stage::ReferenceLoaded => "reference_loaded",
            Stage::Aggregating => "aggregating",
            Stage::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Line-level tallies for the primary stream of one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineTally {
    pub counted: u64,
    pub empty: u64,
    pub skipped: u64,
}

pub struct Uninitialized {
    delimiter: String,
    policy: MalformedPolicy,
    metrics: MetricsRegistry,
}

impl Uninitialized {
    pub fn new(delimiter: impl Into<String>, policy: MalformedPolicy, metrics: MetricsRegistry) -> Self {
        Self {
            delimiter: delimiter.into(),
            policy,
            metrics,
        }
    }

    pub fn stage(&self) -> Stage {
        Stage::Uninitialized
    }

    pub fn load_path(self, path: &Path) -> Result<ReferenceLoaded, PipelineError> {
        let loaded = ReferenceTable::load(path, &self.delimiter, self.policy)?;
        Ok(self.into_loaded(loaded))
    }

    pub fn load<R: BufRead>(self, reader: R, origin: &str) -> Result<ReferenceLoaded, PipelineError> {
        let loaded = ReferenceTable::from_reader(reader, origin, &self.delimiter, self.policy)?;
        Ok(self.into_loaded(loaded))
    }

    fn into_loaded(self, (table, stats): (ReferenceTable, LoadStats)) -> ReferenceLoaded {
        self.metrics.inc_reference_records(stats.loaded);
        self.metrics.inc_reference_skipped(stats.skipped);
        debug!(from = %Stage::Uninitialized, to = %Stage::ReferenceLoaded, "stage transition");
        ReferenceLoaded {
            table,
            stats,
            delimiter: self.delimiter,
            policy: self.policy,
            metrics: self.metrics,
        }
    }
}

pub struct ReferenceLoaded {
    table: ReferenceTable,
    stats: LoadStats,
    delimiter: String,
    policy: MalformedPolicy,
    metrics: MetricsRegistry,
}

impl ReferenceLoaded {
    pub fn stage(&self) -> Stage {
        Stage::ReferenceLoaded
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    pub fn load_stats(&self) -> LoadStats {
        self.stats
    }

    pub fn start_aggregating(self) -> Aggregating {
        debug!(from = %Stage::ReferenceLoaded, to = %Stage::Aggregating, "stage transition");
        Aggregating {
            table: self.table,
            aggregator: FrequencyAggregator::new(),
            tally: LineTally::default(),
            delimiter: self.delimiter,
            policy: self.policy,
            metrics: self.metrics,
        }
    }
}

pub struct Aggregating {
    table: ReferenceTable,
    aggregator: FrequencyAggregator,
    tally: LineTally,
    delimiter: String,
    policy: MalformedPolicy,
    metrics: MetricsRegistry,
}

impl Aggregating {
    pub fn stage(&self) -> Stage {
        Stage::Aggregating
    }

    pub fn tally(&self) -> LineTally {
        self.tally
    }

    pub fn observe_line(&mut self, origin: &str, line_no: u64, line: &str) -> Result<LineOutcome, PipelineError> {
        let outcome =
            self.aggregator
                .observe_line(origin, line_no, line, &self.delimiter, self.policy)?;
        Ok(self.record(outcome))
    }

    /// Like [`Aggregating::observe_line`] for a line that may have failed to
    /// decode; a decode failure is handled as a malformed line.
    pub fn observe_decoded(
        &mut self,
        origin: &str,
        line_no: u64,
        decoded: Result<String, ParseError>,
    ) -> Result<LineOutcome, PipelineError> {
        match decoded {
            Ok(line) => self.observe_line(origin, line_no, &line),
            Err(source) => {
                let outcome = self
                    .aggregator
                    .reject_line(origin, line_no, source, self.policy)?;
                Ok(self.record(outcome))
            }
        }
    }

    fn record(&mut self, outcome: LineOutcome) -> LineOutcome {
        match outcome {
            LineOutcome::Counted(_) => {
                self.tally.counted += 1;
                self.metrics.inc_primary_records(1);
            }
            LineOutcome::Empty => {
                self.tally.empty += 1;
                self.metrics.inc_empty_lines(1);
            }
            LineOutcome::Skipped => {
                self.tally.skipped += 1;
                self.metrics.inc_primary_skipped(1);
            }
        }
        outcome
    }

    /// Consume every line of `reader`.
    pub fn aggregate<R: BufRead>(&mut self, reader: R, origin: &str) -> Result<(), PipelineError> {
        for next in DecodedLines::new(reader) {
            let (line_no, decoded) = next.map_err(|e| CoreError::unavailable(origin, e))?;
            self.observe_decoded(origin, line_no, decoded)?;
        }
        Ok(())
    }

    pub fn finalize(self, k: usize) -> Finalized {
        let counters = self.aggregator.finish();
        self.metrics.record_distinct_keys(counters.len() as u64);

        let ranked = select_top_k(&counters, k);
        let output = join_results(&ranked, &self.table);
        let unmatched = output.iter().filter(|r| !r.is_match()).count() as u64;
        self.metrics.inc_emitted_records(output.len() as u64);
        self.metrics.inc_unmatched_records(unmatched);

        let summary = RankingSummary::from_entries(&ranked);
        info!(
            distinct = counters.len(),
            counted = self.tally.counted,
            skipped = self.tally.skipped,
            emitted = output.len(),
            unmatched,
            highest = summary.highest,
            "partition finalized"
        );

        Finalized {
            counters,
            ranked,
            output,
            summary,
            tally: self.tally,
        }
    }
}

pub struct Finalized {
    counters: CounterTable,
    ranked: Vec<RankedEntry>,
    output: Vec<OutputRecord>,
    summary: RankingSummary,
    tally: LineTally,
}

impl Finalized {
    pub fn stage(&self) -> Stage {
        Stage::Finalized
    }

    pub fn counters(&self) -> &CounterTable {
        &self.counters
    }

    pub fn ranked(&self) -> &[RankedEntry] {
        &self.ranked
    }

    pub fn output(&self) -> &[OutputRecord] {
        &self.output
    }

    pub fn summary(&self) -> RankingSummary {
        self.summary
    }

    pub fn tally(&self) -> LineTally {
        self.tally
    }

    pub fn into_output(self) -> Vec<OutputRecord> {
        self.output
    }
}
