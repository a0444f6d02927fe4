use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Job-wide counters shared by every partition.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    reference_records: AtomicU64,
    reference_skipped: AtomicU64,
    primary_records: AtomicU64,
    primary_skipped: AtomicU64,
    empty_lines: AtomicU64,
    emitted_records: AtomicU64,
    unmatched_records: AtomicU64,
    distinct_keys_peak: AtomicU64,
}

impl MetricsRegistry {
    pub fn inc_reference_records(&self, delta: u64) {
        self.inner.reference_records.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_reference_skipped(&self, delta: u64) {
        self.inner.reference_skipped.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_primary_records(&self, delta: u64) {
        self.inner.primary_records.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_primary_skipped(&self, delta: u64) {
        self.inner.primary_skipped.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_empty_lines(&self, delta: u64) {
        self.inner.empty_lines.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_emitted_records(&self, delta: u64) {
        self.inner.emitted_records.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_unmatched_records(&self, delta: u64) {
        self.inner.unmatched_records.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn record_distinct_keys(&self, distinct: u64) {
        self.inner
            .distinct_keys_peak
            .fetch_max(distinct, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reference_records: self.inner.reference_records.load(Ordering::Relaxed),
            reference_skipped: self.inner.reference_skipped.load(Ordering::Relaxed),
            primary_records: self.inner.primary_records.load(Ordering::Relaxed),
            primary_skipped: self.inner.primary_skipped.load(Ordering::Relaxed),
            empty_lines: self.inner.empty_lines.load(Ordering::Relaxed),
            emitted_records: self.inner.emitted_records.load(Ordering::Relaxed),
            unmatched_records: self.inner.unmatched_records.load(Ordering::Relaxed),
            distinct_keys_peak: self.inner.distinct_keys_peak.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub reference_records: u64,
    pub reference_skipped: u64,
    pub primary_records: u64,
    pub primary_skipped: u64,
    pub empty_lines: u64,
    pub emitted_records: u64,
    pub unmatched_records: u64,
    pub distinct_keys_peak: u64,
}

impl MetricsSnapshot {
    pub fn to_json_line(&self, label: &str, elapsed: Option<Duration>) -> String {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            label: &'a str,
            #[serde(flatten)]
            counters: &'a MetricsSnapshot,
            elapsed_ms: Option<u128>,
        }

        let payload = Snapshot {
            label,
            counters: self,
            elapsed_ms: elapsed.map(|d| d.as_millis()),
        };
        serde_json::to_string(&payload).unwrap_or_else(|_| String::from("{}"))
    }
}

pub struct StageTimer {
    start: Instant,
}

impl StageTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
