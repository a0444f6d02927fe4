use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::lines::DecodedLines;
use crate::record::{MalformedPolicy, ReferenceRecord};
use crate::{CoreError, RecordId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub lines: u64,
    pub loaded: u64,
    pub skipped: u64,
    pub empty: u64,
    /// Lines whose id was already present; the later line wins.
    pub overwritten: u64,
}

/// Exact-match lookup from id to the formatted attribute string. Read-only
/// once built.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: HashMap<RecordId, String>,
}

impl ReferenceTable {
    /// Load the reference dataset from a file. The handle is closed on every
    /// return path, including a parse failure under [`MalformedPolicy::Fail`].
    pub fn load(
        path: &Path,
        delimiter: &str,
        policy: MalformedPolicy,
    ) -> Result<(Self, LoadStats), CoreError> {
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|e| CoreError::unavailable(origin.clone(), e))?;
        Self::from_reader(BufReader::new(file), &origin, delimiter, policy)
    }

    pub fn from_reader<R: BufRead>(
        reader: R,
        origin: &str,
        delimiter: &str,
        policy: MalformedPolicy,
    ) -> Result<(Self, LoadStats), CoreError> {
        let mut table = Self::default();
        let mut stats = LoadStats::default();

        for next in DecodedLines::new(reader) {
            let (line_no, decoded) = next.map_err(|e| CoreError::unavailable(origin, e))?;
            stats.lines += 1;

            let parsed = decoded.and_then(|line| {
                let line = line.trim_end_matches('\r');
                if line.is_empty() {
                    Ok(None)
                } else {
                    ReferenceRecord::parse(line, delimiter).map(Some)
                }
            });

            match parsed {
                Ok(None) => stats.empty += 1,
                Ok(Some(record)) => {
                    if table.insert(&record) {
                        debug!(id = record.id, line = line_no, "reference id overwritten");
                        stats.overwritten += 1;
                    }
                    stats.loaded += 1;
                }
                Err(source) => {
                    policy.absorb(CoreError::Parse {
                        origin: origin.to_string(),
                        line: line_no,
                        source,
                    })?;
                    stats.skipped += 1;
                }
            }
        }

        info!(
            origin,
            entries = table.len(),
            lines = stats.lines,
            skipped = stats.skipped,
            overwritten = stats.overwritten,
            "reference table loaded"
        );
        Ok((table, stats))
    }

    /// Returns true when an earlier value for the same id was replaced.
    fn insert(&mut self, record: &ReferenceRecord) -> bool {
        self.entries
            .insert(record.id, record.lookup_value())
            .is_some()
    }

    pub fn get(&self, id: RecordId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ReferenceRecord> for ReferenceTable {
    fn from_iter<I: IntoIterator<Item = ReferenceRecord>>(iter: I) -> Self {
        let mut table = Self::default();
        for record in iter {
            table.insert(&record);
        }
        table
    }
}
