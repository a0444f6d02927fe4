use std::collections::hash_map;
use std::collections::HashMap;

use crate::record::{MalformedPolicy, ParseError, PrimaryRecord};
use crate::{CoreError, Count, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Counted(RecordId),
    Empty,
    Skipped,
}

/// Per-key occurrence counter for one partition of the primary stream.
#[derive(Debug, Default)]
pub struct FrequencyAggregator {
    counts: HashMap<RecordId, Count>,
    observed: u64,
}

impl FrequencyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, id: RecordId) {
        *self.counts.entry(id).or_insert(0) += 1;
        self.observed += 1;
    }

    /// Parse one primary line and count its id. Empty lines are ignored;
    /// malformed lines go through `policy`.
    pub fn observe_line(
        &mut self,
        origin: &str,
        line_no: u64,
        line: &str,
        delimiter: &str,
        policy: MalformedPolicy,
    ) -> Result<LineOutcome, CoreError> {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            return Ok(LineOutcome::Empty);
        }
        match PrimaryRecord::parse(line, delimiter) {
            Ok(record) => {
                self.observe(record.id);
                Ok(LineOutcome::Counted(record.id))
            }
            Err(source) => self.reject_line(origin, line_no, source, policy),
        }
    }

    /// Route a line that could not be read as a record (bad field, bad
    /// encoding) through `policy`.
    pub fn reject_line(
        &mut self,
        origin: &str,
        line_no: u64,
        source: ParseError,
        policy: MalformedPolicy,
    ) -> Result<LineOutcome, CoreError> {
        policy.absorb(CoreError::Parse {
            origin: origin.to_string(),
            line: line_no,
            source,
        })?;
        Ok(LineOutcome::Skipped)
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// End aggregation. The returned table has no mutating methods, so ranking
    /// can only ever see the final counts.
    pub fn finish(self) -> CounterTable {
        CounterTable {
            counts: self.counts,
            total: self.observed,
        }
    }
}

/// Frozen counts handed to ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterTable {
    counts: HashMap<RecordId, Count>,
    total: u64,
}

impl CounterTable {
    /// Absent ids count as zero.
    pub fn get(&self, id: RecordId) -> Count {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.counts.iter(),
        }
    }
}

pub struct Iter<'a> {
    inner: hash_map::Iter<'a, RecordId, Count>,
}

impl Iterator for Iter<'_> {
    type Item = (RecordId, Count);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(id, count)| (*id, *count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a CounterTable {
    type Item = (RecordId, Count);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<RecordId> for CounterTable {
    fn from_iter<I: IntoIterator<Item = RecordId>>(iter: I) -> Self {
        let mut aggregator = FrequencyAggregator::new();
        for id in iter {
            aggregator.observe(id);
        }
        aggregator.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(lines: &[&str]) -> (FrequencyAggregator, Vec<LineOutcome>) {
        let mut agg = FrequencyAggregator::new();
        let outcomes = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                agg.observe_line("ratings.dat", i as u64 + 1, line, "::", MalformedPolicy::Skip)
                    .unwrap()
            })
            .collect();
        (agg, outcomes)
    }

    #[test]
    fn counts_match_occurrences() {
        let (agg, _) = feed(&["1::x::y", "1::x::y", "2::x::y"]);
        let table = agg.finish();
        assert_eq!(table.get(1), 2);
        assert_eq!(table.get(2), 1);
        assert_eq!(table.get(3), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.total(), 3);
    }

    #[test]
    fn empty_lines_do_not_count() {
        let (agg, outcomes) = feed(&["", "3::1::5", "", "\r"]);
        assert_eq!(
            outcomes,
            vec![
                LineOutcome::Empty,
                LineOutcome::Counted(3),
                LineOutcome::Empty,
                LineOutcome::Empty
            ]
        );
        assert_eq!(agg.observed(), 1);
        assert_eq!(agg.distinct(), 1);
    }

    #[test]
    fn malformed_primary_line_is_skipped() {
        let (agg, outcomes) = feed(&["abc::1::5", "4::1::5"]);
        assert_eq!(outcomes[0], LineOutcome::Skipped);
        assert_eq!(agg.finish().get(4), 1);
    }

    #[test]
    fn malformed_primary_line_fails_under_strict_policy() {
        let mut agg = FrequencyAggregator::new();
        let err = agg
            .observe_line("ratings.dat", 7, "abc::1", "::", MalformedPolicy::Fail)
            .unwrap_err();
        assert!(err.is_parse());
        assert_eq!(agg.observed(), 0);
    }

    #[test]
    fn key_set_is_distinct_observed_ids() {
        let table: CounterTable = [5, 9, 5, 5, 11].into_iter().collect();
        let mut keys: Vec<_> = table.iter().map(|(id, _)| id).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![5, 9, 11]);
        assert_eq!(table.get(5), 3);
    }
}
