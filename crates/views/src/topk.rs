use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use msj_core::{CounterTable, RankedEntry};

/// Total ranking order: higher count first, then lower id first.
pub fn ranking_order(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id))
}

/// Heap wrapper where `Greater` means "ranks ahead".
#[derive(Debug, PartialEq, Eq)]
struct Ranked(RankedEntry);

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        ranking_order(&other.0, &self.0)
    }
}

/// Pick the `k` best entries from a finished counter table, best first.
///
/// Keeps a min-heap of at most `k` entries, so memory beyond the table itself
/// is O(k). The result does not depend on the table's iteration order.
pub fn select_top_k(counters: &CounterTable, k: usize) -> Vec<RankedEntry> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k.min(counters.len()) + 1);
    for (id, count) in counters {
        heap.push(Reverse(Ranked(RankedEntry { id, count })));
        if heap.len() > k {
            heap.pop();
        }
    }

    // ascending by Reverse is descending by rank
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(Ranked(entry))| entry)
        .collect()
}
