use msj_core::{OutputRecord, RankedEntry, ReferenceTable};

/// Enrich ranked entries with their reference attributes, preserving order.
pub fn join_results(entries: &[RankedEntry], table: &ReferenceTable) -> Vec<OutputRecord> {
    entries
        .iter()
        .map(|entry| match table.get(entry.id) {
            Some(attributes) => OutputRecord::matched(entry.id, attributes, entry.count),
            None => OutputRecord::unmatched(entry.id),
        })
        .collect()
}
