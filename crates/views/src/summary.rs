use msj_core::{Count, RankedEntry};

/// Aggregate figures over a ranked list, as shown beside a top-N report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankingSummary {
    pub results: usize,
    pub highest: Count,
    /// Rounded half away from zero.
    pub average: Count,
    pub total: Count,
}

impl RankingSummary {
    pub fn from_entries(entries: &[RankedEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        let total: Count = entries.iter().map(|e| e.count).sum();
        let highest = entries.iter().map(|e| e.count).max().unwrap_or(0);
        let n = entries.len() as Count;
        Self {
            results: entries.len(),
            highest,
            average: (total + n / 2) / n,
            total,
        }
    }
}
