//! Views over a finished partition: top-K ranking, reference join and summary.

use serde::{Deserialize, Serialize};

pub mod join;
pub mod summary;
pub mod topk;

pub use join::join_results;
pub use summary::RankingSummary;
pub use topk::{ranking_order, select_top_k};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopKConfig {
    pub k: usize,
}

impl Default for TopKConfig {
    fn default() -> Self {
        Self { k: 10 }
    }
}
