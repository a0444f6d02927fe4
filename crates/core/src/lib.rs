//! Core types for the map-side join: reference lookup, per-key counters and
//! the records that flow between pipeline stages.

use std::io;

use serde::{Deserialize, Serialize};

pub mod counter;
pub mod lines;
pub mod record;
pub mod reference;

pub use counter::{CounterTable, FrequencyAggregator, LineOutcome};
pub use lines::DecodedLines;
pub use record::{MalformedPolicy, ParseError, PrimaryRecord, ReferenceRecord};
pub use reference::{LoadStats, ReferenceTable};

pub type RecordId = i64;
pub type Count = u64;

/// Field delimiter used by the MovieLens-style `.dat` files.
pub const DEFAULT_DELIMITER: &str = "::";

/// Payload emitted for a ranked id that has no reference entry.
pub const NO_DETAILS: &str = "No relevant details found";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RankedEntry {
    pub id: RecordId,
    pub count: Count,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputRecord {
    pub id: RecordId,
    pub payload: String,
}

impl OutputRecord {
    pub fn matched(id: RecordId, attributes: &str, count: Count) -> Self {
        Self {
            id,
            payload: format!("{attributes}\t{count}"),
        }
    }

    pub fn unmatched(id: RecordId) -> Self {
        Self {
            id,
            payload: NO_DETAILS.to_string(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.payload != NO_DETAILS
    }

    /// Tab-separated `id\tpayload`, the layout of a map-only text output file.
    pub fn to_text_line(&self) -> String {
        format!("{}\t{}", self.id, self.payload)
    }

    pub fn to_json_line(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("source '{origin}' is unavailable: {source}")]
    SourceUnavailable {
        origin: String,
        #[source]
        source: io::Error,
    },
    #[error("{origin}:{line}: {source}")]
    Parse {
        origin: String,
        line: u64,
        #[source]
        source: ParseError,
    },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CoreError {
    pub fn unavailable(origin: impl Into<String>, source: io::Error) -> Self {
        Self::SourceUnavailable {
            origin: origin.into(),
            source,
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
