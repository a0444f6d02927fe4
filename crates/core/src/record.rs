use std::fmt;
use std::num::ParseIntError;
use std::str::{FromStr, Utf8Error};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{CoreError, RecordId};

/// Fields consumed from a reference line: id, attribute A, attribute B.
pub const REFERENCE_FIELDS: usize = 3;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid id '{value}'")]
    InvalidId {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("line is not valid UTF-8")]
    Encoding {
        #[source]
        source: Utf8Error,
    },
}

fn parse_id(value: &str) -> Result<RecordId, ParseError> {
    value.parse().map_err(|source| ParseError::InvalidId {
        value: value.to_string(),
        source,
    })
}

/// One line of the reference dataset, e.g. `8::M::25::12::11413`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: RecordId,
    pub attribute_a: String,
    pub attribute_b: String,
}

impl ReferenceRecord {
    pub fn parse(line: &str, delimiter: &str) -> Result<Self, ParseError> {
        let mut fields = line.split(delimiter);
        match (fields.next(), fields.next(), fields.next()) {
            (Some(id), Some(a), Some(b)) => Ok(Self {
                id: parse_id(id)?,
                attribute_a: a.to_string(),
                attribute_b: b.to_string(),
            }),
            _ => Err(ParseError::FieldCount {
                expected: REFERENCE_FIELDS,
                found: line.split(delimiter).count(),
            }),
        }
    }

    /// Lookup value with the source fields swapped: `attribute_b\tattribute_a`.
    pub fn lookup_value(&self) -> String {
        format!("{}\t{}", self.attribute_b, self.attribute_a)
    }
}

/// One line of the primary stream; everything after the id is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryRecord {
    pub id: RecordId,
}

impl PrimaryRecord {
    pub fn parse(line: &str, delimiter: &str) -> Result<Self, ParseError> {
        // split always yields at least one field
        let id = line.split(delimiter).next().unwrap_or(line);
        Ok(Self { id: parse_id(id)? })
    }
}

/// What to do with a line that fails to parse. Applied identically to the
/// reference dataset and the primary stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    #[default]
    Skip,
    Fail,
}

impl MalformedPolicy {
    /// Returns `Ok(())` when the error was logged and dropped.
    pub fn absorb(self, err: CoreError) -> Result<(), CoreError> {
        match self {
            MalformedPolicy::Skip => {
                warn!(error = %err, "skipping malformed line");
                Ok(())
            }
            MalformedPolicy::Fail => Err(err),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::Skip => f.write_str("skip"),
            MalformedPolicy::Fail => f.write_str("fail"),
        }
    }
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(MalformedPolicy::Skip),
            "fail" => Ok(MalformedPolicy::Fail),
            other => Err(format!("unknown malformed-line policy '{other}' (expected skip or fail)")),
        }
    }
}
