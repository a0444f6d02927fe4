use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use msj_core::{MalformedPolicy, DEFAULT_DELIMITER};
use msj_views::TopKConfig;

use crate::PipelineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `id\tpayload`, one record per line.
    #[default]
    Text,
    JsonLines,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::JsonLines => f.write_str("json_lines"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "tsv" => Ok(OutputFormat::Text),
            "json" | "jsonl" | "json_lines" => Ok(OutputFormat::JsonLines),
            other => Err(format!("unknown output format '{other}' (expected text or json)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JobConfig {
    pub reference_path: PathBuf,
    pub primary_paths: Vec<PathBuf>,
    /// Directory for `part-m-*` files; stdout when unset.
    pub output: Option<PathBuf>,
    pub k: usize,
    pub delimiter: String,
    pub workers: usize,
    pub malformed: MalformedPolicy,
    pub format: OutputFormat,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            reference_path: PathBuf::from("users.dat"),
            primary_paths: Vec::new(),
            output: None,
            k: TopKConfig::default().k,
            delimiter: DEFAULT_DELIMITER.to_string(),
            workers: 1,
            malformed: MalformedPolicy::default(),
            format: OutputFormat::default(),
        }
    }
}

impl JobConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path).map_err(|source| PipelineError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.delimiter.is_empty() {
            return Err(PipelineError::Config("delimiter must not be empty".into()));
        }
        if self.k == 0 {
            return Err(PipelineError::Config("k must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(PipelineError::Config("workers must be at least 1".into()));
        }
        if self.primary_paths.is_empty() {
            return Err(PipelineError::Config("at least one primary input is required".into()));
        }
        Ok(())
    }

    pub fn top_k(&self) -> TopKConfig {
        TopKConfig { k: self.k }
    }
}
