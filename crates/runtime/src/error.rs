use std::io;
use std::path::PathBuf;

use msj_core::CoreError;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read config '{path}': {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write output '{target}': {source}")]
    Output {
        target: String,
        #[source]
        source: io::Error,
    },
}
