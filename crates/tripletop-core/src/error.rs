use std::path::PathBuf;

use thiserror::Error;

use crate::Dataset;

/// Validation errors for domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },
}

/// A tabular source could not be acquired. Fatal for the run.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("{dataset} source transport error: {message}")]
    Transport { dataset: Dataset, message: String },

    #[error("{dataset} source returned status {status}")]
    Status { dataset: Dataset, status: u16 },

    #[error("{dataset} payload is not a usable CSV table: {message}")]
    Malformed { dataset: Dataset, message: String },

    #[error("failed to read {dataset} table from '{}': {source}", path.display())]
    Io {
        dataset: Dataset,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceFetchError {
    pub const fn dataset(&self) -> Dataset {
        match self {
            Self::Transport { dataset, .. }
            | Self::Status { dataset, .. }
            | Self::Malformed { dataset, .. }
            | Self::Io { dataset, .. } => *dataset,
        }
    }
}

/// A source table has no usable identity column. Fatal for the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{dataset} table has no company name column (columns: {})", columns.join(", "))]
    MissingNameColumn {
        dataset: Dataset,
        columns: Vec<String>,
    },
}

/// Failure of a single valuation lookup. Always recovered by the enrichment step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("lookup timed out: {0}")]
    Timeout(String),
    #[error("lookup transport error: {0}")]
    Transport(String),
    #[error("symbol not found upstream")]
    NotFound,
    #[error("lookup was rate limited (status {0})")]
    RateLimited(u16),
    #[error("lookup authentication failed: {0}")]
    Auth(String),
    #[error("lookup returned status {0}")]
    Status(u16),
    #[error("lookup response is malformed: {0}")]
    Malformed(String),
}

/// Publishing the report to the spreadsheet sink failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink credentials are missing: {0}")]
    MissingCredentials(String),
    #[error("sink rejected credentials (status {status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("sink quota exhausted: {0}")]
    Quota(String),
    #[error("sink transport error: {0}")]
    Transport(String),
    #[error("sink returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("sink response is malformed: {0}")]
    Malformed(String),
    #[error("failed to format sheet title: {0}")]
    Title(String),
}

/// Reading or writing a CSV artifact failed.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact i/o error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact csv error at '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("artifact '{}' is malformed: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

/// Configuration could not be loaded or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that abort a pipeline run before any artifact is written.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    SourceFetch(#[from] SourceFetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
