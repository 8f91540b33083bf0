use thiserror::Error;
use tripletop_core::{
    ArtifactError, ConfigError, PipelineError, SchemaError, SinkError, SourceFetchError,
    ValidationError,
};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("usage error: {0}")]
    Usage(String),

    #[error(transparent)]
    SourceFetch(#[from] SourceFetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl From<PipelineError> for CliError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::SourceFetch(error) => Self::SourceFetch(error),
            PipelineError::Schema(error) => Self::Schema(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Usage(_) => 2,
            Self::Sink(_) => 3,
            Self::SourceFetch(_) => 4,
            Self::Schema(_) => 5,
            Self::Artifact(_) | Self::Serialization(_) => 10,
        }
    }
}
