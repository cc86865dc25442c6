use thiserror::Error;

/// Fatal conditions: the snapshot (or the projection) cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("{table} is missing mandatory columns: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("no valid feature columns found in {table}")]
    NoFeatureColumns { table: String },

    #[error("no rows left after matching features with cluster assignments")]
    EmptyDataset,

    #[error("insufficient dimensionality: need at least 2 features for PCA, have {available}")]
    InsufficientDimensionality { available: usize },

    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
