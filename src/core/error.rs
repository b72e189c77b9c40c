use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("numPaths must be > 0")]
    InvalidPathCount,

    #[error("{field} must be >= 0, got {value}")]
    NegativeAmount { field: &'static str, value: f64 },

    #[error(
        "projection horizon is empty: current age {current_age} with {years_to_project} years to project (capped at age 85)"
    )]
    EmptyHorizon {
        current_age: u32,
        years_to_project: u32,
    },

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("inflationRate must be > -1, got {0}")]
    InvalidInflation(f64),

    #[error("percentile {0} must be between 0 and 1")]
    InvalidPercentile(f64),

    #[error("cannot aggregate an empty path ensemble")]
    EmptyEnsemble,

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}
