use thiserror::Error;

/// Errors produced while configuring or running the clustering engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KMeansError {
    #[error("n_points={available} should be >= k={k}")]
    InsufficientPoints { k: usize, available: usize },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("coordinates must be finite, got ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },

    #[error("clustering did not converge after {rounds} rounds")]
    NonConvergence { rounds: usize },

    #[error("expected {expected} columns per point, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("KMeans not fitted. Call run() or fit() first.")]
    NotFitted,
}

impl KMeansError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
