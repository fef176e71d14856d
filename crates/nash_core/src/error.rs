use thiserror::Error;

use crate::lp::LpError;

/// Errors reported by the analysis operations.
///
/// Validation errors are raised at the boundary of each public operation;
/// no operation returns a partial result alongside an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("Payoff matrix must have at least one strategy.")]
    EmptyMatrix,
    #[error("Payoff matrix must be square, got {rows} rows and a row of length {cols}.")]
    NotSquare { rows: usize, cols: usize },
    #[error("Payoff entry ({row}, {col}) is not finite: {value}.")]
    NonFiniteEntry { row: usize, col: usize, value: f64 },
    #[error("Strategy dimension mismatch. Expected {expected}, got {found}.")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Invalid mixed strategy: {0}")]
    InvalidStrategy(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("No equilibrium found: {0}")]
    NoEquilibrium(#[from] LpError),
}

impl GameError {
    /// True for the errors raised while validating a payoff matrix.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            GameError::EmptyMatrix | GameError::NotSquare { .. } | GameError::NonFiniteEntry { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
