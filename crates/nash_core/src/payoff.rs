//! Payoff matrix and mixed strategy value types.
//!
//! A [`PayoffMatrix`] is validated once at construction and never mutated
//! afterwards, so it can be shared freely between threads and analyses.

use std::ops::Index;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Tolerance used when checking that a probability vector sums to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Square payoff matrix of a symmetric two-player game.
///
/// Entry `(i, j)` is the payoff to the row player choosing pure strategy `i`
/// against the column player's pure strategy `j`. The column player's payoffs
/// are given by the transpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct PayoffMatrix {
    matrix: DMatrix<f64>,
}

impl PayoffMatrix {
    /// Builds a matrix from row-major rows.
    pub fn new<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let dim = rows.len();
        if dim == 0 {
            return Err(GameError::EmptyMatrix);
        }
        if let Some(row) = rows.iter().map(|r| r.as_ref()).find(|r| r.len() != dim) {
            return Err(GameError::NotSquare {
                rows: dim,
                cols: row.len(),
            });
        }
        let matrix = DMatrix::from_fn(dim, dim, |i, j| rows[i].as_ref()[j]);
        Self::try_from(matrix)
    }

    /// Builds a `dim x dim` matrix from `data` laid out row by row.
    pub fn from_row_slice(dim: usize, data: &[f64]) -> Result<Self> {
        if dim == 0 || data.is_empty() {
            return Err(GameError::EmptyMatrix);
        }
        if data.len() != dim * dim {
            return Err(GameError::NotSquare {
                rows: dim,
                cols: data.len() / dim,
            });
        }
        Self::try_from(DMatrix::from_row_slice(dim, dim, data))
    }

    /// Number of pure strategies.
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.matrix.get((row, col)).copied()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Row-major copy of the entries.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    /// Smallest payoff in the matrix.
    pub fn min_entry(&self) -> f64 {
        self.matrix.min()
    }

    /// `A * x` without dimension checks; callers validate `x` first.
    pub(crate) fn apply(&self, x: &[f64]) -> DVector<f64> {
        &self.matrix * DVector::from_column_slice(x)
    }

    /// `A^T * x`: payoff of each column strategy against the row mix `x`.
    pub(crate) fn apply_transpose(&self, x: &[f64]) -> DVector<f64> {
        self.matrix.tr_mul(&DVector::from_column_slice(x))
    }

    pub(crate) fn check_dimension(&self, found: usize) -> Result<()> {
        if found != self.dim() {
            return Err(GameError::DimensionMismatch {
                expected: self.dim(),
                found,
            });
        }
        Ok(())
    }
}

impl TryFrom<DMatrix<f64>> for PayoffMatrix {
    type Error = GameError;

    fn try_from(matrix: DMatrix<f64>) -> Result<Self> {
        if matrix.is_empty() {
            return Err(GameError::EmptyMatrix);
        }
        if !matrix.is_square() {
            return Err(GameError::NotSquare {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
            });
        }
        for row in 0..matrix.nrows() {
            for col in 0..matrix.ncols() {
                let value = matrix[(row, col)];
                if !value.is_finite() {
                    return Err(GameError::NonFiniteEntry { row, col, value });
                }
            }
        }
        Ok(Self { matrix })
    }
}

impl TryFrom<Vec<Vec<f64>>> for PayoffMatrix {
    type Error = GameError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(&rows)
    }
}

impl From<PayoffMatrix> for Vec<Vec<f64>> {
    fn from(value: PayoffMatrix) -> Self {
        value.rows()
    }
}

/// Probability distribution over the pure strategies of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct MixedStrategy(Vec<f64>);

impl MixedStrategy {
    /// Validates that `probabilities` are finite, nonnegative and sum to one
    /// within [`PROBABILITY_TOLERANCE`].
    pub fn new(probabilities: Vec<f64>) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(GameError::InvalidStrategy(
                "strategy must have at least one entry".to_string(),
            ));
        }
        for (i, &p) in probabilities.iter().enumerate() {
            if !p.is_finite() || p < -PROBABILITY_TOLERANCE {
                return Err(GameError::InvalidStrategy(format!(
                    "probability {i} is {p}"
                )));
            }
        }
        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(GameError::InvalidStrategy(format!(
                "probabilities sum to {sum}, expected 1"
            )));
        }
        Ok(Self(probabilities))
    }

    pub fn uniform(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(GameError::InvalidStrategy(
                "strategy must have at least one entry".to_string(),
            ));
        }
        Ok(Self(vec![1.0 / dim as f64; dim]))
    }

    /// Strategy placing all mass on `index`.
    pub fn pure(dim: usize, index: usize) -> Result<Self> {
        if index >= dim {
            return Err(GameError::InvalidStrategy(format!(
                "pure strategy {index} out of range for {dim} strategies"
            )));
        }
        let mut probabilities = vec![0.0; dim];
        probabilities[index] = 1.0;
        Ok(Self(probabilities))
    }

    /// Wraps a vector already known to be a distribution.
    pub(crate) fn from_normalized(probabilities: Vec<f64>) -> Self {
        Self(probabilities)
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indices played with probability above `tolerance`.
    pub fn support(&self, tolerance: f64) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > tolerance)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Index<usize> for MixedStrategy {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl AsRef<[f64]> for MixedStrategy {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for MixedStrategy {
    type Error = GameError;

    fn try_from(value: Vec<f64>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MixedStrategy> for Vec<f64> {
    fn from(value: MixedStrategy) -> Self {
        value.0
    }
}

/// Scales `values` to sum to one. Returns `false`, leaving `values`
/// untouched, when the total is not a positive finite number.
pub(crate) fn normalize(values: &mut [f64]) -> bool {
    let total: f64 = values.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return false;
    }
    for value in values.iter_mut() {
        *value /= total;
    }
    true
}

pub(crate) fn fill_uniform(values: &mut [f64]) {
    let share = 1.0 / values.len() as f64;
    values.fill(share);
}

#[cfg(test)]
mod tests {
    use super::{normalize, MixedStrategy, PayoffMatrix};
    use crate::error::GameError;
    use nalgebra::DMatrix;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T, GameError>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn payoff_matrix_from_row_slice() {
        let matrix =
            PayoffMatrix::from_row_slice(2, &[3.0, 1.0, 2.0, 4.0]).expect("valid matrix");
        assert_eq!(matrix.rows(), vec![vec![3.0, 1.0], vec![2.0, 4.0]]);
        assert_eq!(
            matrix,
            PayoffMatrix::new(&[[3.0, 1.0], [2.0, 4.0]]).expect("valid matrix")
        );

        assert_eq!(
            PayoffMatrix::from_row_slice(0, &[]),
            Err(GameError::EmptyMatrix)
        );
        assert_eq!(
            PayoffMatrix::from_row_slice(2, &[]),
            Err(GameError::EmptyMatrix)
        );
        assert_eq!(
            PayoffMatrix::from_row_slice(2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Err(GameError::NotSquare { rows: 2, cols: 3 })
        );
        assert!(PayoffMatrix::from_row_slice(2, &[1.0, 2.0, 3.0])
            .expect_err("short data")
            .is_shape_error());
        assert!(matches!(
            PayoffMatrix::from_row_slice(2, &[1.0, 2.0, f64::NAN, 4.0]),
            Err(GameError::NonFiniteEntry { row: 1, col: 0, .. })
        ));
    }

    #[test]
    fn construction_errors_explain_themselves() {
        assert_err_contains(
            PayoffMatrix::new(&Vec::<Vec<f64>>::new()),
            "Payoff matrix must have at least one strategy.",
        );
        assert_err_contains(
            PayoffMatrix::new(&[vec![1.0, 2.0], vec![3.0]]),
            "must be square, got 2 rows and a row of length 1",
        );
        assert_err_contains(
            PayoffMatrix::new(&[vec![1.0, f64::INFINITY], vec![0.0, 1.0]]),
            "Payoff entry (0, 1) is not finite: inf.",
        );
        assert_err_contains(
            MixedStrategy::new(vec![0.5, 0.4]),
            "Invalid mixed strategy:",
        );
    }

    #[test]
    fn payoff_matrix_rejects_empty_input() {
        let rows: Vec<Vec<f64>> = Vec::new();
        assert_eq!(PayoffMatrix::new(&rows), Err(GameError::EmptyMatrix));
        assert_eq!(
            PayoffMatrix::try_from(DMatrix::<f64>::zeros(0, 0)),
            Err(GameError::EmptyMatrix)
        );
    }

    #[test]
    fn payoff_matrix_rejects_ragged_and_rectangular_input() {
        let err = PayoffMatrix::new(&[vec![1.0, 2.0], vec![3.0]]).expect_err("ragged rows");
        assert_eq!(err, GameError::NotSquare { rows: 2, cols: 1 });
        assert!(err.is_shape_error());

        let err = PayoffMatrix::new(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
            .expect_err("rectangular");
        assert!(err.is_shape_error());

        let err = PayoffMatrix::try_from(DMatrix::<f64>::zeros(2, 3)).expect_err("rectangular");
        assert_eq!(err, GameError::NotSquare { rows: 2, cols: 3 });
    }

    #[test]
    fn payoff_matrix_rejects_non_finite_entries() {
        let err = PayoffMatrix::new(&[vec![1.0, f64::NAN], vec![0.0, 1.0]]).expect_err("nan");
        assert!(matches!(
            err,
            GameError::NonFiniteEntry { row: 0, col: 1, .. }
        ));
        let err =
            PayoffMatrix::new(&[vec![1.0, 0.0], vec![f64::INFINITY, 1.0]]).expect_err("inf");
        assert!(matches!(
            err,
            GameError::NonFiniteEntry { row: 1, col: 0, .. }
        ));
    }

    #[test]
    fn payoff_matrix_keeps_row_major_layout() {
        let matrix = PayoffMatrix::new(&[[3.0, 1.0], [2.0, 4.0]]).expect("valid matrix");
        assert_eq!(matrix.dim(), 2);
        assert_eq!(matrix.get(0, 1), Some(1.0));
        assert_eq!(matrix.get(1, 0), Some(2.0));
        assert_eq!(matrix.get(2, 0), None);
        assert_eq!(matrix.rows(), vec![vec![3.0, 1.0], vec![2.0, 4.0]]);
        assert_eq!(matrix.min_entry(), 1.0);

        let product = matrix.apply(&[0.5, 0.5]);
        assert!((product[0] - 2.0).abs() < 1e-12);
        assert!((product[1] - 3.0).abs() < 1e-12);
        let product = matrix.apply_transpose(&[0.5, 0.5]);
        assert!((product[0] - 2.5).abs() < 1e-12);
        assert!((product[1] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn mixed_strategy_validates_probabilities() {
        assert!(MixedStrategy::new(vec![0.25, 0.75]).is_ok());
        assert!(MixedStrategy::new(vec![]).is_err());
        assert!(MixedStrategy::new(vec![0.5, 0.4]).is_err());
        assert!(MixedStrategy::new(vec![1.5, -0.5]).is_err());
        assert!(MixedStrategy::new(vec![f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn mixed_strategy_constructors() {
        let uniform = MixedStrategy::uniform(4).expect("uniform");
        assert_eq!(uniform.probabilities(), &[0.25; 4]);
        assert!(MixedStrategy::uniform(0).is_err());

        let pure = MixedStrategy::pure(3, 2).expect("pure");
        assert_eq!(pure.probabilities(), &[0.0, 0.0, 1.0]);
        assert_eq!(pure.support(1e-9), vec![2]);
        assert!(MixedStrategy::pure(3, 3).is_err());
    }

    #[test]
    fn normalize_refuses_degenerate_totals() {
        let mut values = vec![0.0, 0.0];
        assert!(!normalize(&mut values));
        assert_eq!(values, vec![0.0, 0.0]);

        let mut values = vec![1.0, -1.0];
        assert!(!normalize(&mut values));

        let mut values = vec![1.0, 3.0];
        assert!(normalize(&mut values));
        assert_eq!(values, vec![0.25, 0.75]);
    }
}
