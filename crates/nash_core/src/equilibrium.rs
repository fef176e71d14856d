use log::debug;
use serde::{Deserialize, Serialize};

use crate::best_response::expected_payoffs;
use crate::error::{GameError, Result};
use crate::lp::{LinearProgram, LpError, LpSettings, VariableBound};
use crate::payoff::{normalize, MixedStrategy, PayoffMatrix};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NashEquilibrium {
    pub strategy: MixedStrategy,
    /// Guaranteed payoff `v`: the smallest payoff any column reply earns
    /// against `strategy`.
    pub value: f64,
    pub iterations: usize,
}

/// Solves the symmetric-game linear program
///
/// ```text
/// maximize    v
/// subject to  v - sum_i p_i A[i][j] <= 0   for every column j
///             sum_i p_i = 1,  p >= 0,  v free
/// ```
///
/// and returns `p` renormalized to sum to one.
///
/// This yields *a* equilibrium strategy of the single-population game: the
/// row player's maximin mix. It is not necessarily the only equilibrium nor
/// the one with the largest support, and for non-zero-sum games it need not
/// be a symmetric Nash equilibrium. Use [`deviation_gain`] to check.
///
/// Solver failure (infeasible, unbounded, pivot budget exhausted) is reported
/// as [`GameError::NoEquilibrium`] and never retried.
pub fn find_nash_equilibrium(
    matrix: &PayoffMatrix,
    settings: LpSettings,
) -> Result<NashEquilibrium> {
    settings.check().map_err(GameError::InvalidParameter)?;

    let n = matrix.dim();
    let mut objective = vec![0.0; n + 1];
    objective[n] = -1.0;
    let mut bounds = vec![VariableBound::NonNegative; n];
    bounds.push(VariableBound::Free);

    // Pivot tolerances are absolute, so the LP sees payoffs scaled to max |A| = 1.
    let scale = matrix.as_matrix().amax();
    let scale = if scale > 0.0 { scale } else { 1.0 };

    let mut program = LinearProgram::minimize(objective).bounds(bounds);
    for j in 0..n {
        let mut row: Vec<f64> = matrix
            .as_matrix()
            .column(j)
            .iter()
            .map(|a| -a / scale)
            .collect();
        row.push(1.0);
        program = program.less_or_equal(row, 0.0);
    }
    let mut simplex = vec![1.0; n];
    simplex.push(0.0);
    program = program.equal(simplex, 1.0);

    let solution = program.solve(settings)?;

    let mut probabilities: Vec<f64> = solution.x[..n].iter().map(|p| p.max(0.0)).collect();
    if !normalize(&mut probabilities) {
        return Err(GameError::NoEquilibrium(LpError::Infeasible));
    }
    let value = matrix
        .apply_transpose(&probabilities)
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    debug!(
        "Equilibrium for {}x{} game: {:?} (value {}, {} pivots)",
        n, n, probabilities, value, solution.iterations
    );

    Ok(NashEquilibrium {
        strategy: MixedStrategy::from_normalized(probabilities),
        value,
        iterations: solution.iterations,
    })
}

/// Largest payoff gain a pure deviation earns against a population playing
/// `strategy`: `max_i (A p)_i - p^T A p`. Zero, up to rounding, exactly when
/// `strategy` is a symmetric Nash equilibrium.
pub fn deviation_gain(matrix: &PayoffMatrix, strategy: &MixedStrategy) -> Result<f64> {
    let payoffs = expected_payoffs(matrix, strategy)?;
    let average: f64 = payoffs
        .iter()
        .zip(strategy.probabilities())
        .map(|(f, p)| f * p)
        .sum();
    let best = payoffs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(best - average)
}
