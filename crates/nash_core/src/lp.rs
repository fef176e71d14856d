//! Dense two-phase simplex for small linear programs.
//!
//! Problems are stated as
//!
//! ```text
//! minimize    c^T x
//! subject to  A_ub x <= b_ub
//!             A_eq x  = b_eq
//!             x_k >= 0 or x_k free
//! ```
//!
//! Free variables are split into a positive and a negative part, inequality
//! rows receive slack columns and every row whose slack cannot start in the
//! basis receives an artificial column. Phase one drives the artificials to
//! zero, phase two optimizes the real objective. Bland's rule is used for
//! both the entering and the leaving column so degenerate problems terminate.

use log::{debug, trace};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LpSettings {
    /// Pivot budget shared by both phases.
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for LpSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-9,
        }
    }
}

impl LpSettings {
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be greater than zero.".to_string());
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(format!(
                "tolerance must be positive, got {}.",
                self.tolerance
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LpError {
    #[error("linear program is infeasible")]
    Infeasible,
    #[error("linear program is unbounded")]
    Unbounded,
    #[error("simplex did not finish within {limit} pivots")]
    IterationLimit { limit: usize },
    #[error("expected {expected} coefficients, got {found}")]
    Shape { expected: usize, found: usize },
    #[error("coefficient is not finite: {0}")]
    NonFinite(f64),
    #[error("invalid solver settings: {0}")]
    InvalidSettings(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableBound {
    NonNegative,
    Free,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpSolution {
    pub x: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
struct Constraint {
    coefficients: Vec<f64>,
    rhs: f64,
}

/// Builder for a linear program in inequality/equality form.
///
/// ```
/// use nash_core::lp::{LinearProgram, LpSettings};
///
/// let solution = LinearProgram::minimize(vec![-1.0, -1.0])
///     .less_or_equal(vec![1.0, 2.0], 4.0)
///     .less_or_equal(vec![3.0, 1.0], 6.0)
///     .solve(LpSettings::default())
///     .unwrap();
/// assert!((solution.objective + 2.8).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct LinearProgram {
    objective: Vec<f64>,
    bounds: Vec<VariableBound>,
    inequalities: Vec<Constraint>,
    equalities: Vec<Constraint>,
}

impl LinearProgram {
    /// Starts a minimization problem; every variable is nonnegative until
    /// [`LinearProgram::bounds`] says otherwise.
    pub fn minimize(objective: Vec<f64>) -> Self {
        let bounds = vec![VariableBound::NonNegative; objective.len()];
        Self {
            objective,
            bounds,
            inequalities: Vec::new(),
            equalities: Vec::new(),
        }
    }

    pub fn bounds(mut self, bounds: Vec<VariableBound>) -> Self {
        self.bounds = bounds;
        self
    }

    /// Adds `coefficients . x <= rhs`.
    pub fn less_or_equal(mut self, coefficients: Vec<f64>, rhs: f64) -> Self {
        self.inequalities.push(Constraint { coefficients, rhs });
        self
    }

    /// Adds `coefficients . x = rhs`.
    pub fn equal(mut self, coefficients: Vec<f64>, rhs: f64) -> Self {
        self.equalities.push(Constraint { coefficients, rhs });
        self
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn solve(&self, settings: LpSettings) -> Result<LpSolution, LpError> {
        settings.check().map_err(LpError::InvalidSettings)?;
        self.validate()?;

        let mut tableau = Tableau::build(self);
        let mut iterations = 0usize;
        let tol = settings.tolerance;

        if tableau.artificial > 0 {
            let mut costs = vec![0.0; tableau.width()];
            for cost in &mut costs[tableau.artificial_start()..] {
                *cost = 1.0;
            }
            tableau.load_objective(&costs);
            tableau.optimize(settings, &mut iterations, true)?;

            let infeasibility = -tableau.objective_value_cell();
            let scale = 1.0 + tableau.rhs_scale();
            debug!(
                "Phase one finished after {} pivots with infeasibility {:e}",
                iterations, infeasibility
            );
            if infeasibility > tol * scale {
                return Err(LpError::Infeasible);
            }
            tableau.evict_artificials(tol);
        }

        let mut costs = vec![0.0; tableau.width()];
        for (col, &(variable, sign)) in tableau.columns.iter().enumerate() {
            costs[col] = sign * self.objective[variable];
        }
        tableau.load_objective(&costs);
        tableau.optimize(settings, &mut iterations, false)?;

        let x = tableau.extract(self.num_variables());
        let objective = self
            .objective
            .iter()
            .zip(&x)
            .map(|(c, value)| c * value)
            .sum();
        debug!(
            "Simplex finished after {} pivots with objective {}",
            iterations, objective
        );

        Ok(LpSolution {
            x,
            objective,
            iterations,
        })
    }

    fn validate(&self) -> Result<(), LpError> {
        let n = self.num_variables();
        if n == 0 {
            return Err(LpError::Shape {
                expected: 1,
                found: 0,
            });
        }
        if self.bounds.len() != n {
            return Err(LpError::Shape {
                expected: n,
                found: self.bounds.len(),
            });
        }
        check_finite(&self.objective)?;
        for constraint in self.inequalities.iter().chain(&self.equalities) {
            if constraint.coefficients.len() != n {
                return Err(LpError::Shape {
                    expected: n,
                    found: constraint.coefficients.len(),
                });
            }
            check_finite(&constraint.coefficients)?;
            check_finite(&[constraint.rhs])?;
        }
        Ok(())
    }
}

fn check_finite(values: &[f64]) -> Result<(), LpError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(LpError::NonFinite(value)),
        None => Ok(()),
    }
}

/// Simplex tableau. Rows `0..m` hold the constraints, row `m` holds the
/// reduced costs with `-z` in the right-hand-side column. Columns are laid
/// out as structural, slack, artificial, rhs.
struct Tableau {
    table: DMatrix<f64>,
    basis: Vec<usize>,
    /// Structural column -> (original variable, sign).
    columns: Vec<(usize, f64)>,
    slack: usize,
    artificial: usize,
}

impl Tableau {
    fn build(program: &LinearProgram) -> Self {
        let mut columns = Vec::with_capacity(program.num_variables() * 2);
        for (variable, bound) in program.bounds.iter().enumerate() {
            columns.push((variable, 1.0));
            if *bound == VariableBound::Free {
                columns.push((variable, -1.0));
            }
        }

        let slack = program.inequalities.len();
        let rows = slack + program.equalities.len();
        let needs_artificial: Vec<bool> = program
            .inequalities
            .iter()
            .map(|c| c.rhs < 0.0)
            .chain(program.equalities.iter().map(|_| true))
            .collect();
        let artificial = needs_artificial.iter().filter(|&&n| n).count();

        let structural = columns.len();
        let width = structural + slack + artificial;
        let mut table = DMatrix::zeros(rows + 1, width + 1);
        let mut basis = vec![0; rows];
        let mut next_artificial = structural + slack;

        let constraints = program.inequalities.iter().chain(&program.equalities);
        for (row, constraint) in constraints.enumerate() {
            let flip = if constraint.rhs < 0.0 { -1.0 } else { 1.0 };
            for (col, &(variable, sign)) in columns.iter().enumerate() {
                table[(row, col)] = flip * sign * constraint.coefficients[variable];
            }
            if row < slack {
                table[(row, structural + row)] = flip;
            }
            table[(row, width)] = flip * constraint.rhs;

            if needs_artificial[row] {
                table[(row, next_artificial)] = 1.0;
                basis[row] = next_artificial;
                next_artificial += 1;
            } else {
                basis[row] = structural + row;
            }
        }

        Self {
            table,
            basis,
            columns,
            slack,
            artificial,
        }
    }

    fn rows(&self) -> usize {
        self.basis.len()
    }

    /// Number of variable columns, excluding the rhs.
    fn width(&self) -> usize {
        self.table.ncols() - 1
    }

    fn artificial_start(&self) -> usize {
        self.columns.len() + self.slack
    }

    fn objective_value_cell(&self) -> f64 {
        self.table[(self.rows(), self.width())]
    }

    fn rhs_scale(&self) -> f64 {
        let rhs = self.width();
        (0..self.rows())
            .map(|r| self.table[(r, rhs)].abs())
            .fold(0.0, f64::max)
    }

    /// Writes `costs` into the objective row and prices out the basis.
    fn load_objective(&mut self, costs: &[f64]) {
        let m = self.rows();
        let rhs = self.width();
        for (col, &cost) in costs.iter().enumerate() {
            self.table[(m, col)] = cost;
        }
        self.table[(m, rhs)] = 0.0;
        for row in 0..m {
            let cost = costs[self.basis[row]];
            if cost != 0.0 {
                for col in 0..=rhs {
                    let value = self.table[(row, col)];
                    self.table[(m, col)] -= cost * value;
                }
            }
        }
    }

    fn optimize(
        &mut self,
        settings: LpSettings,
        iterations: &mut usize,
        allow_artificial: bool,
    ) -> Result<(), LpError> {
        let m = self.rows();
        let rhs = self.width();
        let tol = settings.tolerance;
        let candidates = if allow_artificial {
            self.width()
        } else {
            self.artificial_start()
        };

        loop {
            let Some(entering) = (0..candidates).find(|&col| self.table[(m, col)] < -tol) else {
                return Ok(());
            };
            if *iterations >= settings.max_iterations {
                return Err(LpError::IterationLimit {
                    limit: settings.max_iterations,
                });
            }

            let mut leaving: Option<(usize, f64)> = None;
            for row in 0..m {
                let coefficient = self.table[(row, entering)];
                if coefficient <= tol {
                    continue;
                }
                let ratio = self.table[(row, rhs)] / coefficient;
                leaving = match leaving {
                    Some((best_row, best)) => {
                        let better = ratio < best - tol
                            || (ratio <= best + tol && self.basis[row] < self.basis[best_row]);
                        if better {
                            Some((row, ratio))
                        } else {
                            Some((best_row, best))
                        }
                    }
                    None => Some((row, ratio)),
                };
            }
            let Some((row, ratio)) = leaving else {
                return Err(LpError::Unbounded);
            };

            trace!(
                "pivot {}: column {} enters, row {} leaves (ratio {})",
                iterations,
                entering,
                row,
                ratio
            );
            self.pivot(row, entering);
            *iterations += 1;
        }
    }

    /// Pivots artificial columns that are still basic (at zero level) out of
    /// the basis. Rows with no usable column are redundant and left alone.
    fn evict_artificials(&mut self, tol: f64) {
        let start = self.artificial_start();
        for row in 0..self.rows() {
            if self.basis[row] < start {
                continue;
            }
            if let Some(col) = (0..start).find(|&col| self.table[(row, col)].abs() > tol) {
                self.pivot(row, col);
            }
        }
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let ncols = self.table.ncols();
        let pivot = self.table[(row, col)];
        for c in 0..ncols {
            self.table[(row, c)] /= pivot;
        }
        for r in 0..self.table.nrows() {
            if r == row {
                continue;
            }
            let factor = self.table[(r, col)];
            if factor == 0.0 {
                continue;
            }
            for c in 0..ncols {
                let value = self.table[(row, c)];
                self.table[(r, c)] -= factor * value;
            }
        }
        self.basis[row] = col;
    }

    fn extract(&self, num_variables: usize) -> Vec<f64> {
        let rhs = self.width();
        let mut x = vec![0.0; num_variables];
        for (row, &col) in self.basis.iter().enumerate() {
            if let Some(&(variable, sign)) = self.columns.get(col) {
                x[variable] += sign * self.table[(row, rhs)];
            }
        }
        x
    }
}
