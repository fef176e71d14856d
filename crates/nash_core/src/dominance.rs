//! Single-pass pairwise dominance scan.
//!
//! This is deliberately *not* iterated elimination of dominated strategies.
//! Rows are visited once, `i` ascending in the outer loop and `j` ascending
//! in the inner loop. A row already recorded as dominated is skipped as a
//! dominator but can still be recorded as dominated again. The result is
//! order dependent and not transitive: a row can dominate one row and later
//! be found dominated by another, landing in both sets. Rows that are equal
//! dominate each other under the componentwise `>=` rule, so for identical
//! rows the lowest index is reported as dominating and the rest as dominated.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::payoff::PayoffMatrix;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominanceResult {
    pub dominating: BTreeSet<usize>,
    pub dominated: BTreeSet<usize>,
}

impl DominanceResult {
    /// Dominating rows in ascending order.
    pub fn dominating_indices(&self) -> Vec<usize> {
        self.dominating.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dominating.is_empty()
    }
}

pub fn dominating_strategies(matrix: &PayoffMatrix) -> DominanceResult {
    let n = matrix.dim();
    let mut result = DominanceResult::default();
    for i in 0..n {
        for j in 0..n {
            if i == j || result.dominated.contains(&i) {
                continue;
            }
            if weakly_dominates(matrix, i, j) {
                result.dominated.insert(j);
                result.dominating.insert(i);
            }
        }
    }
    result
}

/// Row `i` pays at least as much as row `j` against every column.
fn weakly_dominates(matrix: &PayoffMatrix, i: usize, j: usize) -> bool {
    let a = matrix.as_matrix();
    a.row(i).iter().zip(a.row(j).iter()).all(|(x, y)| x >= y)
}
