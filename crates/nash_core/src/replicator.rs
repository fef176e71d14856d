//! Discrete replicator dynamics with mutation.
//!
//! Each generation applies the selection map
//!
//! ```text
//! p <- p * (A p - b) / sum(p * (A p - b))
//! ```
//!
//! followed by a mutation blend `p <- (1 - mu) p + mu m` with a fresh random
//! distribution `m`. The baseline `b` is `min(0, min A)`, so matrices with
//! nonnegative payoffs use raw fitness and matrices with negative payoffs are
//! shifted until every fitness is nonnegative.
//!
//! Whenever a normalization total is zero (or not finite) the vector falls
//! back to the uniform distribution instead of dividing by zero.

use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::payoff::{fill_uniform, normalize, MixedStrategy, PayoffMatrix};
use crate::solvers::DiscreteMap;
use crate::traits::{DynamicalSystem, Steppable};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReplicatorSettings {
    /// Number of generations; there is no convergence-based early exit.
    pub iterations: usize,
    /// Weight of the mutation distribution in each generation, in `[0, 1]`.
    pub mutation_rate: f64,
}

impl Default for ReplicatorSettings {
    fn default() -> Self {
        Self {
            iterations: 1000,
            mutation_rate: 0.01,
        }
    }
}

impl ReplicatorSettings {
    fn check(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(GameError::InvalidParameter(format!(
                "mutation_rate must lie in [0, 1], got {}.",
                self.mutation_rate
            )));
        }
        Ok(())
    }
}

/// Selection step of the replicator dynamics as a discrete map.
pub struct ReplicatorSelection<'a> {
    matrix: &'a PayoffMatrix,
    baseline: f64,
}

impl<'a> ReplicatorSelection<'a> {
    pub fn new(matrix: &'a PayoffMatrix) -> Self {
        Self {
            matrix,
            baseline: matrix.min_entry().min(0.0),
        }
    }
}

impl DynamicalSystem<f64> for ReplicatorSelection<'_> {
    fn dimension(&self) -> usize {
        self.matrix.dim()
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        let fitness = self.matrix.apply(x);
        for ((o, p), f) in out.iter_mut().zip(x).zip(fitness.iter()) {
            *o = (p * (f - self.baseline)).max(0.0);
        }
        if !normalize(out) {
            debug!("Generation {}: population fitness vanished, resetting to uniform", t);
            fill_uniform(out);
        }
    }
}

/// Runs `settings.iterations` generations of selection plus mutation from a
/// random initial population and returns the final population.
///
/// All randomness comes from `rng`; the same seed and settings reproduce the
/// same output bit for bit. With zero iterations the random initial
/// population is returned.
pub fn evolutionary_stable_strategy<R: Rng + ?Sized>(
    matrix: &PayoffMatrix,
    settings: ReplicatorSettings,
    rng: &mut R,
) -> Result<MixedStrategy> {
    settings.check()?;

    let dim = matrix.dim();
    let rate = settings.mutation_rate;
    let selection = ReplicatorSelection::new(matrix);
    let mut stepper = DiscreteMap::new(dim);
    let mut generation = 0.0;

    let mut population = vec![0.0; dim];
    fill_random_distribution(&mut population, rng);
    let mut mutation = vec![0.0; dim];

    for _ in 0..settings.iterations {
        stepper.step(&selection, &mut generation, &mut population, 1.0);

        fill_random_distribution(&mut mutation, rng);
        for (p, m) in population.iter_mut().zip(&mutation) {
            *p = (1.0 - rate) * *p + rate * m;
        }
        trace!("Generation {}: {:?}", generation, population);
    }

    if !normalize(&mut population) {
        fill_uniform(&mut population);
    }
    debug!(
        "Replicator run finished after {} generations (mutation rate {}): {:?}",
        settings.iterations, rate, population
    );
    Ok(MixedStrategy::from_normalized(population))
}

fn fill_random_distribution<R: Rng + ?Sized>(values: &mut [f64], rng: &mut R) {
    for value in values.iter_mut() {
        *value = rng.random::<f64>();
    }
    if !normalize(values) {
        fill_uniform(values);
    }
}
