//! The `nash_core` crate analyzes symmetric two-player games given by a single
//! square payoff matrix. Every operation reads an immutable `PayoffMatrix`
//! and returns a value; nothing is shared or mutated between calls, so the
//! operations may run concurrently against the same matrix.
//!
//! Key components:
//! - **Payoff**: `PayoffMatrix` and `MixedStrategy` value types with validation.
//! - **Equilibrium**: symmetric-game linear program solved by the dense simplex in `lp`.
//! - **Dominance**: single-pass pairwise weak-dominance scan.
//! - **Best response**: stable argmax of expected payoffs.
//! - **Replicator**: selection-with-mutation dynamics driven by the `DiscreteMap` stepper.

pub mod best_response;
pub mod dominance;
pub mod equilibrium;
pub mod error;
pub mod lp;
pub mod payoff;
pub mod replicator;
pub mod solvers;
pub mod traits;

pub use best_response::{best_response, expected_payoffs};
pub use dominance::{dominating_strategies, DominanceResult};
pub use equilibrium::{deviation_gain, find_nash_equilibrium, NashEquilibrium};
pub use error::GameError;
pub use lp::{LpError, LpSettings};
pub use payoff::{MixedStrategy, PayoffMatrix, PROBABILITY_TOLERANCE};
pub use replicator::{evolutionary_stable_strategy, ReplicatorSelection, ReplicatorSettings};
