use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// Numeric type a population state is expressed in.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A discrete-time update rule on a population state.
pub trait DynamicalSystem<T: Scalar> {
    /// Number of strategies in the state vector.
    fn dimension(&self) -> usize;

    /// Evaluates the map.
    /// t: generation counter
    /// x: current population frequencies
    /// out: buffer receiving the next frequencies
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A stepper advancing a state under a [`DynamicalSystem`].
pub trait Steppable<T: Scalar> {
    /// Advances `state` by one step of size `dt`, updating `t`.
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}
