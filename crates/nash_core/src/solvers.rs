use crate::traits::{DynamicalSystem, Scalar, Steppable};

/// Discrete Map Stepper
/// Evaluates x_{n+1} = f(x_n) into a scratch buffer, then copies it back.
/// `dt` only advances the generation counter.
pub struct DiscreteMap<T: Scalar> {
    tmp: Vec<T>,
}

impl<T: Scalar> DiscreteMap<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for DiscreteMap<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        system.apply(*t, state, &mut self.tmp);
        state.copy_from_slice(&self.tmp);
        *t = *t + dt;
    }
}
