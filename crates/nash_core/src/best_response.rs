use crate::error::Result;
use crate::payoff::{MixedStrategy, PayoffMatrix};

/// Gap, relative to the largest expected payoff in magnitude, below which two
/// expected payoffs count as tied.
const TIE_TOLERANCE: f64 = 1e-12;

/// Expected payoff of each pure strategy against `opponent`: `A * q`.
pub fn expected_payoffs(matrix: &PayoffMatrix, opponent: &MixedStrategy) -> Result<Vec<f64>> {
    matrix.check_dimension(opponent.len())?;
    Ok(matrix.apply(opponent.probabilities()).iter().copied().collect())
}

/// Pure strategy with the highest expected payoff against `opponent`.
///
/// Ties go to the lowest index. Payoffs closer than `1e-12` times the largest
/// `|payoff|` count as ties so that rounding in the dot products does not
/// decide between strategies that are equal in exact arithmetic. The margin
/// has no absolute floor, so games with tiny payoffs are ranked like their
/// rescaled counterparts.
pub fn best_response(matrix: &PayoffMatrix, opponent: &MixedStrategy) -> Result<usize> {
    let payoffs = expected_payoffs(matrix, opponent)?;
    Ok(stable_argmax(&payoffs))
}

fn stable_argmax(values: &[f64]) -> usize {
    let magnitude = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let margin = TIE_TOLERANCE * magnitude;
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] + margin {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{best_response, expected_payoffs, stable_argmax};
    use crate::error::GameError;
    use crate::payoff::{MixedStrategy, PayoffMatrix};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn ties_resolve_to_lowest_index() {
        let game = PayoffMatrix::new(&[[3.0, 1.0, 0.0], [2.0, 2.0, 1.0], [0.0, 3.0, 3.0]])
            .expect("valid matrix");
        let opponent = MixedStrategy::new(vec![0.5, 0.3, 0.2]).expect("distribution");

        let payoffs = expected_payoffs(&game, &opponent).expect("same dimension");
        assert!((payoffs[0] - 1.8).abs() < 1e-12);
        assert!((payoffs[1] - 1.8).abs() < 1e-12);
        assert!((payoffs[2] - 1.5).abs() < 1e-12);
        assert_eq!(best_response(&game, &opponent), Ok(0));

        let opponent = MixedStrategy::new(vec![0.0, 0.5, 0.5]).expect("distribution");
        assert_eq!(best_response(&game, &opponent), Ok(2));
    }

    #[test]
    fn later_tie_does_not_displace_earlier_best() {
        let game = PayoffMatrix::new(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]])
            .expect("valid matrix");
        let opponent = MixedStrategy::uniform(3).expect("uniform");
        assert_eq!(best_response(&game, &opponent), Ok(1));
        assert_eq!(stable_argmax(&[2.0, 2.0, 2.0]), 0);
        assert_eq!(stable_argmax(&[-3.0, -1.0, -2.0]), 1);
    }

    #[test]
    fn tiny_payoffs_are_ranked_like_rescaled_ones() {
        assert_eq!(stable_argmax(&[0.0, 1e-13]), 1);
        assert_eq!(stable_argmax(&[1e-13, 2e-13, 1.5e-13]), 1);
        assert_eq!(stable_argmax(&[0.0, 0.0]), 0);

        let scale = 1e-13;
        let game = PayoffMatrix::new(&[
            [3.0 * scale, 1.0 * scale, 0.0],
            [2.0 * scale, 2.0 * scale, 1.0 * scale],
            [0.0, 3.0 * scale, 3.0 * scale],
        ])
        .expect("valid matrix");
        let opponent = MixedStrategy::new(vec![0.0, 0.5, 0.5]).expect("distribution");
        assert_eq!(best_response(&game, &opponent), Ok(2));
        let opponent = MixedStrategy::pure(3, 0).expect("pure strategy");
        assert_eq!(best_response(&game, &opponent), Ok(0));
        let opponent = MixedStrategy::new(vec![0.5, 0.3, 0.2]).expect("distribution");
        assert_eq!(best_response(&game, &opponent), Ok(0));
    }

    #[test]
    fn rejects_mismatched_strategy() {
        let game = PayoffMatrix::new(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
            .expect("valid matrix");
        let opponent = MixedStrategy::uniform(2).expect("uniform");
        assert_eq!(
            best_response(&game, &opponent),
            Err(GameError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn matches_brute_force_argmax() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let n = rng.random_range(1..=8);
            let rows: Vec<Vec<f64>> = (0..n)
                .map(|_| (0..n).map(|_| rng.random_range(-10.0..10.0)).collect())
                .collect();
            let mut weights: Vec<f64> = (0..n).map(|_| rng.random::<f64>() + 1e-3).collect();
            let total: f64 = weights.iter().sum();
            weights.iter_mut().for_each(|w| *w /= total);

            let game = PayoffMatrix::new(&rows).expect("valid matrix");
            let opponent = MixedStrategy::new(weights.clone()).expect("distribution");

            let mut expected = 0;
            let mut best = f64::NEG_INFINITY;
            for (i, row) in rows.iter().enumerate() {
                let payoff: f64 = row.iter().zip(&weights).map(|(a, q)| a * q).sum();
                if payoff > best {
                    best = payoff;
                    expected = i;
                }
            }
            assert_eq!(best_response(&game, &opponent), Ok(expected));
        }
    }
}
