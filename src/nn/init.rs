//! Parameter initialization.

use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use rand::distr::{Distribution, Uniform};
use rand::{SeedableRng, rngs::StdRng};

/// Source of initial parameter values.
///
/// `Zeros` fills every learned tensor with zeros, which makes outputs easy to predict in tests.
/// `Uniform` draws from a seeded [`StdRng`]; the same seed always builds the same model.
/// Layer norms always start at ones/zeros regardless of the initializer.
#[derive(Debug, Clone)]
pub enum Initializer {
    Zeros,
    Uniform(StdRng),
}

impl Initializer {
    pub fn seeded(seed: u64) -> Self {
        Initializer::Uniform(StdRng::seed_from_u64(seed))
    }

    /// A tensor of `shape` with values in `[-bound, bound]` (or zeros).
    pub fn uniform<T: TensorElem, const RANK: usize>(
        &mut self,
        shape: [usize; RANK],
        bound: f64,
    ) -> Result<Tensor<T, RANK>> {
        match self {
            Initializer::Zeros => Ok(Tensor::zeros(shape)),
            Initializer::Uniform(rng) => {
                let dist = Uniform::new_inclusive(-bound, bound).map_err(|e| {
                    TensorError::Unsupported(format!("invalid init bound {bound}: {e}"))
                })?;
                let size: usize = shape.iter().product();
                let data = (0..size)
                    .map(|_| {
                        T::from_f64(dist.sample(&mut *rng)).ok_or_else(|| {
                            TensorError::Unsupported("init value not representable".into())
                        })
                    })
                    .collect::<Result<Vec<T>>>()?;
                Tensor::new(data, shape)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let t: Tensor<f32, 2> = Initializer::Zeros.uniform([3, 4], 1.0).unwrap();
        assert!(t.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_uniform_in_bounds() {
        let mut init = Initializer::seeded(42);
        let t: Tensor<f32, 2> = init.uniform([16, 16], 0.25).unwrap();
        assert!(t.data().iter().all(|&v| (-0.25..=0.25).contains(&v)));
        assert!(t.data().iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_seed_determinism() {
        let a: Tensor<f32, 1> = Initializer::seeded(1).uniform([32], 1.0).unwrap();
        let b: Tensor<f32, 1> = Initializer::seeded(1).uniform([32], 1.0).unwrap();
        let c: Tensor<f32, 1> = Initializer::seeded(2).uniform([32], 1.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_bad_bound() {
        let res: Result<Tensor<f32, 1>> = Initializer::seeded(0).uniform([2], f64::NAN);
        assert!(matches!(res, Err(TensorError::Unsupported(_))));
    }
}
