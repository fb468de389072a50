use crate::config::ConfigError;
use crate::nn::{Mode, Module};
use crate::tensor::{Result, Tensor, TensorElem, TensorError};

use rand::Rng;

/// Inverted dropout.
///
/// In [`Mode::Train`] each element is zeroed with probability `p` and the survivors are
/// scaled by `1 / (1 - p)`, so the expected value is unchanged. In [`Mode::Eval`] it is the
/// identity.
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    p: f64,
}

impl Dropout {
    /// # Errors
    ///
    /// `ConfigError::Validation` unless `0 <= p < 1`.
    pub fn new(p: f64) -> std::result::Result<Self, ConfigError> {
        if !(0.0..1.0).contains(&p) {
            return Err(ConfigError::Validation(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }
        Ok(Self { p })
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn forward<T: TensorElem, const RANK: usize>(
        &self,
        x: &Tensor<T, RANK>,
        mode: &mut Mode<'_>,
    ) -> Result<Tensor<T, RANK>> {
        let rng = match mode {
            Mode::Train(rng) if self.p > 0.0 => rng,
            _ => return Ok(x.clone()),
        };

        let scale = T::from_f64(1.0 / (1.0 - self.p))
            .ok_or_else(|| TensorError::Unsupported("dropout scale not representable".into()))?;

        // Sequential on purpose: the mask must follow the generator's order.
        let mut out = x.clone();
        for v in out.data_mut() {
            if rng.random::<f64>() < self.p {
                *v = T::zero();
            } else {
                *v *= scale;
            }
        }
        Ok(out)
    }
}

impl<T: TensorElem> Module<T> for Dropout {
    fn parameter_count(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_rejects_bad_p() {
        assert!(Dropout::new(1.0).is_err());
        assert!(Dropout::new(-0.5).is_err());
        assert!(Dropout::new(f64::NAN).is_err());
        assert!(Dropout::new(0.0).is_ok());
    }

    #[test]
    fn test_eval_is_identity() {
        let dropout = Dropout::new(0.9).unwrap();
        let x = Tensor::<f32, 2>::from_fn([4, 4], |[r, c]| (r * 4 + c) as f32);
        let y = dropout.forward(&x, &mut Mode::Eval).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_train_zeroes_or_scales() {
        let dropout = Dropout::new(0.5).unwrap();
        let x = Tensor::<f32, 1>::ones([1000]);
        let mut rng = StdRng::seed_from_u64(0);
        let y = dropout.forward(&x, &mut Mode::Train(&mut rng)).unwrap();

        assert!(y.data().iter().all(|&v| v == 0.0 || v == 2.0));
        let zeros = y.data().iter().filter(|&&v| v == 0.0).count();
        assert!((400..600).contains(&zeros), "zeros = {zeros}");
    }

    #[test]
    fn test_train_reproducible() {
        let dropout = Dropout::new(0.3).unwrap();
        let x = Tensor::<f32, 1>::ones([64]);

        let mut a = StdRng::seed_from_u64(5);
        let mut b = StdRng::seed_from_u64(5);
        let ya = dropout.forward(&x, &mut Mode::Train(&mut a)).unwrap();
        let yb = dropout.forward(&x, &mut Mode::Train(&mut b)).unwrap();
        assert_eq!(ya, yb);
    }

    #[test]
    fn test_train_with_zero_p_is_identity() {
        let dropout = Dropout::new(0.0).unwrap();
        let x = Tensor::<f32, 1>::ones([8]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(dropout.forward(&x, &mut Mode::Train(&mut rng)).unwrap(), x);
    }
}
