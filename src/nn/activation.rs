//! Activation Functions.
//!
//! - **ReLU**: `max(0, x)`.
//! - **GELU**: tanh approximation, used by the feed-forward block.

use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use num_traits::Float;

/// Activation functions namespace.
pub struct Activation;

impl Activation {
    /// Applies GELU element-wise.
    ///
    /// # Errors
    ///
    /// `TensorError::Unsupported` if `T` cannot represent the GELU constants.
    pub fn gelu<const RANK: usize, T: TensorElem + Float>(
        x: &Tensor<T, RANK>,
    ) -> Result<Tensor<T, RANK>> {
        let coeffs = GeluCoefficients::new()?;
        Ok(x.map(|v| coeffs.apply(v)))
    }

    /// Applies ReLU element-wise.
    pub fn relu<const RANK: usize, T: TensorElem + Float>(x: &Tensor<T, RANK>) -> Tensor<T, RANK> {
        x.map(relu)
    }
}

/// Constants of the tanh approximation, converted to `T` once.
///
/// $$ \text{GELU}(x) \approx 0.5 x (1 + \tanh[\sqrt{2/\pi} (x + 0.044715 x^3)]) $$
#[derive(Debug, Clone, Copy)]
pub struct GeluCoefficients<T> {
    half: T,
    cubic: T,
    sqrt_2_over_pi: T,
}

impl<T: Float> GeluCoefficients<T> {
    pub fn new() -> Result<Self> {
        let convert = |v: f64| {
            T::from(v).ok_or_else(|| {
                TensorError::Unsupported(format!("GELU constant {v} not representable"))
            })
        };
        Ok(Self {
            half: convert(0.5)?,
            cubic: convert(0.044715)?,
            sqrt_2_over_pi: convert(std::f64::consts::FRAC_2_PI.sqrt())?,
        })
    }

    pub fn apply(&self, x: T) -> T {
        let inner = self.sqrt_2_over_pi * (x + self.cubic * x * x * x);
        self.half * x * (T::one() + inner.tanh())
    }
}

pub fn relu<T: Float>(x: T) -> T {
    x.max(T::zero())
}
