use crate::nn::Module;
use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use num_traits::Float;
use rayon::prelude::*;
use tracing::debug;

/// Default epsilon, also used by the model's final norm.
pub const DEFAULT_EPS: f64 = 1e-5;

/// Learned scale and shift, shaped like the normalized dims.
#[derive(Debug, Clone)]
pub struct Affine<T: TensorElem, const N: usize> {
    pub weight: Tensor<T, N>,
    pub bias: Tensor<T, N>,
}

/// Layer Normalization over the trailing `N` dimensions.
///
/// `y = (x - mean) / sqrt(var + eps) * weight + bias`, with the biased variance (divided by
/// the element count). The affine part is optional and fixed at construction.
///
/// ```rust
/// use decoder_rs::nn::LayerNorm;
/// use decoder_rs::tensor::Tensor;
///
/// let norm = LayerNorm::<f32>::new([3], 1e-5, true).unwrap();
/// let y = norm.forward(&Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 5.0, 5.0, 5.0], [2, 3]).unwrap()).unwrap();
/// assert!(y.data()[1].abs() < 1e-6);
/// assert_eq!(&y.data()[3..], &[0.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct LayerNorm<T: TensorElem, const N: usize = 1> {
    normalized_shape: [usize; N],
    eps: T,
    affine: Option<Affine<T, N>>,
}

impl<T: TensorElem + Float, const N: usize> LayerNorm<T, N> {
    /// Creates a LayerNorm; with `elementwise_affine` the weight starts at ones and the bias
    /// at zeros.
    pub fn new(normalized_shape: [usize; N], eps: f64, elementwise_affine: bool) -> Result<Self> {
        const { assert!(N >= 1, "LayerNorm needs at least one normalized dim") };

        if eps.is_nan() || eps <= 0.0 {
            return Err(TensorError::Unsupported(format!("eps must be > 0, got {eps}")));
        }
        let eps = T::from_f64(eps)
            .ok_or_else(|| TensorError::Unsupported(format!("eps {eps} not representable")))?;
        let affine = elementwise_affine.then(|| Affine {
            weight: Tensor::ones(normalized_shape),
            bias: Tensor::zeros(normalized_shape),
        });

        debug!(?normalized_shape, elementwise_affine, "LayerNorm initialized");
        Ok(Self {
            normalized_shape,
            eps,
            affine,
        })
    }

    pub fn normalized_shape(&self) -> &[usize; N] {
        &self.normalized_shape
    }

    pub fn eps(&self) -> T {
        self.eps
    }

    pub fn affine(&self) -> Option<&Affine<T, N>> {
        self.affine.as_ref()
    }

    pub fn affine_mut(&mut self) -> Option<&mut Affine<T, N>> {
        self.affine.as_mut()
    }

    /// Normalizes `x` over its last `N` dims.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the trailing dims of `x`, or the affine weight or bias, differ from
    /// `normalized_shape`.
    pub fn forward<const RANK: usize>(&self, x: &Tensor<T, RANK>) -> Result<Tensor<T, RANK>> {
        let shape = x.shape();
        if RANK < N || shape[RANK - N..] != self.normalized_shape[..] {
            return Err(TensorError::ShapeMismatch {
                expected: self.normalized_shape.to_vec(),
                got: shape[RANK.saturating_sub(N)..].to_vec(),
            });
        }

        if let Some(a) = &self.affine {
            for param in [&a.weight, &a.bias] {
                if param.shape() != &self.normalized_shape {
                    return Err(TensorError::ShapeMismatch {
                        expected: self.normalized_shape.to_vec(),
                        got: param.shape().to_vec(),
                    });
                }
            }
        }

        let group: usize = self.normalized_shape.iter().product();
        let mut out = Tensor::zeros(*shape);
        if group == 0 {
            return Ok(out);
        }
        let n = T::from_usize(group)
            .ok_or_else(|| TensorError::Unsupported("group size not representable".into()))?;
        let eps = self.eps;
        let affine = self.affine.as_ref();

        out.data_mut()
            .par_chunks_mut(group)
            .zip(x.data().par_chunks(group))
            .for_each(|(out_row, in_row)| {
                let mean = in_row.iter().fold(T::zero(), |acc, &v| acc + v) / n;
                let var = in_row.iter().fold(T::zero(), |acc, &v| {
                    let diff = v - mean;
                    acc + diff * diff
                }) / n;
                let rstd = T::one() / (var + eps).sqrt();

                for (o, &v) in out_row.iter_mut().zip(in_row.iter()) {
                    *o = (v - mean) * rstd;
                }
                if let Some(a) = affine {
                    for ((o, &w), &b) in out_row
                        .iter_mut()
                        .zip(a.weight.data().iter())
                        .zip(a.bias.data().iter())
                    {
                        *o = *o * w + b;
                    }
                }
            });

        Ok(out)
    }
}

impl<T: TensorElem, const N: usize> Module<T> for LayerNorm<T, N> {
    fn parameter_count(&self) -> usize {
        self.affine
            .as_ref()
            .map_or(0, |a| a.weight.size() + a.bias.size())
    }
}
