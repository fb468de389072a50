use crate::nn::{Initializer, Module};
use crate::tensor::{Result, Tensor, TensorElem, TensorError};

use tracing::debug;

const WEIGHT_RANK: usize = 2;
const BIAS_RANK: usize = 1;

/// Linear Layer: `y = xA^T + b`
///
/// Every input feature is connected to every output feature. Inputs of any rank are accepted;
/// all leading dimensions are treated as batch dimensions.
///
/// # Examples
/// ```rust
/// use decoder_rs::nn::Linear;
/// use decoder_rs::tensor::Tensor;
///
/// let layer = Linear::<f32>::new(
///     Tensor::ones([5, 10]),       // Weights: [out, in]
///     Some(Tensor::zeros([5])),   // Bias: [out]
/// )
/// .unwrap();
///
/// let y = layer.forward(&Tensor::<f32, 3>::ones([2, 3, 10])).unwrap();
/// assert_eq!(y.shape(), &[2, 3, 5]);
/// assert!(y.data().iter().all(|&v| v == 10.0));
/// ```
#[derive(Debug, Clone)]
pub struct Linear<T: TensorElem> {
    /// Shape: `[out_features, in_features]`
    weight: Tensor<T, WEIGHT_RANK>,
    /// Shape: `[out_features]`
    bias: Option<Tensor<T, BIAS_RANK>>,
}

impl<T: TensorElem> Linear<T> {
    /// Creates a Linear layer from existing weights.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the bias length is not `out_features`.
    pub fn new(weight: Tensor<T, WEIGHT_RANK>, bias: Option<Tensor<T, BIAS_RANK>>) -> Result<Self> {
        let [out_features, _] = *weight.shape();
        if let Some(b) = &bias {
            if b.shape() != &[out_features] {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![out_features],
                    got: b.shape().to_vec(),
                });
            }
        }
        Ok(Self { weight, bias })
    }

    /// Creates a freshly initialized layer.
    ///
    /// Weight and bias are drawn from `[-k, k]` with `k = 1/sqrt(in_features)`.
    pub fn init(
        in_features: usize,
        out_features: usize,
        bias: bool,
        init: &mut Initializer,
    ) -> Result<Self> {
        if in_features == 0 {
            return Err(TensorError::Unsupported(
                "Linear requires in_features >= 1".into(),
            ));
        }
        let bound = 1.0 / (in_features as f64).sqrt();
        let weight = init.uniform([out_features, in_features], bound)?;
        let bias = if bias {
            Some(init.uniform([out_features], bound)?)
        } else {
            None
        };

        debug!(in_features, out_features, has_bias = bias.is_some(), "Linear initialized");
        Self::new(weight, bias)
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn weight(&self) -> &Tensor<T, WEIGHT_RANK> {
        &self.weight
    }

    pub fn weight_mut(&mut self) -> &mut Tensor<T, WEIGHT_RANK> {
        &mut self.weight
    }

    pub fn bias(&self) -> Option<&Tensor<T, BIAS_RANK>> {
        self.bias.as_ref()
    }

    pub fn bias_mut(&mut self) -> Option<&mut Tensor<T, BIAS_RANK>> {
        self.bias.as_mut()
    }

    /// Applies the layer to `[..., in_features]`, producing `[..., out_features]`.
    pub fn forward<const RANK: usize>(&self, x: &Tensor<T, RANK>) -> Result<Tensor<T, RANK>> {
        const { assert!(RANK >= 1, "Linear requires rank >= 1") };

        let in_features = self.in_features();
        let shape = *x.shape();
        if shape[RANK - 1] != in_features {
            return Err(TensorError::ShapeMismatch {
                expected: vec![in_features],
                got: vec![shape[RANK - 1]],
            });
        }

        let rows: usize = shape[..RANK - 1].iter().product();
        let flat: Tensor<T, 2> = x.clone().reshape([rows, in_features])?;
        let mut out = flat.matmul(&self.weight.transpose()?)?;
        if let Some(b) = &self.bias {
            out = out.add_trailing(b)?;
        }

        let mut out_shape = shape;
        out_shape[RANK - 1] = self.out_features();
        out.reshape(out_shape)
    }
}

impl<T: TensorElem> Module<T> for Linear<T> {
    fn parameter_count(&self) -> usize {
        self.weight.size() + self.bias.as_ref().map_or(0, |b| b.size())
    }
}
