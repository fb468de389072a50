use crate::config::ConfigError;
use crate::nn::{Initializer, Linear, Module};
use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use num_traits::Float;
use rayon::prelude::*;
use tracing::{debug, trace};

/// Causal multi-head self-attention with a fused QKV projection.
///
/// `qkv` maps `hidden -> 3 * hidden`; its output is split into Q, K and V (in that order)
/// and each is divided into `num_heads` heads of `head_size = hidden / num_heads`.
/// Position `i` only attends to positions `<= i`.
#[derive(Debug, Clone)]
pub struct MultiHeadMaskedAttention<T: TensorElem> {
    qkv: Linear<T>,
    out_proj: Linear<T>,
    num_heads: usize,
    head_size: usize,
    scaling: T,
}

impl<T: TensorElem + Float> MultiHeadMaskedAttention<T> {
    /// Builds the layer from existing projections.
    ///
    /// `qkv` must be `[3 * hidden, hidden]` and `out_proj` `[hidden, hidden]`.
    pub fn new(qkv: Linear<T>, out_proj: Linear<T>, num_heads: usize) -> crate::Result<Self> {
        let hidden = qkv.in_features();
        if num_heads == 0 || hidden % num_heads != 0 {
            return Err(ConfigError::Validation(format!(
                "hidden_size ({hidden}) must be divisible by num_heads ({num_heads})"
            ))
            .into());
        }
        if qkv.out_features() != 3 * hidden {
            return Err(TensorError::ShapeMismatch {
                expected: vec![3 * hidden, hidden],
                got: qkv.weight().shape().to_vec(),
            }
            .into());
        }
        if out_proj.in_features() != hidden || out_proj.out_features() != hidden {
            return Err(TensorError::ShapeMismatch {
                expected: vec![hidden, hidden],
                got: out_proj.weight().shape().to_vec(),
            }
            .into());
        }

        let head_size = hidden / num_heads;
        let scaling = T::from_usize(head_size)
            .map(|d| T::one() / d.sqrt())
            .ok_or_else(|| TensorError::Unsupported("head size not representable".into()))?;

        Ok(Self {
            qkv,
            out_proj,
            num_heads,
            head_size,
            scaling,
        })
    }

    pub fn init(hidden_size: usize, num_heads: usize, init: &mut Initializer) -> crate::Result<Self> {
        let qkv = Linear::init(hidden_size, 3 * hidden_size, true, init)?;
        let out_proj = Linear::init(hidden_size, hidden_size, true, init)?;
        let attn = Self::new(qkv, out_proj, num_heads)?;
        debug!(hidden_size, num_heads, "MultiHeadMaskedAttention initialized");
        Ok(attn)
    }

    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    pub fn head_size(&self) -> usize {
        self.head_size
    }

    pub fn qkv(&self) -> &Linear<T> {
        &self.qkv
    }

    pub fn qkv_mut(&mut self) -> &mut Linear<T> {
        &mut self.qkv
    }

    pub fn out_proj(&self) -> &Linear<T> {
        &self.out_proj
    }

    pub fn out_proj_mut(&mut self) -> &mut Linear<T> {
        &mut self.out_proj
    }

    /// `[batch, seq, hidden]` -> `[batch, seq, hidden]`.
    pub fn forward(&self, x: &Tensor<T, 3>) -> Result<Tensor<T, 3>> {
        let [b, s, _] = *x.shape();
        let hidden = self.num_heads * self.head_size;
        trace!(batch = b, seq = s, "attention forward");

        let qkv = self.qkv.forward(x)?;
        let [q, k, v] = self.split_heads(&qkv)?;

        // [B*H, S, D] x [B*H, D, S] -> [B*H, S, S]
        let scaling = self.scaling;
        let mut scores = q.matmul(&k.transpose()?)?.map(|val| val * scaling);
        decoder_rs_kernels::cpu_causal_softmax(scores.data_mut(), s)?;

        let z = scores.matmul(&v)?;

        // [B*H, S, D] -> [B, H, S, D] -> [B, S, H, D] -> [B, S, hidden]
        let z = z
            .reshape([b, self.num_heads, s, self.head_size])?
            .transpose_axes(1, 2)?
            .reshape([b, s, hidden])?;

        self.out_proj.forward(&z)
    }

    /// Splits `[B, S, 3 * hidden]` into Q, K, V, each laid out as `[B * H, S, D]`.
    fn split_heads(&self, qkv: &Tensor<T, 3>) -> Result<[Tensor<T, 3>; 3]> {
        let [b, s, width] = *qkv.shape();
        let (h, d) = (self.num_heads, self.head_size);
        let hidden = h * d;
        if width != 3 * hidden {
            return Err(TensorError::ShapeMismatch {
                expected: vec![b, s, 3 * hidden],
                got: qkv.shape().to_vec(),
            });
        }

        let src = qkv.data();
        let split = |part: usize| {
            let mut out = Tensor::zeros([b * h, s, d]);
            out.data_mut()
                .par_chunks_mut(d)
                .enumerate()
                .for_each(|(row, dst)| {
                    let (bh, i) = (row / s, row % s);
                    let (batch, head) = (bh / h, bh % h);
                    let offset = (batch * s + i) * width + part * hidden + head * d;
                    dst.copy_from_slice(&src[offset..offset + d]);
                });
            out
        };

        Ok([split(0), split(1), split(2)])
    }
}

impl<T: TensorElem> Module<T> for MultiHeadMaskedAttention<T> {
    fn parameter_count(&self) -> usize {
        self.qkv.parameter_count() + self.out_proj.parameter_count()
    }
}
