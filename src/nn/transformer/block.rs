use super::{Mlp, MultiHeadMaskedAttention};
use crate::config::TransformerConfig;
use crate::nn::{Dropout, Initializer, LayerNorm, Mode, Module};
use crate::tensor::{Result, Tensor, TensorElem};
use num_traits::Float;
use tracing::{debug, trace};

/// One decoder layer with post-norm residuals:
///
/// ```text
/// out = x   + ln_1(attn(x))
/// out = out + ln_2(mlp(out))
/// ```
#[derive(Debug, Clone)]
pub struct DecoderBlock<T: TensorElem> {
    attn: MultiHeadMaskedAttention<T>,
    ln_1: LayerNorm<T>,
    mlp: Mlp<T>,
    ln_2: LayerNorm<T>,
}

impl<T: TensorElem + Float> DecoderBlock<T> {
    pub fn new(
        attn: MultiHeadMaskedAttention<T>,
        ln_1: LayerNorm<T>,
        mlp: Mlp<T>,
        ln_2: LayerNorm<T>,
    ) -> Self {
        Self {
            attn,
            ln_1,
            mlp,
            ln_2,
        }
    }

    pub fn init(config: &TransformerConfig, init: &mut Initializer) -> crate::Result<Self> {
        let hidden = config.hidden_size;
        let attn = MultiHeadMaskedAttention::init(hidden, config.num_heads, init)?;
        let ln_1 = LayerNorm::new([hidden], config.layer_norm_epsilon, true)?;
        let mlp = Mlp::init(hidden, Dropout::new(config.dropout)?, init)?;
        let ln_2 = LayerNorm::new([hidden], config.layer_norm_epsilon, true)?;

        let block = Self::new(attn, ln_1, mlp, ln_2);
        debug!(
            hidden,
            parameters = block.parameter_count(),
            "DecoderBlock initialized"
        );
        Ok(block)
    }

    pub fn attn(&self) -> &MultiHeadMaskedAttention<T> {
        &self.attn
    }

    pub fn attn_mut(&mut self) -> &mut MultiHeadMaskedAttention<T> {
        &mut self.attn
    }

    pub fn mlp(&self) -> &Mlp<T> {
        &self.mlp
    }

    pub fn mlp_mut(&mut self) -> &mut Mlp<T> {
        &mut self.mlp
    }

    pub fn ln_1(&self) -> &LayerNorm<T> {
        &self.ln_1
    }

    pub fn ln_2(&self) -> &LayerNorm<T> {
        &self.ln_2
    }

    pub fn forward(&self, x: &Tensor<T, 3>, mode: &mut Mode<'_>) -> Result<Tensor<T, 3>> {
        trace!(shape = ?x.shape(), "decoder block forward");

        let attn_out = self.ln_1.forward(&self.attn.forward(x)?)?;
        let out = (x + &attn_out)?;

        let mlp_out = self.ln_2.forward(&self.mlp.forward(&out, mode)?)?;
        &out + &mlp_out
    }
}

impl<T: TensorElem> Module<T> for DecoderBlock<T> {
    fn parameter_count(&self) -> usize {
        self.attn.parameter_count()
            + self.ln_1.parameter_count()
            + self.mlp.parameter_count()
            + self.ln_2.parameter_count()
    }
}
