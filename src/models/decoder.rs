//! Decoder-only transformer.
//!
//! ```text
//! ids -> Embedding -> +PositionalEncoding -> Dropout -> [DecoderBlock] x N
//!     -> final LayerNorm -> hidden · E^T -> logits
//! ```
//!
//! The output projection is the embedding matrix itself: the model keeps no second copy,
//! so an update made through [`DecoderOnlyTransformer::embedding_mut`] changes both the
//! token lookup and the logits.

use crate::config::TransformerConfig;
use crate::models::traits::CausalLM;
use crate::nn::norm::DEFAULT_EPS;
use crate::nn::{DecoderBlock, Dropout, Embedding, Initializer, LayerNorm, Mode, Module, PositionalEncoding};
use crate::tensor::{Result, Tensor, TensorElem};
use num_traits::Float;
use std::sync::Arc;
use tracing::{info, trace};

#[derive(Debug, Clone)]
pub struct DecoderOnlyTransformer<T: TensorElem> {
    config: Arc<TransformerConfig>,
    embedding: Embedding<T>,
    pos_enc: PositionalEncoding<T>,
    dropout: Dropout,
    blocks: Vec<DecoderBlock<T>>,
    ln_f: LayerNorm<T>,
}

impl<T: TensorElem + Float> DecoderOnlyTransformer<T> {
    /// Validates `config` and builds every layer from `init`.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the config is invalid.
    pub fn new(
        config: impl Into<Arc<TransformerConfig>>,
        init: &mut Initializer,
    ) -> crate::Result<Self> {
        let config = config.into();
        config.validate()?;

        let embedding = Embedding::init(config.vocab_size, config.hidden_size, init)?;
        let pos_enc = PositionalEncoding::new(config.max_seq_len, config.hidden_size)?;
        let dropout = Dropout::new(config.dropout)?;
        let blocks = (0..config.num_layers)
            .map(|_| DecoderBlock::init(&config, init))
            .collect::<crate::Result<Vec<_>>>()?;
        // The final norm keeps the default epsilon regardless of the config.
        let ln_f = LayerNorm::new([config.hidden_size], DEFAULT_EPS, true)?;

        let model = Self {
            config,
            embedding,
            pos_enc,
            dropout,
            blocks,
            ln_f,
        };
        info!(
            num_layers = model.config.num_layers,
            num_heads = model.config.num_heads,
            hidden_size = model.config.hidden_size,
            vocab_size = model.config.vocab_size,
            parameters = model.parameter_count(),
            "DecoderOnlyTransformer built"
        );
        Ok(model)
    }

    pub fn config(&self) -> &Arc<TransformerConfig> {
        &self.config
    }

    pub fn embedding(&self) -> &Embedding<T> {
        &self.embedding
    }

    /// Mutable access to the shared embedding / output projection matrix.
    pub fn embedding_mut(&mut self) -> &mut Embedding<T> {
        &mut self.embedding
    }

    /// The `[vocab_size, hidden_size]` matrix used for the logit projection.
    ///
    /// This is the embedding weight, not a copy.
    pub fn output_projection(&self) -> &Tensor<T, 2> {
        self.embedding.weight()
    }

    pub fn positional_encoding(&self) -> &PositionalEncoding<T> {
        &self.pos_enc
    }

    pub fn blocks(&self) -> &[DecoderBlock<T>] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [DecoderBlock<T>] {
        &mut self.blocks
    }

    pub fn final_norm(&self) -> &LayerNorm<T> {
        &self.ln_f
    }
}

impl<T: TensorElem + Float> CausalLM<T> for DecoderOnlyTransformer<T> {
    fn forward_with_mode(
        &self,
        input_ids: &Tensor<usize, 2>,
        mode: &mut Mode<'_>,
    ) -> Result<Tensor<T, 3>> {
        trace!(shape = ?input_ids.shape(), training = mode.is_training(), "model forward");

        let hidden = self.embedding.forward(input_ids)?;
        let hidden = self.pos_enc.forward(&hidden)?;
        let mut hidden = self.dropout.forward(&hidden, mode)?;

        for block in &self.blocks {
            hidden = block.forward(&hidden, mode)?;
        }

        let hidden = self.ln_f.forward(&hidden)?;
        self.embedding.unembed(&hidden)
    }

    fn vocab_size(&self) -> usize {
        self.embedding.vocab_size()
    }
}

impl<T: TensorElem> Module<T> for DecoderOnlyTransformer<T> {
    /// The tied projection is counted once, as part of the embedding.
    fn parameter_count(&self) -> usize {
        self.embedding.parameter_count()
            + self.blocks.iter().map(|b| b.parameter_count()).sum::<usize>()
            + self.ln_f.parameter_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::TensorError;
    use rand::{SeedableRng, rngs::StdRng};

    fn small() -> TransformerConfig {
        TransformerConfig::new(2, 2, 11, 8, 6)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = DecoderOnlyTransformer::<f32>::new(
            TransformerConfig::new(1, 3, 4, 8, 4),
            &mut Initializer::Zeros,
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_forward_shape() {
        let model = DecoderOnlyTransformer::<f32>::new(small(), &mut Initializer::seeded(0)).unwrap();
        let ids = Tensor::new(vec![0, 1, 2, 3, 10, 9, 8, 7], [2, 4]).unwrap();
        let logits = model.forward(&ids).unwrap();
        assert_eq!(logits.shape(), &[2, 4, 11]);
        assert!(logits.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_forward_errors() {
        let model = DecoderOnlyTransformer::<f32>::new(small(), &mut Initializer::seeded(0)).unwrap();

        let too_long = Tensor::new(vec![0; 7], [1, 7]).unwrap();
        assert!(matches!(
            model.forward(&too_long),
            Err(TensorError::SequenceTooLong { .. })
        ));

        let bad_token = Tensor::new(vec![0, 11], [1, 2]).unwrap();
        assert!(matches!(
            model.forward(&bad_token),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_parameter_count() {
        let model = DecoderOnlyTransformer::<f32>::new(small(), &mut Initializer::Zeros).unwrap();
        let block = model.blocks()[0].parameter_count();
        assert_eq!(model.blocks().len(), 2);
        assert_eq!(model.parameter_count(), 11 * 8 + 2 * block + 2 * 8);
    }

    #[test]
    fn test_final_norm_uses_default_eps() {
        let config = small().with_layer_norm_epsilon(1e-3);
        let model = DecoderOnlyTransformer::<f32>::new(config, &mut Initializer::Zeros).unwrap();
        assert_eq!(model.final_norm().eps(), 1e-5);
        assert_eq!(model.blocks()[0].ln_1().eps(), 1e-3);
    }

    #[test]
    fn test_eval_is_deterministic_and_train_is_seeded() {
        let model = DecoderOnlyTransformer::<f32>::new(
            small().with_dropout(0.5),
            &mut Initializer::seeded(1),
        )
        .unwrap();
        let ids = Tensor::new(vec![1, 2, 3], [1, 3]).unwrap();

        assert_eq!(model.forward(&ids).unwrap(), model.forward(&ids).unwrap());

        let mut a = StdRng::seed_from_u64(8);
        let mut b = StdRng::seed_from_u64(8);
        let ta = model.forward_with_mode(&ids, &mut Mode::Train(&mut a)).unwrap();
        let tb = model.forward_with_mode(&ids, &mut Mode::Train(&mut b)).unwrap();
        assert_eq!(ta, tb);
        assert_ne!(ta, model.forward(&ids).unwrap());
    }
}
