use crate::nn::{Initializer, Module};
use crate::tensor::{Result, Tensor, TensorElem, TensorError};

use rayon::prelude::*;
use tracing::debug;

/// Token lookup table `[vocab_size, hidden_size]`.
///
/// The same matrix is reused by [`Embedding::unembed`] for the tied output projection.
#[derive(Debug, Clone)]
pub struct Embedding<T: TensorElem> {
    weight: Tensor<T, 2>,
}

impl<T: TensorElem> Embedding<T> {
    pub fn new(weight: Tensor<T, 2>) -> Self {
        Self { weight }
    }

    /// Creates a table with values drawn from `[-1, 1]`.
    pub fn init(vocab_size: usize, hidden_size: usize, init: &mut Initializer) -> Result<Self> {
        let weight = init.uniform([vocab_size, hidden_size], 1.0)?;
        debug!(vocab_size, hidden_size, "Embedding initialized");
        Ok(Self::new(weight))
    }

    pub fn vocab_size(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn hidden_size(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn weight(&self) -> &Tensor<T, 2> {
        &self.weight
    }

    pub fn weight_mut(&mut self) -> &mut Tensor<T, 2> {
        &mut self.weight
    }

    /// Looks up `[batch, seq]` token ids, producing `[batch, seq, hidden]`.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::IndexOutOfBounds` for any id `>= vocab_size`.
    pub fn forward(&self, input: &Tensor<usize, 2>) -> Result<Tensor<T, 3>> {
        let [batch_size, seq_len] = *input.shape();
        let [vocab_size, hidden_dim] = *self.weight.shape();

        if let Some(&token_id) = input.data().iter().find(|&&id| id >= vocab_size) {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![token_id],
                shape: vec![vocab_size, hidden_dim],
            });
        }

        let mut out = Tensor::zeros([batch_size, seq_len, hidden_dim]);
        if hidden_dim == 0 {
            return Ok(out);
        }

        let weight_data = self.weight.data();
        out.data_mut()
            .par_chunks_mut(hidden_dim)
            .zip(input.data().par_iter())
            .for_each(|(row, &token_id)| {
                let start = token_id * hidden_dim;
                row.copy_from_slice(&weight_data[start..start + hidden_dim]);
            });

        Ok(out)
    }

    /// Projects hidden states back onto the vocabulary: `hidden · weight^T`.
    ///
    /// `[batch, seq, hidden]` -> `[batch, seq, vocab_size]`.
    pub fn unembed(&self, hidden: &Tensor<T, 3>) -> Result<Tensor<T, 3>> {
        let [batch_size, seq_len, hidden_dim] = *hidden.shape();
        if hidden_dim != self.hidden_size() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.hidden_size()],
                got: vec![hidden_dim],
            });
        }

        let flat: Tensor<T, 2> = hidden.clone().reshape([batch_size * seq_len, hidden_dim])?;
        let logits = flat.matmul(&self.weight.transpose()?)?;
        logits.reshape([batch_size, seq_len, self.vocab_size()])
    }
}

impl<T: TensorElem> Module<T> for Embedding<T> {
    fn parameter_count(&self) -> usize {
        self.weight.size()
    }
}
