use crate::nn::Mode;
use crate::tensor::{Result, Tensor, TensorElem};

/// Interface of causal language models.
///
/// Tokenization and sampling live outside the model; it only maps token ids to logits.
pub trait CausalLM<T: TensorElem> {
    /// Inference pass.
    ///
    /// * `input_ids` - `[batch_size, sequence_length]` token ids.
    ///
    /// Returns `[batch_size, sequence_length, vocab_size]` logits.
    fn forward(&self, input_ids: &Tensor<usize, 2>) -> Result<Tensor<T, 3>> {
        self.forward_with_mode(input_ids, &mut Mode::Eval)
    }

    /// Forward pass in an explicit [`Mode`], e.g. with dropout active.
    fn forward_with_mode(&self, input_ids: &Tensor<usize, 2>, mode: &mut Mode<'_>)
    -> Result<Tensor<T, 3>>;

    fn vocab_size(&self) -> usize;
}
