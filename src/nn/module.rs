use crate::tensor::TensorElem;
use rand::RngCore;
use std::fmt::Debug;

/// Common interface of every layer.
///
/// `Send + Sync` lets a built model be shared across threads for concurrent inference.
/// `Debug` keeps the structure of any model inspectable.
pub trait Module<T: TensorElem>: Debug + Send + Sync {
    /// Number of learned scalars owned by this module.
    ///
    /// Fixed buffers (like the positional table) are not parameters.
    fn parameter_count(&self) -> usize;
}

/// Execution mode of a forward pass.
///
/// Only [`Dropout`](crate::nn::Dropout) reacts to it. The random source is borrowed for the
/// duration of the call and never stored in a module, so two passes with equally seeded
/// generators produce identical masks.
///
/// ```rust
/// use decoder_rs::nn::Mode;
/// use rand::{SeedableRng, rngs::StdRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let mode = Mode::Train(&mut rng);
/// assert!(mode.is_training());
/// assert!(!Mode::Eval.is_training());
/// ```
pub enum Mode<'a> {
    Eval,
    Train(&'a mut dyn RngCore),
}

impl Mode<'_> {
    pub fn is_training(&self) -> bool {
        matches!(self, Mode::Train(_))
    }
}

impl Debug for Mode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Eval => f.write_str("Eval"),
            Mode::Train(_) => f.write_str("Train"),
        }
    }
}
