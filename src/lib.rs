//! # decoder-rs
//!
//! `decoder-rs` is a pure Rust forward-pass engine for decoder-only transformers: token
//! embedding, sinusoidal positions, causal multi-head attention, post-norm decoder blocks
//! and a weight-tied vocabulary projection. It runs on the CPU, parallelized with `rayon`.
//!
//! ## Modules
//!
//! - [`mod@tensor`]: Core N-dimensional tensor implementation.
//! - [`config`]: Validated model hyperparameters.
//! - [`nn`]: Layers (Linear, Embedding, LayerNorm, Dropout, attention, ...).
//! - [`models`]: The full decoder-only transformer.
//!
//! ## Example
//!
//! ```rust
//! use decoder_rs::config::TransformerConfig;
//! use decoder_rs::models::decoder::DecoderOnlyTransformer;
//! use decoder_rs::models::traits::CausalLM;
//! use decoder_rs::nn::Initializer;
//! use decoder_rs::tensor::Tensor;
//!
//! let config = TransformerConfig::new(1, 1, 4, 2, 4).with_dropout(0.0);
//! let model = DecoderOnlyTransformer::<f32>::new(config, &mut Initializer::Zeros).unwrap();
//!
//! let ids = Tensor::new(vec![0, 1, 2], [1, 3]).unwrap();
//! assert_eq!(model.forward(&ids).unwrap().shape(), &[1, 3, 4]);
//! ```

use thiserror::Error;

/// Macro for creating a Tensor with compile-time shape checking.
///
/// # Examples
///
/// ```rust
/// use decoder_rs::tensor;
///
/// // Works
/// let t = tensor!([1.0f32, 2.0, 3.0, 4.0], [2, 2]);
/// assert_eq!(t.shape(), &[2, 2]);
///
/// // Fails to compile:
/// // let t = tensor!([1.0, 2.0, 3.0], [2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ($data:expr, $shape:expr) => {{
        const DATA_LEN: usize = $data.len();
        const SHAPE: [usize; $shape.len()] = $shape;
        const EXPECTED_SIZE: usize = {
            let mut size = 1;
            let mut i = 0;
            while i < SHAPE.len() {
                size *= SHAPE[i];
                i += 1;
            }
            size
        };

        const _: () = assert!(
            DATA_LEN == EXPECTED_SIZE,
            "Shape mismatch: data length does not match shape product"
        );

        // Checked at compile time above.
        $crate::tensor::Tensor::new($data.to_vec(), $shape).unwrap()
    }};
}

pub mod config;
pub mod models;
pub mod nn;
pub mod tensor;

pub use config::{ConfigError, TransformerConfig};
pub use models::decoder::DecoderOnlyTransformer;
pub use models::traits::CausalLM;
pub use tensor::{Tensor, TensorError};

/// Errors raised while building a model.
///
/// Forward passes only fail with [`TensorError`].
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

pub type Result<T> = std::result::Result<T, Error>;
