//! Model architectures.
//!
//! - [`decoder`]: the decoder-only transformer with a weight-tied output projection.
//!
//! ```rust
//! use decoder_rs::config::TransformerConfig;
//! use decoder_rs::models::decoder::DecoderOnlyTransformer;
//! use decoder_rs::models::traits::CausalLM;
//! use decoder_rs::nn::Initializer;
//! use decoder_rs::tensor::Tensor;
//!
//! let config = TransformerConfig::new(2, 2, 32, 8, 16);
//! let model = DecoderOnlyTransformer::<f32>::new(config, &mut Initializer::seeded(0)).unwrap();
//!
//! let input_ids = Tensor::<usize, 2>::new(vec![1, 5, 9], [1, 3]).unwrap();
//! let logits = model.forward(&input_ids).unwrap();
//! assert_eq!(logits.shape(), &[1, 3, 32]);
//! ```

pub mod decoder;
pub mod traits;
