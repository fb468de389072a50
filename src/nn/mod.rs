pub mod activation;
pub mod dropout;
pub mod embedding;
pub mod init;
pub mod linear;
pub mod module;
pub mod norm;
pub mod positional;
pub mod transformer;

pub use activation::Activation;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use init::Initializer;
pub use linear::Linear;
pub use module::{Mode, Module};
pub use norm::{Affine, LayerNorm};
pub use positional::PositionalEncoding;
pub use transformer::{DecoderBlock, Mlp, MultiHeadMaskedAttention};
