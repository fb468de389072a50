//! Transformer building blocks.

pub mod attention;
pub mod block;
pub mod mlp;

pub use attention::MultiHeadMaskedAttention;
pub use block::DecoderBlock;
pub use mlp::Mlp;
