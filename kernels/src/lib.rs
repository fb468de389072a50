//! CPU kernels backing `decoder-rs` tensors.
//!
//! Kernels operate on flat row-major slices plus a shape, and know nothing about the
//! `Tensor` type.

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod cpu_matmul;
pub mod cpu_softmax;
pub mod cpu_transpose;

pub use cpu_matmul::cpu_matmul;
pub use cpu_softmax::{MASK_FILL, cpu_causal_softmax};
pub use cpu_transpose::cpu_transpose;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Kernel requires rank >= {min}, got {rank}")]
    RankTooLow { min: usize, rank: usize },
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Element bound for kernel inputs.
/// Mirrors `TensorElem` in the main crate so the two crates stay decoupled.
pub trait KernelElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> KernelElem for T where
    T: Num
        + NumAssign
        + Copy
        + Clone
        + Debug
        + Send
        + Sync
        + FromPrimitive
        + ToPrimitive
        + PartialOrd
{
}

pub(crate) fn check_rank<const RANK: usize>(min: usize) -> Result<()> {
    if RANK < min {
        return Err(KernelError::RankTooLow { min, rank: RANK });
    }
    Ok(())
}

/// Checks that a flat buffer holds exactly `shape.iter().product()` elements.
pub(crate) fn check_len<const RANK: usize>(len: usize, shape: &[usize; RANK]) -> Result<()> {
    let size: usize = shape.iter().product();
    if len != size {
        return Err(KernelError::ShapeMismatch {
            expected: shape.to_vec(),
            got: vec![len],
        });
    }
    Ok(())
}
