//! Tensor operations.
//!
//! # Overview
//!
//! - **Element-wise Arithmetic**: `+`, `-`, `*`, `/` on `&Tensor`, shapes must match exactly.
//! - **Trailing broadcast**: [`Tensor::add_trailing`] adds a bias or a positional table over
//!   all leading dimensions. It is the only broadcasting rule.
//! - **Matrix Multiplication**: batched over leading dims, delegated to `decoder-rs-kernels`.
//! - **Permutations**: [`Tensor::transpose`] (last two dims) and [`Tensor::transpose_axes`].
//!
//! Operations run on the rayon pool.
//!
//! ```rust
//! use decoder_rs::tensor::Tensor;
//!
//! let a = Tensor::<f32, 1>::new(vec![1.0, 2.0], [2]).unwrap();
//! let b = Tensor::<f32, 1>::new(vec![3.0, 4.0], [2]).unwrap();
//!
//! let c = (&a + &b).unwrap();
//! assert_eq!(c.data(), &[4.0, 6.0]);
//! ```

use super::{Result, Tensor, TensorElem, TensorError, compute_strides, unravel};

use rayon::prelude::*;
use std::ops::{Add, Div, Mul, Sub};

/// Implements a binary arithmetic trait (e.g., `Add`) for `&Tensor`.
///
/// Checks shapes, then applies the operation element-wise in parallel.
macro_rules! impl_bin_op {
    ($trait:ident, $method:ident) => {
        impl<T, const RANK: usize> $trait for &Tensor<T, RANK>
        where
            T: TensorElem,
        {
            type Output = crate::tensor::Result<Tensor<T, RANK>>;

            fn $method(self, rhs: Self) -> Self::Output {
                if self.shape != rhs.shape {
                    return Err(TensorError::ShapeMismatch {
                        expected: self.shape.to_vec(),
                        got: rhs.shape.to_vec(),
                    });
                }

                let mut out = Tensor::zeros(self.shape);
                out.data
                    .par_iter_mut()
                    .zip(self.data.par_iter())
                    .zip(rhs.data.par_iter())
                    .for_each(|((o, a), b)| {
                        *o = a.$method(*b);
                    });

                Ok(out)
            }
        }
    };
}

impl_bin_op!(Add, add);
impl_bin_op!(Sub, sub);
impl_bin_op!(Mul, mul);
impl_bin_op!(Div, div);

impl<T, const RANK: usize> Tensor<T, RANK>
where
    T: TensorElem,
{
    /// Applies a function element-wise to the tensor.
    ///
    /// ```rust
    /// use decoder_rs::tensor::Tensor;
    /// let t = Tensor::<f32, 1>::new(vec![1.0, 2.0, 3.0], [3]).unwrap();
    /// let squared = t.map(|x| x * x);
    /// assert_eq!(squared.data(), &[1.0, 4.0, 9.0]);
    /// ```
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + Sync + Send,
    {
        let mut out = Tensor::zeros(self.shape);
        out.data
            .par_iter_mut()
            .zip(self.data.par_iter())
            .for_each(|(o, i)| *o = f(*i));
        out
    }

    /// Adds `rhs` to every trailing slice of `self`.
    ///
    /// `rhs.shape()` must equal the last `R2` dimensions of `self`. A `[out]` bias added to a
    /// `[batch, seq, out]` activation is the typical use.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the trailing dims differ, or if `R2 > RANK`.
    pub fn add_trailing<const R2: usize>(&self, rhs: &Tensor<T, R2>) -> Result<Self> {
        if R2 > RANK || self.shape[RANK - R2..] != rhs.shape[..] {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape[RANK.saturating_sub(R2)..].to_vec(),
                got: rhs.shape.to_vec(),
            });
        }

        let mut out = self.clone();
        let chunk = rhs.size();
        if chunk == 0 {
            return Ok(out);
        }
        out.data.par_chunks_mut(chunk).for_each(|row| {
            for (o, b) in row.iter_mut().zip(rhs.data.iter()) {
                *o += *b;
            }
        });
        Ok(out)
    }

    /// Batched matrix multiplication over the last two dimensions.
    ///
    /// - Rank 2: `[M, K] x [K, N] -> [M, N]`
    /// - Rank 3: `[B, M, K] x [B, K, N] -> [B, M, N]`
    /// - Rank 4: `[B, H, M, K] x [B, H, K, N] -> [B, H, M, N]`
    ///
    /// Leading dimensions must match exactly.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        const { assert!(RANK >= 2, "Matmul requires rank >= 2") };

        let out_data = decoder_rs_kernels::cpu_matmul(&self.data, &rhs.data, &self.shape, &rhs.shape)?;

        let mut out_shape = self.shape;
        out_shape[RANK - 1] = rhs.shape[RANK - 1];

        Ok(Tensor {
            shape: out_shape,
            strides: compute_strides(&out_shape),
            data: out_data,
        })
    }

    /// Swaps the last two dimensions.
    pub fn transpose(&self) -> Result<Self> {
        const { assert!(RANK >= 2, "Transpose requires rank >= 2") };

        let out_data = decoder_rs_kernels::cpu_transpose(&self.data, &self.shape)?;

        let mut new_shape = self.shape;
        new_shape.swap(RANK - 1, RANK - 2);

        Ok(Tensor {
            shape: new_shape,
            strides: compute_strides(&new_shape),
            data: out_data,
        })
    }

    /// Swaps two arbitrary axes, physically permuting the data.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::IndexOutOfBounds` if `ax1` or `ax2` are out of bounds.
    pub fn transpose_axes(&self, ax1: usize, ax2: usize) -> Result<Self> {
        if ax1 >= RANK || ax2 >= RANK {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![ax1, ax2],
                shape: self.shape.to_vec(),
            });
        }
        if ax1 == ax2 {
            return Ok(self.clone());
        }

        let mut new_shape = self.shape;
        new_shape.swap(ax1, ax2);
        let new_strides = compute_strides(&new_shape);

        // Input strides seen from the output's index space.
        let mut mapped = self.strides;
        mapped.swap(ax1, ax2);

        let mut out = Tensor::zeros(new_shape);
        out.data.par_iter_mut().enumerate().for_each(|(i, o)| {
            let idx = unravel(i, &new_strides);
            let src: usize = idx.iter().zip(mapped.iter()).map(|(a, s)| a * s).sum();
            *o = self.data[src];
        });

        Ok(out)
    }
}
