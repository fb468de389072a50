//! Core Tensor implementation.
//!
//! A [`Tensor`] is a flat, row-major `Vec<T>` plus a shape and strides. The rank is part of
//! the type (`Tensor<f32, 3>`), the size of each dimension is a runtime value, so one model
//! can serve any batch size or sequence length without being re-instantiated.
//!
//! ```rust
//! use decoder_rs::tensor::Tensor;
//!
//! let t = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
//! assert_eq!(t.shape(), &[2, 3]);
//! assert_eq!(t.strides(), &[3, 1]);
//! ```
//!
//! Shape mismatches are reported as [`TensorError::ShapeMismatch`]; the only implicit
//! broadcasting is [`Tensor::add_trailing`], which adds a tensor shaped like the trailing
//! dimensions across all leading dimensions.

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod ops;

/// Error type for Tensor operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    /// The shape of the data does not match the expected shape.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// An index is out of bounds for the given shape.
    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },
    /// A sequence is longer than the precomputed positional table.
    #[error("Sequence too long: got {seq_len} positions, maximum is {max_seq_len}")]
    SequenceTooLong { seq_len: usize, max_seq_len: usize },
    /// The requested operation is not supported (e.g., for a specific rank or type).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;

impl From<decoder_rs_kernels::KernelError> for TensorError {
    fn from(e: decoder_rs_kernels::KernelError) -> Self {
        match e {
            decoder_rs_kernels::KernelError::ShapeMismatch { expected, got } => {
                TensorError::ShapeMismatch { expected, got }
            }
            decoder_rs_kernels::KernelError::RankTooLow { min, rank } => {
                TensorError::Unsupported(format!("operation requires rank >= {min}, got {rank}"))
            }
        }
    }
}

/// Trait bound for elements that can be stored in a Tensor.
///
/// `Send + Sync` is required because most operations run on the rayon pool.
pub trait TensorElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> TensorElem for T where
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

/// An N-dimensional array stored contiguously in row-major order.
///
/// - `T`: element type.
/// - `RANK`: number of dimensions.
#[derive(Clone, PartialEq)]
pub struct Tensor<T, const RANK: usize>
where
    T: TensorElem,
{
    shape: [usize; RANK],
    strides: [usize; RANK],
    data: Vec<T>,
}

impl<T, const RANK: usize> Tensor<T, RANK>
where
    T: TensorElem,
{
    /// Creates a new Tensor from a flat vector and a shape.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if `data.len()` is not the product of `shape`.
    pub fn new(data: Vec<T>, shape: [usize; RANK]) -> Result<Self> {
        let size: usize = shape.iter().product();
        if data.len() != size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![size],
                got: vec![data.len()],
            });
        }

        Ok(Self {
            shape,
            strides: compute_strides(&shape),
            data,
        })
    }

    /// Creates a Tensor where every element is `value`.
    pub fn full(shape: [usize; RANK], value: T) -> Self {
        let size: usize = shape.iter().product();
        Self {
            shape,
            strides: compute_strides(&shape),
            data: vec![value; size],
        }
    }

    /// Creates a new Tensor filled with zeros.
    pub fn zeros(shape: [usize; RANK]) -> Self {
        Self::full(shape, T::zero())
    }

    /// Creates a new Tensor filled with ones.
    pub fn ones(shape: [usize; RANK]) -> Self {
        Self::full(shape, T::one())
    }

    /// Creates a Tensor by evaluating `f` at every multi-index, in row-major order.
    pub fn from_fn<F>(shape: [usize; RANK], mut f: F) -> Self
    where
        F: FnMut([usize; RANK]) -> T,
    {
        let strides = compute_strides(&shape);
        let size: usize = shape.iter().product();
        let data = (0..size).map(|i| f(unravel(i, &strides))).collect();
        Self {
            shape,
            strides,
            data,
        }
    }

    /// Reshapes the tensor. The number of elements must stay the same.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the element counts differ.
    pub fn reshape<const NEW_RANK: usize>(
        self,
        new_shape: [usize; NEW_RANK],
    ) -> Result<Tensor<T, NEW_RANK>> {
        let current_size = self.size();
        let new_size: usize = new_shape.iter().product();

        if current_size != new_size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![current_size],
                got: vec![new_size],
            });
        }

        Ok(Tensor {
            shape: new_shape,
            strides: compute_strides(&new_shape),
            data: self.data,
        })
    }

    /// Merges dimensions `start..=end` into one.
    ///
    /// `NEW_RANK` must equal `RANK - (end - start)`.
    ///
    /// ```rust
    /// use decoder_rs::tensor::Tensor;
    /// let t = Tensor::<f32, 4>::zeros([2, 3, 4, 5]);
    /// let f: Tensor<f32, 2> = t.flatten(1, 3).unwrap();
    /// assert_eq!(f.shape(), &[2, 60]);
    /// ```
    pub fn flatten<const NEW_RANK: usize>(
        self,
        start: usize,
        end: usize,
    ) -> Result<Tensor<T, NEW_RANK>> {
        if start > end || end >= RANK {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![start, end],
                shape: self.shape.to_vec(),
            });
        }
        if NEW_RANK != RANK - (end - start) {
            return Err(TensorError::Unsupported(format!(
                "flatten of dims {start}..={end} on rank {RANK} yields rank {}, not {NEW_RANK}",
                RANK - (end - start)
            )));
        }

        let mut new_shape = [0; NEW_RANK];
        new_shape[..start].copy_from_slice(&self.shape[..start]);
        new_shape[start] = self.shape[start..=end].iter().product();
        new_shape[start + 1..].copy_from_slice(&self.shape[end + 1..]);

        self.reshape(new_shape)
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize; RANK] {
        &self.shape
    }

    /// Returns the strides of the tensor.
    pub fn strides(&self) -> &[usize; RANK] {
        &self.strides
    }

    /// Returns the underlying data as a slice.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying data as a mutable slice.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the tensor and returns its flat data.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Returns the total number of elements.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns the element at a multi-index.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::IndexOutOfBounds` if any coordinate exceeds its dimension.
    pub fn get(&self, index: [usize; RANK]) -> Result<T> {
        if index.iter().zip(self.shape.iter()).any(|(i, d)| i >= d) {
            return Err(TensorError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.to_vec(),
            });
        }
        let offset: usize = index
            .iter()
            .zip(self.strides.iter())
            .map(|(i, s)| i * s)
            .sum();
        Ok(self.data[offset])
    }
}

/// Row-major strides for a shape: the last dimension moves fastest.
pub(crate) fn compute_strides<const RANK: usize>(shape: &[usize; RANK]) -> [usize; RANK] {
    let mut strides = [0; RANK];
    let mut stride = 1;
    for i in (0..RANK).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// Linear offset -> multi-index, given row-major strides.
pub(crate) fn unravel<const RANK: usize>(mut offset: usize, strides: &[usize; RANK]) -> [usize; RANK] {
    let mut index = [0; RANK];
    for (i, &s) in strides.iter().enumerate() {
        if s == 0 {
            continue;
        }
        index[i] = offset / s;
        offset %= s;
    }
    index
}

impl<T, const RANK: usize> Debug for Tensor<T, RANK>
where
    T: TensorElem,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data_len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_creation() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        let tensor = Tensor::<f32, 2>::new(data.clone(), [2, 2]).unwrap();
        assert_eq!(tensor.shape(), &[2, 2]);
        assert_eq!(tensor.data(), &data[..]);

        let err = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0], [2, 2]);
        assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_zeros_ones_full() {
        assert_eq!(Tensor::<f32, 2>::zeros([2, 3]).data(), &[0.0; 6]);
        assert_eq!(Tensor::<f32, 2>::ones([2, 3]).data(), &[1.0; 6]);
        assert_eq!(Tensor::<f32, 1>::full([3], 2.5).data(), &[2.5; 3]);
    }

    #[test]
    fn test_from_fn_row_major() {
        let t = Tensor::<f32, 2>::from_fn([2, 3], |[r, c]| (r * 10 + c) as f32);
        assert_eq!(t.data(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_reshape() {
        let tensor = Tensor::<f32, 2>::zeros([2, 3]);

        let reshaped = tensor.reshape([3, 2]).unwrap();
        assert_eq!(reshaped.shape(), &[3, 2]);

        let err = reshaped.reshape([4, 2]);
        assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_flatten() {
        let t = Tensor::<f32, 3>::zeros([2, 3, 4]);
        let f: Tensor<f32, 2> = t.clone().flatten(0, 1).unwrap();
        assert_eq!(f.shape(), &[6, 4]);

        let f: Tensor<f32, 1> = t.clone().flatten(0, 2).unwrap();
        assert_eq!(f.shape(), &[24]);

        // Wrong output rank.
        let err = t.clone().flatten::<3>(0, 1);
        assert!(matches!(err, Err(TensorError::Unsupported(_))));

        let err = t.flatten::<2>(1, 3);
        assert!(matches!(err, Err(TensorError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn test_get() {
        let t = Tensor::<f32, 3>::from_fn([2, 2, 3], |[a, b, c]| (a * 100 + b * 10 + c) as f32);
        assert_eq!(t.get([1, 0, 2]).unwrap(), 102.0);
        assert!(matches!(
            t.get([2, 0, 0]),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_compute_strides_and_unravel() {
        let strides = compute_strides(&[2, 3, 4]);
        assert_eq!(strides, [12, 4, 1]);
        assert_eq!(unravel(23, &strides), [1, 2, 3]);
        assert_eq!(unravel(5, &strides), [0, 1, 1]);
    }

    #[test]
    fn test_macro() {
        let t = crate::tensor!([1.0f32, 2.0, 3.0, 4.0], [2, 2]);
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_tensor_error_display() {
        let err = TensorError::ShapeMismatch {
            expected: vec![2, 2],
            got: vec![4],
        };
        assert_eq!(err.to_string(), "Shape mismatch: expected [2, 2], got [4]");

        let err = TensorError::SequenceTooLong {
            seq_len: 9,
            max_seq_len: 8,
        };
        assert_eq!(
            err.to_string(),
            "Sequence too long: got 9 positions, maximum is 8"
        );
    }

    #[test]
    fn test_kernel_error_conversion() {
        let err: TensorError = decoder_rs_kernels::KernelError::RankTooLow { min: 2, rank: 1 }.into();
        assert!(matches!(err, TensorError::Unsupported(_)));
    }

    #[test]
    fn test_tensor_debug() {
        let t = Tensor::<f32, 1>::new(vec![1.0], [1]).unwrap();
        let s = format!("{:?}", t);
        assert!(s.contains("Tensor"));
        assert!(s.contains("shape"));
    }
}
