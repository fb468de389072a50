//! Sinusoidal positional encoding.
//!
//! `enc[p, 2i] = sin(p / n^(2i/d))` and `enc[p, 2i+1] = cos(p / n^(2i/d))` with `n = 10000`.
//! The table is computed once and never changes; it is a buffer, not a parameter.

use crate::tensor::{Result, Tensor, TensorElem, TensorError};

use rayon::prelude::*;
use tracing::debug;

/// Base of the geometric frequency progression.
pub const MAX_FREQ: f64 = 10000.0;

#[derive(Debug, Clone)]
pub struct PositionalEncoding<T: TensorElem> {
    table: Tensor<T, 2>,
}

impl<T: TensorElem> PositionalEncoding<T> {
    /// Precomputes the `[max_seq_len, hidden_size]` table.
    ///
    /// For an odd `hidden_size` the last column holds a sine.
    pub fn new(max_seq_len: usize, hidden_size: usize) -> Result<Self> {
        let d = hidden_size as f64;
        let data = (0..max_seq_len * hidden_size)
            .map(|idx| {
                let (p, c) = (idx / hidden_size, idx % hidden_size);
                let i = (c / 2) as f64;
                let angle = p as f64 / MAX_FREQ.powf(2.0 * i / d);
                let value = if c % 2 == 0 { angle.sin() } else { angle.cos() };
                T::from_f64(value).ok_or_else(|| {
                    TensorError::Unsupported("positional value not representable".into())
                })
            })
            .collect::<Result<Vec<T>>>()?;

        debug!(max_seq_len, hidden_size, "PositionalEncoding table built");
        Ok(Self {
            table: Tensor::new(data, [max_seq_len, hidden_size])?,
        })
    }

    pub fn max_seq_len(&self) -> usize {
        self.table.shape()[0]
    }

    pub fn hidden_size(&self) -> usize {
        self.table.shape()[1]
    }

    /// The full precomputed table.
    pub fn table(&self) -> &Tensor<T, 2> {
        &self.table
    }

    /// Adds `enc[0..seq]` to every batch row of `[batch, seq, hidden]`.
    ///
    /// # Errors
    ///
    /// `SequenceTooLong` if `seq > max_seq_len`, `ShapeMismatch` if `hidden` differs.
    pub fn forward(&self, x: &Tensor<T, 3>) -> Result<Tensor<T, 3>> {
        let [_, seq_len, hidden] = *x.shape();
        if hidden != self.hidden_size() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.hidden_size()],
                got: vec![hidden],
            });
        }
        if seq_len > self.max_seq_len() {
            return Err(TensorError::SequenceTooLong {
                seq_len,
                max_seq_len: self.max_seq_len(),
            });
        }

        let mut out = x.clone();
        let chunk = seq_len * hidden;
        if chunk == 0 {
            return Ok(out);
        }
        let rows = &self.table.data()[..chunk];
        out.data_mut().par_chunks_mut(chunk).for_each(|sample| {
            for (o, e) in sample.iter_mut().zip(rows.iter()) {
                *o += *e;
            }
        });
        Ok(out)
    }
}
