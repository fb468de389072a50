use crate::{KernelElem, KernelError, Result};
use num_traits::Float;
use rayon::prelude::*;

/// Score written into masked (future) positions before the softmax.
pub const MASK_FILL: f64 = -1e9;

/// Causal masked softmax over a stack of `[seq, seq]` score matrices, in place.
///
/// For row `i` of every matrix, entries `j > i` are replaced by [`MASK_FILL`] and the row
/// is then normalised. The diagonal is never masked, so every row keeps at least one
/// finite score.
pub fn cpu_causal_softmax<T>(scores: &mut [T], seq: usize) -> Result<()>
where
    T: KernelElem + Float,
{
    if seq == 0 {
        return Ok(());
    }
    if scores.len() % (seq * seq) != 0 {
        return Err(KernelError::ShapeMismatch {
            expected: vec![seq, seq],
            got: vec![scores.len()],
        });
    }

    let fill = T::from_f64(MASK_FILL).unwrap_or_else(T::neg_infinity);

    scores
        .par_chunks_mut(seq)
        .enumerate()
        .for_each(|(row, values)| {
            let i = row % seq;
            for v in values[i + 1..].iter_mut() {
                *v = fill;
            }
            softmax_row(values);
        });

    Ok(())
}

fn softmax_row<T: KernelElem + Float>(row: &mut [T]) {
    let max = row.iter().copied().fold(T::neg_infinity(), T::max);

    let mut sum = T::zero();
    for v in row.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }

    let inv = T::one() / sum;
    for v in row.iter_mut() {
        *v *= inv;
    }
}
