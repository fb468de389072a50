use crate::{KernelElem, Result, check_len, check_rank};
use rayon::prelude::*;

/// Swaps the last two dimensions: `[..., M, N] -> [..., N, M]`.
///
/// Parallelised over the rows of the output.
pub fn cpu_transpose<T, const RANK: usize>(data: &[T], shape: &[usize; RANK]) -> Result<Vec<T>>
where
    T: KernelElem,
{
    check_rank::<RANK>(2)?;
    check_len(data.len(), shape)?;

    let m = shape[RANK - 2];
    let n = shape[RANK - 1];
    let size: usize = shape.iter().product();

    let mut out = vec![T::zero(); size];
    if size == 0 {
        return Ok(out);
    }

    out.par_chunks_mut(m).enumerate().for_each(|(i, out_row)| {
        let base = (i / n) * m * n;
        let col = i % n;
        for (r, dst) in out_row.iter_mut().enumerate() {
            *dst = data[base + r * n + col];
        }
    });

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KernelError;

    #[test]
    fn test_transpose_2x3() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = cpu_transpose(&data, &[2, 3]).unwrap();
        assert_eq!(out, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_transpose_batched() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let out = cpu_transpose(&data, &[2, 2, 2]).unwrap();
        assert_eq!(out, vec![1.0, 3.0, 2.0, 4.0, 5.0, 7.0, 6.0, 8.0]);
    }

    #[test]
    fn test_transpose_rank_one() {
        let data = vec![1.0, 2.0];
        let err = cpu_transpose(&data, &[2]);
        assert!(matches!(err, Err(KernelError::RankTooLow { .. })));
    }

    #[test]
    fn test_transpose_data_len_mismatch() {
        let data = vec![1.0f32; 5];
        assert!(matches!(
            cpu_transpose(&data, &[2, 3]),
            Err(KernelError::ShapeMismatch { .. })
        ));
    }
}
