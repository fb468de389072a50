use crate::{KernelElem, KernelError, Result, check_len, check_rank};
use rayon::prelude::*;

/// Batched matrix multiplication over the last two dimensions.
///
/// `lhs` is `[..., M, K]`, `rhs` is `[..., K, N]`; leading (batch) dimensions must match
/// exactly. Returns the flat `[..., M, N]` product.
///
/// The right-hand side is transposed once up front so that every dot product walks two
/// contiguous rows. Output rows are distributed over the rayon pool.
pub fn cpu_matmul<T, const RANK: usize>(
    lhs_data: &[T],
    rhs_data: &[T],
    lhs_shape: &[usize; RANK],
    rhs_shape: &[usize; RANK],
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    check_rank::<RANK>(2)?;
    check_len(lhs_data.len(), lhs_shape)?;
    check_len(rhs_data.len(), rhs_shape)?;

    let m = lhs_shape[RANK - 2];
    let k = lhs_shape[RANK - 1];
    let n = rhs_shape[RANK - 1];

    if k != rhs_shape[RANK - 2] || lhs_shape[..RANK - 2] != rhs_shape[..RANK - 2] {
        return Err(KernelError::ShapeMismatch {
            expected: lhs_shape.to_vec(),
            got: rhs_shape.to_vec(),
        });
    }

    let batch: usize = lhs_shape[..RANK - 2].iter().product();
    let mut out_data = vec![T::zero(); batch * m * n];
    if out_data.is_empty() {
        return Ok(out_data);
    }

    // [..., K, N] -> [..., N, K]
    let rhs_t = crate::cpu_transpose(rhs_data, rhs_shape)?;

    out_data
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(row, out_row)| {
            let b = row / m;
            let r = row % m;

            let a_start = b * m * k + r * k;
            let a_row = &lhs_data[a_start..a_start + k];
            let bt_base = b * n * k;

            for (c, out) in out_row.iter_mut().enumerate() {
                let bt_row = &rhs_t[bt_base + c * k..bt_base + (c + 1) * k];
                let mut acc = T::zero();
                for (&x, &y) in a_row.iter().zip(bt_row) {
                    acc += x * y;
                }
                *out = acc;
            }
        });

    Ok(out_data)
}
