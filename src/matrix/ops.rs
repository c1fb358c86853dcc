//! Dense matrix products used by the recombination step
//!
//! Both products are row-parallel under the `rayon` feature: every output row
//! depends only on the inputs, so rows are computed independently.

use super::Matrix;
use crate::error::{Error, Result};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Rows handed to one rayon task at minimum
#[cfg(feature = "rayon")]
const MIN_ROWS_PER_TASK: usize = 8;

fn check_same_size(a: &Matrix, b: &Matrix) -> Result<usize> {
    if a.n() != b.n() {
        return Err(Error::shape_mismatch(&[a.n(), a.n()], &[b.n(), b.n()]));
    }
    Ok(a.n())
}

/// `out[k][l] = sum_m a[k][m] * b[m][l]`
fn matmul_row(a: &Matrix, b: &Matrix, k: usize, out_row: &mut [f32]) {
    let n = a.n();
    let a_row = a.row(k);
    let b_data = b.as_slice();
    for (l, out) in out_row.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for (&a_km, b_row) in a_row.iter().zip(b_data.chunks_exact(n)) {
            acc += a_km * b_row[l];
        }
        *out = acc;
    }
}

/// `out[k][l] = sum_m a[m][k] * b[m][l]`
fn matmul_transposed_lhs_row(a: &Matrix, b: &Matrix, k: usize, out_row: &mut [f32]) {
    let n = a.n();
    let a_data = a.as_slice();
    let b_data = b.as_slice();
    for (l, out) in out_row.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for (a_row, b_row) in a_data.chunks_exact(n).zip(b_data.chunks_exact(n)) {
            acc += a_row[k] * b_row[l];
        }
        *out = acc;
    }
}

fn for_each_row(out: &mut Matrix, f: impl Fn(usize, &mut [f32]) + Sync + Send) {
    let n = out.n();
    if n == 0 {
        return;
    }

    #[cfg(feature = "rayon")]
    if n > 1 {
        out.as_mut_slice()
            .par_chunks_mut(n)
            .enumerate()
            .with_min_len(MIN_ROWS_PER_TASK)
            .for_each(|(k, row)| f(k, row));
        return;
    }

    for (k, row) in out.as_mut_slice().chunks_mut(n).enumerate() {
        f(k, row);
    }
}

/// Matrix product `a · b`
pub fn matmul(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let n = check_same_size(a, b)?;
    let mut out = Matrix::zeros(n);
    for_each_row(&mut out, |k, row| matmul_row(a, b, k, row));
    Ok(out)
}

/// Matrix product `aᵗ · b` without materializing the transpose
pub fn matmul_transposed_lhs(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let n = check_same_size(a, b)?;
    let mut out = Matrix::zeros(n);
    for_each_row(&mut out, |k, row| matmul_transposed_lhs_row(a, b, k, row));
    Ok(out)
}
