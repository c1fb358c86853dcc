//! Distributed application of a Householder reflector
//!
//! For column step `col` with active size `s` and reflector `P = I - 2 v vᵗ`:
//!
//! 1. each worker builds its rows of `P` (active partition); the coordinator
//!    gathers them and broadcasts the full `s x s` reflector
//! 2. each worker computes its rows of `P · R[col.., col..]` (active
//!    partition); gathered into `R[col.., col..]` on the coordinator
//! 3. each worker computes its rows of `Q[.., col..] · P` (full-width
//!    partition); gathered into `Q[.., col..]` on the coordinator
//!
//! Only the coordinator's `R` and `Q` are written here. Replicas are brought
//! back in line by the broadcasts at the start of the next column step.

use crate::comm::Communicator;
use crate::error::{Error, Result};
use crate::householder::Reflection;
use crate::matrix::Matrix;
use crate::partition::{PartitionPlan, RowPartition};
use log::trace;
use std::ops::Range;

/// Rows `rows` of `I - 2 v vᵗ`, row-major
pub fn reflector_rows(v: &[f32], rows: Range<usize>) -> Vec<f32> {
    let s = v.len();
    let mut out = Vec::with_capacity(rows.len() * s);
    for r in rows {
        for (c, &vc) in v.iter().enumerate() {
            let value = if r == c {
                1.0 - 2.0 * v[r] * vc
            } else {
                -2.0 * v[r] * vc
            };
            out.push(value);
        }
    }
    out
}

/// Collective: every worker ends up with the full `s x s` reflector
pub fn assemble_reflector<C: Communicator>(
    comm: &C,
    v: &[f32],
    partition: &RowPartition,
) -> Result<Matrix> {
    let s = v.len();
    if partition.rows() != s || partition.width() != s {
        return Err(Error::shape_mismatch(
            &[s, s],
            &[partition.rows(), partition.width()],
        ));
    }

    let block = reflector_rows(v, partition.row_range(comm.rank()));
    let mut full = vec![0.0f32; s * s];
    comm.gather(&block, &mut full, partition)?;
    comm.broadcast(&mut full)?;
    Matrix::from_vec(s, full)
}

/// Rows `rows` of `P · R[col.., col..]`
fn reflect_r_rows(p: &Matrix, r: &Matrix, col: usize, rows: Range<usize>) -> Vec<f32> {
    let s = p.n();
    let n = r.n();
    let p_data = p.as_slice();
    let r_data = r.as_slice();
    let mut out = Vec::with_capacity(rows.len() * s);
    for k in rows {
        let p_row = &p_data[k * s..(k + 1) * s];
        for l in 0..s {
            let mut acc = 0.0f32;
            for (m, &pkm) in p_row.iter().enumerate() {
                acc += pkm * r_data[(col + m) * n + col + l];
            }
            out.push(acc);
        }
    }
    out
}

/// Rows `rows` of `Q[.., col..] · P`
fn reflect_q_rows(p: &Matrix, q: &Matrix, col: usize, rows: Range<usize>) -> Vec<f32> {
    let s = p.n();
    let n = q.n();
    let p_data = p.as_slice();
    let q_data = q.as_slice();
    let mut out = Vec::with_capacity(rows.len() * s);
    for k in rows {
        let q_tail = &q_data[k * n + col..(k + 1) * n];
        for l in 0..s {
            let mut acc = 0.0f32;
            for (m, &qkm) in q_tail.iter().enumerate() {
                acc += qkm * p_data[m * s + l];
            }
            out.push(acc);
        }
    }
    out
}

/// Collective: apply `refl` at column step `col` to the coordinator's `r` and `q`
///
/// Reads `r[col.., col..]` and `q[.., col..]` on every worker. Writes the same
/// ranges on the coordinator only. Degenerate reflections are a no-op and
/// involve no communication; every worker sees the same `refl`, so they all
/// take the same branch.
pub fn apply_reflection<C: Communicator>(
    comm: &C,
    r: &mut Matrix,
    q: &mut Matrix,
    col: usize,
    refl: &Reflection,
    plan: &PartitionPlan,
) -> Result<()> {
    if refl.is_degenerate() {
        return Ok(());
    }

    let n = r.n();
    let s = plan.active_size();
    if q.n() != n {
        return Err(Error::shape_mismatch(&[n, n], &[q.n(), q.n()]));
    }
    if refl.len() != s || col + s != n {
        return Err(Error::shape_mismatch(&[n.saturating_sub(col)], &[refl.len(), s]));
    }

    let rank = comm.rank();
    let coordinator = comm.role().is_coordinator();

    let p = assemble_reflector(comm, &refl.v, &plan.active)?;

    let r_rows = plan.active.row_range(rank);
    trace!("rank {rank}: column {col}, R rows {r_rows:?}");
    let block = reflect_r_rows(&p, r, col, r_rows);
    let mut gathered = vec![0.0f32; if coordinator { s * s } else { 0 }];
    comm.gather(&block, &mut gathered, &plan.active)?;
    if coordinator {
        r.write_block(col, col, s, s, &gathered)?;
    }

    let q_rows = plan.full_width.row_range(rank);
    trace!("rank {rank}: column {col}, Q rows {q_rows:?}");
    let block = reflect_q_rows(&p, q, col, q_rows);
    let mut gathered = vec![0.0f32; if coordinator { n * s } else { 0 }];
    comm.gather(&block, &mut gathered, &plan.full_width)?;
    if coordinator {
        q.write_block(0, col, n, s, &gathered)?;
    }

    Ok(())
}
