//! Distributed Householder QR factorization
//!
//! Column `col` runs, on every worker:
//!
//! ```text
//! broadcast R, Q          replicas agree
//! householder_step        coordinator builds v, everyone receives it
//! apply_reflection        skipped when v is degenerate
//! ```
//!
//! After the last column `R` and `Q` are broadcast once more, so every worker
//! leaves with the coordinator's result and `Q · R` reproduces the input.

use crate::comm::Communicator;
use crate::error::{Error, Result};
use crate::householder::householder_step;
use crate::matrix::Matrix;
use crate::partition::PartitionPlan;
use crate::reflector::apply_reflection;
use log::trace;

/// Per-call counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FactorStats {
    /// Columns where a reflector was applied
    pub reflected: usize,
    /// Columns already zero below the diagonal
    pub skipped: usize,
}

/// Q and R factors of a square matrix
#[derive(Clone, Debug)]
pub struct QrDecomposition {
    /// Orthogonal factor
    pub q: Matrix,
    /// Upper-triangular factor
    pub r: Matrix,
    /// Reflected/skipped column counts
    pub stats: FactorStats,
}

/// Collective: factor `r` in place into `Q · R`
///
/// On entry `r` holds the matrix to factor (the coordinator's copy is the one
/// used). `q` is overwritten with the identity and accumulates the reflectors.
pub fn factorize<C: Communicator>(comm: &C, r: &mut Matrix, q: &mut Matrix) -> Result<FactorStats> {
    let n = r.n();
    if q.n() != n {
        return Err(Error::shape_mismatch(&[n, n], &[q.n(), q.n()]));
    }

    q.set_identity();
    let mut stats = FactorStats::default();

    for col in 0..n {
        let plan = PartitionPlan::new(comm.size(), n, col)?;

        comm.broadcast(r.as_mut_slice())?;
        comm.broadcast(q.as_mut_slice())?;

        let refl = householder_step(comm, r, col)?;
        if refl.is_degenerate() {
            trace!("column {col}: zero below diagonal, skipped");
            stats.skipped += 1;
            continue;
        }

        apply_reflection(comm, r, q, col, &refl, &plan)?;
        stats.reflected += 1;
    }

    comm.broadcast(r.as_mut_slice())?;
    comm.broadcast(q.as_mut_slice())?;

    Ok(stats)
}

/// Collective: factor `a` without touching it
pub fn qr_decompose<C: Communicator>(comm: &C, a: &Matrix) -> Result<QrDecomposition> {
    let mut r = a.clone();
    let mut q = Matrix::zeros(a.n());
    let stats = factorize(comm, &mut r, &mut q)?;
    Ok(QrDecomposition { q, r, stats })
}
