//! Householder vector construction
//!
//! For column `col` of `R` with active size `s = n - col`:
//!
//! ```text
//! v[j]  = -R[col + j][col]          j in 0..s
//! alpha = ||v||, negated when v[0] > 0
//! v[0] += alpha
//! v    /= ||v||                     when ||v|| > 0
//! ```
//!
//! `I - 2 v vᵗ` then maps the column onto a multiple of the first unit vector.
//! A zero norm after the update means the column is already zero at and
//! below the diagonal and the step is skipped.

use crate::comm::Communicator;
use crate::error::{Error, Result};
use crate::matrix::Matrix;

/// A unit Householder vector and the norm it was normalized by
#[derive(Clone, Debug, PartialEq)]
pub struct Reflection {
    /// Unit vector of length `s` (unnormalized when `norm` is zero)
    pub v: Vec<f32>,
    /// Norm of the sign-corrected vector before normalization
    pub norm: f32,
}

impl Reflection {
    /// Whether this column needs no reflection
    #[inline]
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn is_degenerate(&self) -> bool {
        // Also true for NaN
        !(self.norm > 0.0)
    }

    /// Active size this vector was built for
    #[inline]
    pub fn len(&self) -> usize {
        self.v.len()
    }

    /// Whether the vector is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Build the reflection for column `col` from the coordinator's copy of `r`
pub fn householder_vector(r: &Matrix, col: usize) -> Result<Reflection> {
    let n = r.n();
    if col >= n {
        return Err(Error::IndexOutOfBounds { row: col, col, n });
    }

    let mut v: Vec<f32> = (col..n).map(|row| -r[(row, col)]).collect();

    let mut alpha = norm(&v);
    if v[0] > 0.0 {
        alpha = -alpha;
    }
    v[0] += alpha;

    let norm = norm(&v);
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }

    Ok(Reflection { v, norm })
}

/// Collective: the coordinator builds the reflection, every worker receives it
///
/// `norm` and `v` travel in one buffer, norm first. Non-coordinators do not
/// read `r`.
pub fn householder_step<C: Communicator>(comm: &C, r: &Matrix, col: usize) -> Result<Reflection> {
    let n = r.n();
    if col >= n {
        return Err(Error::IndexOutOfBounds { row: col, col, n });
    }

    let s = n - col;
    let mut packet = vec![0.0f32; s + 1];
    if comm.role().is_coordinator() {
        let refl = householder_vector(r, col)?;
        packet[0] = refl.norm;
        packet[1..].copy_from_slice(&refl.v);
    }
    comm.broadcast(&mut packet)?;

    let norm = packet[0];
    packet.remove(0);
    Ok(Reflection { v: packet, norm })
}
