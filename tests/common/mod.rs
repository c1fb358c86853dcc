//! Common test utilities
#![allow(dead_code)]

use eigqr::comm::{ThreadComm, run_group};
use eigqr::error::Result;
use eigqr::matrix::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Assert two f32 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Check if matrix is close to identity
pub fn assert_near_identity(m: &Matrix, tol: f32, msg: &str) {
    let n = m.n();
    for i in 0..n {
        for j in 0..n {
            let expected = if i == j { 1.0 } else { 0.0 };
            let actual = m[(i, j)];
            let diff = (actual - expected).abs();
            assert!(
                diff <= tol,
                "{}: element [{},{}] differs: {} vs {} (diff={})",
                msg,
                i,
                j,
                actual,
                expected,
                diff
            );
        }
    }
}

/// Seeded random `n x n` matrix with entries in `[-1, 1)`
pub fn random_matrix(n: usize, seed: u64) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..n * n).map(|_| rng.random_range(-1.0f32..1.0)).collect();
    Matrix::from_vec(n, data).unwrap()
}

/// Seeded random symmetric `n x n` matrix
pub fn random_symmetric(n: usize, seed: u64) -> Matrix {
    let m = random_matrix(n, seed);
    let mut out = Matrix::zeros(n);
    for i in 0..n {
        for j in 0..n {
            out[(i, j)] = 0.5 * (m[(i, j)] + m[(j, i)]);
        }
    }
    out
}

/// Run the same collective body on every rank of a `workers`-sized group
/// and return the coordinator's value
pub fn on_group<T, F>(workers: usize, body: F) -> Result<T>
where
    F: Fn(&ThreadComm) -> Result<T> + Sync,
{
    run_group(workers, |comm| body(comm), |comm| body(comm).map(|_| ()))
}
