//! Integration tests for the QR iteration driver
//!
//! Tests verify:
//! - Known spectra: symmetric 2x2 and a rotated diagonal matrix
//! - Worker-count independence of the final diagonal
//! - Trace preservation across rounds
//! - Setup failures reach every worker and surface the coordinator's error
//! - Configuration bounds are enforced before any work starts

use eigqr::comm::SoloComm;
use eigqr::config::{MAX_WORKERS, SolverConfig};
use eigqr::driver::{RoundObserver, qr_iterate, qr_iterate_rounds, round_count, solve};
use eigqr::error::Error;
use eigqr::matrix::io::{load_matrix, parse_matrix};
use eigqr::matrix::{Matrix, matmul};
use eigqr::qr::qr_decompose;
use std::cell::Cell;
use std::io::Write;

mod common;

use common::{assert_allclose_f32, on_group, random_matrix, random_symmetric};

// ============================================================================
// Helper Functions
// ============================================================================

fn trace(m: &Matrix) -> f32 {
    m.diagonal().iter().sum()
}

fn sorted_desc(mut values: Vec<f32>) -> Vec<f32> {
    values.sort_by(|a, b| b.total_cmp(a));
    values
}

/// Q · diag(values) · Qᵗ for a random orthogonal Q
fn with_spectrum(values: &[f32], seed: u64) -> Matrix {
    let n = values.len();
    let q = qr_decompose(&SoloComm, &random_matrix(n, seed)).unwrap().q;
    let mut d = Matrix::zeros(n);
    for (i, &v) in values.iter().enumerate() {
        d[(i, i)] = v;
    }
    matmul(&matmul(&q, &d).unwrap(), &q.transpose()).unwrap()
}

// ============================================================================
// Spectra
// ============================================================================

#[test]
fn test_symmetric_2x2_fixed_schedule() {
    let a = Matrix::from_rows(&[&[4.0, 1.0], &[1.0, 3.0]]).unwrap();
    for workers in [1, 2, 3] {
        let config = SolverConfig::with_workers(workers);
        let report = solve(&config, || Ok(a.clone()), &mut ()).unwrap();
        assert_eq!(report.rounds, round_count(2));
        assert_eq!(report.rounds, 2);

        // (4.618, 2.382) after 2 unshifted rounds is roughly (4.559, 2.441)
        assert!((report.eigenvalues[0] - 4.618).abs() < 0.1);
        assert!((report.eigenvalues[1] - 2.382).abs() < 0.1);
        assert!(report.eigenvalues[0] > report.eigenvalues[1]);
    }
}

#[test]
fn test_rotated_diagonal_converges_with_enough_rounds() {
    let a = with_spectrum(&[5.0, 3.0, 1.0, 0.5], 21);
    let report = on_group(3, |comm| qr_iterate_rounds(comm, a.clone(), 80, &mut ())).unwrap();
    let got = sorted_desc(report.eigenvalues);
    assert_allclose_f32(&got, &[5.0, 3.0, 1.0, 0.5], 0.0, 1e-3, "eigenvalues");
}

#[test]
fn test_single_worker_equivalence() {
    let a = random_symmetric(10, 3);
    let solo = qr_iterate(&SoloComm, a.clone(), &mut ()).unwrap();
    for workers in [2, 4, 11] {
        let grouped = on_group(workers, |comm| qr_iterate(comm, a.clone(), &mut ())).unwrap();
        assert_eq!(grouped.rounds, solo.rounds);
        assert_allclose_f32(
            &grouped.eigenvalues,
            &solo.eigenvalues,
            0.0,
            1e-4,
            &format!("diagonal with {workers} workers"),
        );
    }
}

#[test]
fn test_trace_preserved() {
    let a = random_matrix(8, 9);
    let report = qr_iterate(&SoloComm, a.clone(), &mut ()).unwrap();
    assert!((trace(&report.a) - trace(&a)).abs() < 1e-3);
}

#[test]
fn test_triangular_input_is_a_fixed_point() {
    let a = Matrix::from_rows(&[&[2.0, 1.0, 7.0], &[0.0, -3.0, 1.0], &[0.0, 0.0, 0.5]]).unwrap();
    let report = on_group(2, |comm| qr_iterate(comm, a.clone(), &mut ())).unwrap();
    assert_eq!(report.eigenvalues, vec![2.0, -3.0, 0.5]);
    assert_eq!(report.skipped_columns, 3 * report.rounds);
    assert_eq!(report.q, Matrix::identity(3));
}

// ============================================================================
// Observer
// ============================================================================

#[derive(Default)]
struct Rounds {
    factorized: usize,
    recombined: Vec<f32>,
}

impl RoundObserver for Rounds {
    fn factorized(&mut self, _round: usize, q: &Matrix, r: &Matrix) {
        assert_eq!(q.n(), r.n());
        self.factorized += 1;
    }

    fn recombined(&mut self, _round: usize, a: &Matrix) {
        self.recombined.push(a[(0, 0)]);
    }
}

#[test]
fn test_observer_runs_on_coordinator_only() {
    let a = random_matrix(10, 1);
    let mut rounds = Rounds::default();
    let report = solve(&SolverConfig::with_workers(4), || Ok(a.clone()), &mut rounds).unwrap();
    assert_eq!(report.rounds, 4);
    assert_eq!(rounds.factorized, 4);
    assert_eq!(rounds.recombined.len(), 4);
    assert_eq!(*rounds.recombined.last().unwrap(), report.a[(0, 0)]);
}

// ============================================================================
// Input files and setup failures
// ============================================================================

#[test]
fn test_solve_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "3,\n2,1,0,\n1,3,1,\n0,1,4,\n").unwrap();
    let path = file.path().to_path_buf();

    let solo = solve(&SolverConfig::with_workers(1), || load_matrix(&path), &mut ()).unwrap();
    let grouped = solve(&SolverConfig::with_workers(3), || load_matrix(&path), &mut ()).unwrap();

    assert_eq!(solo.rounds, 2);
    assert!((trace(&solo.a) - 9.0).abs() < 1e-4);
    assert_allclose_f32(&grouped.eigenvalues, &solo.eigenvalues, 0.0, 1e-5, "file input");
}

#[test]
fn test_missing_file_reported_by_coordinator() {
    for workers in [1, 4] {
        let err = solve(
            &SolverConfig::with_workers(workers),
            || load_matrix("/no/such/matrix.csv"),
            &mut (),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "workers={workers}: {err:?}");
    }
}

#[test]
fn test_malformed_input_reported_by_coordinator() {
    let err = solve(
        &SolverConfig::with_workers(3),
        || parse_matrix("two,\n1,2,3,4"),
        &mut (),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Parse { token: 0, .. }), "{err:?}");
}

#[test]
fn test_worker_bounds_checked_before_loading() {
    for workers in [0, MAX_WORKERS + 1] {
        let loaded = Cell::new(false);
        let err = solve(
            &SolverConfig::with_workers(workers),
            || {
                loaded.set(true);
                Ok(Matrix::identity(2))
            },
            &mut (),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "workers", .. }));
        assert!(!loaded.get());
    }
}
