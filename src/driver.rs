//! Unshifted QR iteration
//!
//! Each round factors the current iterate `A = Q · R` across the group and
//! recombines on the coordinator:
//!
//! ```text
//! R ← A, Q ← 0
//! factorize(R, Q)            distributed, column by column
//! A ← (Qᵗ · A) · Q           coordinator, then broadcast
//! ```
//!
//! The number of rounds is fixed by the dimension: `min(20, ⌈√n⌉)`. There is
//! no convergence test; the diagonal of `A` after the last round is reported
//! as the eigenvalue estimates.

use crate::comm::{COORDINATOR, Communicator, SoloComm, run_group};
use crate::config::SolverConfig;
use crate::error::{Error, Result};
use crate::matrix::{Matrix, matmul, matmul_transposed_lhs};
use crate::qr::factorize;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Upper bound on QR iteration rounds
pub const MAX_ROUNDS: usize = 20;

/// `min(MAX_ROUNDS, ⌈√n⌉)`
pub fn round_count(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root.min(MAX_ROUNDS)
}

/// Hooks called on the coordinator as the iteration progresses
pub trait RoundObserver {
    /// After the factorization of round `round`
    fn factorized(&mut self, _round: usize, _q: &Matrix, _r: &Matrix) {}

    /// After the recombination of round `round`
    fn recombined(&mut self, _round: usize, _a: &Matrix) {}
}

impl RoundObserver for () {}

/// Outcome of a full run, as seen by the coordinator
#[derive(Clone, Debug)]
pub struct EigenReport {
    /// Diagonal of the final iterate
    pub eigenvalues: Vec<f32>,
    /// Final iterate
    pub a: Matrix,
    /// Orthogonal factor of the last round
    pub q: Matrix,
    /// Triangular factor of the last round
    pub r: Matrix,
    /// Rounds performed
    pub rounds: usize,
    /// Columns skipped as already reduced, over all rounds
    pub skipped_columns: usize,
    /// Wall time of the iteration loop
    pub elapsed: Duration,
}

/// Collective: give every worker the coordinator's input matrix
///
/// The coordinator passes its load result; other workers pass `None`. A
/// header `[valid, n]` goes out first so that a failed load releases every
/// worker before any matrix-sized collective is attempted. On failure the
/// coordinator returns the load error and the others return
/// [`Error::Setup`].
pub fn share_input<C: Communicator>(comm: &C, input: Option<Result<Matrix>>) -> Result<Matrix> {
    let mut header = [0u64; 2];
    let mut loaded = None;

    if comm.role().is_coordinator() {
        match input {
            Some(Ok(m)) => {
                header = [1, m.n() as u64];
                loaded = Some(m);
            }
            Some(Err(e)) => {
                warn!("setup failed on coordinator: {e}");
                comm.broadcast(&mut header)?;
                return Err(e);
            }
            None => {
                comm.broadcast(&mut header)?;
                return Err(Error::Internal(
                    "coordinator started without an input".to_string(),
                ));
            }
        }
    }

    comm.broadcast(&mut header)?;
    if header[0] == 0 {
        return Err(Error::Setup);
    }

    let n = usize::try_from(header[1])
        .map_err(|_| Error::Internal(format!("dimension {} does not fit usize", header[1])))?;
    let mut a = loaded.unwrap_or_else(|| Matrix::zeros(n));
    comm.broadcast(a.as_mut_slice())?;
    Ok(a)
}

/// Collective: run the fixed QR iteration schedule on `a`
///
/// Every worker returns a report; after each round all replicas are equal,
/// so the reports agree. The observer is only called on the coordinator.
pub fn qr_iterate<C, O>(comm: &C, a: Matrix, observer: &mut O) -> Result<EigenReport>
where
    C: Communicator,
    O: RoundObserver + ?Sized,
{
    let rounds = round_count(a.n());
    qr_iterate_rounds(comm, a, rounds, observer)
}

/// Collective: run exactly `rounds` QR iteration rounds on `a`
pub fn qr_iterate_rounds<C, O>(
    comm: &C,
    mut a: Matrix,
    rounds: usize,
    observer: &mut O,
) -> Result<EigenReport>
where
    C: Communicator,
    O: RoundObserver + ?Sized,
{
    let n = a.n();
    let coordinator = comm.role().is_coordinator();

    let mut r = Matrix::zeros(n);
    let mut q = Matrix::zeros(n);
    let mut skipped_columns = 0;

    let start = Instant::now();
    for round in 0..rounds {
        r.copy_from(&a)?;
        q.fill(0.0);

        let stats = factorize(comm, &mut r, &mut q)?;
        skipped_columns += stats.skipped;

        if coordinator {
            observer.factorized(round, &q, &r);
            let qt_a = matmul_transposed_lhs(&q, &a)?;
            a = matmul(&qt_a, &q)?;
        }
        comm.broadcast(a.as_mut_slice())?;

        if coordinator {
            observer.recombined(round, &a);
        }
        debug!(
            "rank {}: round {}/{rounds} done ({} reflected, {} skipped)",
            comm.rank(),
            round + 1,
            stats.reflected,
            stats.skipped
        );
    }
    let elapsed = start.elapsed();

    Ok(EigenReport {
        eigenvalues: a.diagonal(),
        a,
        q,
        r,
        rounds,
        skipped_columns,
        elapsed,
    })
}

/// Load, distribute, and iterate with `config.workers` workers
///
/// `load` runs once, on the coordinator. The coordinator runs on the calling
/// thread, which is also where `observer` is called.
pub fn solve<L, O>(config: &SolverConfig, load: L, observer: &mut O) -> Result<EigenReport>
where
    L: FnOnce() -> Result<Matrix>,
    O: RoundObserver + ?Sized,
{
    config.validate()?;

    if config.workers == 1 {
        let comm = SoloComm;
        let a = share_input(&comm, Some(load()))?;
        return finish(qr_iterate(&comm, a, observer)?, config.workers);
    }

    let report = run_group(
        config.workers,
        |comm| {
            debug_assert_eq!(comm.rank(), COORDINATOR);
            let a = share_input(comm, Some(load()))?;
            qr_iterate(comm, a, observer)
        },
        |comm| {
            let a = share_input(comm, None)?;
            qr_iterate(comm, a, &mut ())?;
            Ok(())
        },
    )?;
    finish(report, config.workers)
}

fn finish(report: EigenReport, workers: usize) -> Result<EigenReport> {
    info!(
        "{0}x{0} matrix: {1} rounds on {workers} workers in {2:.6}s",
        report.a.n(),
        report.rounds,
        report.elapsed.as_secs_f64()
    );
    Ok(report)
}
