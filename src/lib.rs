//! # eigqr
//!
//! **Eigenvalues of real square matrices by distributed Householder QR iteration.**
//!
//! A fixed group of workers holds replicated copies of the working matrices.
//! Each QR iteration round factors the current iterate column by column: the
//! coordinator builds a Householder vector, every worker computes its row
//! block of the reflector products, and the blocks are gathered back and
//! re-broadcast before the next column. After a fixed number of rounds the
//! diagonal of the iterate approximates the eigenvalues.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eigqr::prelude::*;
//!
//! let config = SolverConfig::with_workers(4);
//! let report = solve(&config, || load_matrix("matrix.csv"), &mut ())?;
//! println!("{:?}", report.eigenvalues);
//! ```
//!
//! ## Modules
//!
//! - [`matrix`]: dense storage, products, input files
//! - [`partition`]: row splits across workers
//! - [`comm`]: broadcast/scatter/gather and the in-process worker group
//! - [`householder`], [`reflector`], [`qr`]: the distributed factorization
//! - [`driver`]: the QR iteration loop and top-level [`driver::solve`]
//!
//! ## Feature Flags
//!
//! - `rayon` (default): row-parallel recombination products on the coordinator

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod comm;
pub mod config;
pub mod driver;
pub mod error;
pub mod householder;
pub mod matrix;
pub mod partition;
pub mod qr;
pub mod reflector;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::comm::{Communicator, Role, SoloComm, ThreadComm};
    pub use crate::config::{MAX_WORKERS, SolverConfig};
    pub use crate::driver::{EigenReport, RoundObserver, qr_iterate, round_count, solve};
    pub use crate::error::{Error, Result};
    pub use crate::matrix::Matrix;
    pub use crate::matrix::io::{load_matrix, parse_matrix};
    pub use crate::qr::{QrDecomposition, qr_decompose};
}
