//! Solver configuration

use crate::error::{Error, Result};

/// Upper bound on the number of workers in a group
pub const MAX_WORKERS: usize = 200;

/// Settings shared by the library entry points and the command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// Number of cooperating workers, including the coordinator
    pub workers: usize,
    /// Dump intermediate matrices
    pub verbose: bool,
    /// Print the final diagonal
    pub show_solution: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            verbose: true,
            show_solution: false,
        }
    }
}

impl SolverConfig {
    /// Default configuration with `workers` workers
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Enable or disable intermediate matrix dumps
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable or disable the final diagonal listing
    pub fn show_solution(mut self, show: bool) -> Self {
        self.show_solution = show;
        self
    }

    /// Reject worker counts outside `1..=MAX_WORKERS`
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid_config("workers", "at least one worker is required"));
        }
        if self.workers > MAX_WORKERS {
            return Err(Error::invalid_config(
                "workers",
                format!("{} exceeds the maximum of {MAX_WORKERS}", self.workers),
            ));
        }
        Ok(())
    }
}
