//! eigqr - eigenvalues by distributed Householder QR iteration
//!
//! ```text
//! eigqr --file matrix.csv [--workers 4] [--silent] [--solution]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use eigqr::driver::{RoundObserver, solve};
use eigqr::matrix::Matrix;
use eigqr::matrix::io::load_matrix;
use eigqr::prelude::SolverConfig;
use env_logger::Env;
use log::debug;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eigqr", version, about = "Eigenvalues by distributed Householder QR iteration")]
struct Cli {
    /// Input file: dimension n, then n*n comma-separated values
    #[arg(short, long, value_name = "PATH")]
    file: PathBuf,

    /// Number of workers, including the coordinator
    #[arg(short = 'n', long, default_value_t = 1)]
    workers: usize,

    /// Do not dump intermediate matrices
    #[arg(long)]
    silent: bool,

    /// Print the final diagonal
    #[arg(long)]
    solution: bool,
}

/// Prints Q, R, and A as the iteration progresses
struct Dump;

impl RoundObserver for Dump {
    fn factorized(&mut self, _round: usize, q: &Matrix, r: &Matrix) {
        println!("\nSolution is:");
        println!("Matrix Q.");
        print!("{q}");
        println!();
        println!("Matrix R.");
        print!("{r}");
    }

    fn recombined(&mut self, round: usize, a: &Matrix) {
        println!("Matrix A in {round} round.");
        print!("{a}");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    debug!("{cli:?}");

    let config = SolverConfig::with_workers(cli.workers)
        .verbose(!cli.silent)
        .show_solution(cli.solution);

    let verbose = config.verbose;
    let path = cli.file.clone();
    let load = move || -> eigqr::error::Result<Matrix> {
        let m = load_matrix(&path)?;
        if verbose {
            println!("matrix was successfully loaded to memory.\nMatrix:");
            print!("{m}");
        }
        Ok(m)
    };

    let report = if config.verbose {
        solve(&config, load, &mut Dump)
    } else {
        solve(&config, load, &mut ())
    }
    .with_context(|| format!("failed to compute eigenvalues of {}", cli.file.display()))?;

    if config.show_solution {
        println!("Eig values:\n--------------------------------------");
        for value in &report.eigenvalues {
            println!("{value:.6}");
        }
        println!("--------------------------------------");
    }
    println!("{:.6}", report.elapsed.as_secs_f64());

    Ok(())
}
