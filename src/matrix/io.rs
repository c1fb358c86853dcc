//! Matrix input files
//!
//! Format: the dimension `n` as the first token, then `n * n` values in
//! row-major order. Tokens are separated by commas and/or whitespace, so both
//!
//! ```text
//! 2,
//! 4,1,
//! 1,3,
//! ```
//!
//! and `2 4 1 1 3` describe the same matrix. Tokens after the last value are
//! ignored.

use super::{Matrix, element_count};
use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::Path;

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

/// Parse the dimension header and `n * n` values
pub fn parse_matrix(text: &str) -> Result<Matrix> {
    let mut iter = tokens(text).enumerate();

    let (_, head) = iter
        .next()
        .ok_or_else(|| Error::parse(0, "missing matrix dimension"))?;
    let n: usize = head
        .parse()
        .map_err(|_| Error::parse(0, format!("invalid matrix dimension '{head}'")))?;
    if n == 0 {
        return Err(Error::parse(0, "matrix dimension must be positive"));
    }

    // Every value takes at least one byte, so a header asking for more values
    // than the input has bytes can never be satisfied
    let expected = element_count(n)
        .filter(|&count| count <= text.len())
        .ok_or_else(|| {
            Error::parse(
                0,
                format!("matrix dimension {n} is too large for {} bytes of input", text.len()),
            )
        })?;
    let mut data = Vec::with_capacity(expected);
    for (idx, tok) in iter.by_ref().take(expected) {
        let value: f32 = tok
            .parse()
            .map_err(|_| Error::parse(idx, format!("invalid value '{tok}'")))?;
        data.push(value);
    }
    if data.len() < expected {
        return Err(Error::parse(
            data.len() + 1,
            format!("expected {expected} values, found {}", data.len()),
        ));
    }

    let extra = iter.count();
    if extra > 0 {
        debug!("ignoring {extra} trailing tokens after {n}x{n} matrix");
    }

    Matrix::from_vec(n, data)
}

/// Read and parse a matrix file
pub fn load_matrix(path: impl AsRef<Path>) -> Result<Matrix> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| {
        warn!("cannot open {}: {source}", path.display());
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let matrix = parse_matrix(&text)?;
    debug!("loaded {0}x{0} matrix from {1}", matrix.n(), path.display());
    Ok(matrix)
}
