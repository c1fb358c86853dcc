//! Dense square matrix storage
//!
//! [`Matrix`] is the replicated buffer every worker holds. Storage is a single
//! contiguous row-major `Vec<f32>` so a whole matrix (or a run of whole rows)
//! can be handed to a collective as one slice.
//!
//! Element access has two forms:
//! - [`Matrix::get`] / [`Matrix::set`] return [`Error::IndexOutOfBounds`]
//! - `m[(row, col)]` panics with the offending index
//!
//! Block helpers ([`Matrix::read_block`], [`Matrix::write_block`]) move
//! rectangular sub-ranges in and out of flat row-major buffers, which is the
//! layout the partitioned reflector work uses.

pub mod io;
mod ops;

pub use ops::{matmul, matmul_transposed_lhs};

use crate::error::{Error, Result};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Square `n x n` matrix of `f32`, row-major, contiguous
#[derive(Clone, PartialEq)]
pub struct Matrix {
    n: usize,
    data: Vec<f32>,
}

/// `n * n`, or `None` when it does not fit `usize`
pub(crate) fn element_count(n: usize) -> Option<usize> {
    n.checked_mul(n)
}

impl Matrix {
    /// Create an `n x n` matrix of zeros
    ///
    /// # Panics
    ///
    /// Panics if `n * n` overflows `usize`.
    pub fn zeros(n: usize) -> Self {
        let len = element_count(n)
            .unwrap_or_else(|| panic!("matrix dimension {n} overflows the element count"));
        Self {
            n,
            data: vec![0.0; len],
        }
    }

    /// Create the `n x n` identity
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n);
        m.set_identity();
        m
    }

    /// Wrap a row-major buffer of exactly `n * n` elements
    pub fn from_vec(n: usize, data: Vec<f32>) -> Result<Self> {
        match element_count(n) {
            Some(len) if len == data.len() => Ok(Self { n, data }),
            _ => Err(Error::shape_mismatch(&[n, n], &[data.len()])),
        }
    }

    /// Build from nested rows; every row must have as many entries as there are rows
    pub fn from_rows(rows: &[&[f32]]) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(Error::shape_mismatch(&[n, n], &[n, row.len()]));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { n, data })
    }

    /// Matrix dimension
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Total number of elements (`n * n`)
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether this is the empty `0 x 0` matrix
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Contiguous row-major storage
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable contiguous row-major storage
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the matrix and return its storage
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    fn check(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.n || col >= self.n {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                n: self.n,
            });
        }
        Ok(row * self.n + col)
    }

    /// Checked element read
    pub fn get(&self, row: usize, col: usize) -> Result<f32> {
        let idx = self.check(row, col)?;
        Ok(self.data[idx])
    }

    /// Checked element write
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        let idx = self.check(row, col)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Row `row` as a slice
    pub fn row(&self, row: usize) -> &[f32] {
        assert!(row < self.n, "row {row} out of bounds for {0}x{0} matrix", self.n);
        &self.data[row * self.n..(row + 1) * self.n]
    }

    /// Set every element to `value`
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Overwrite with the identity
    pub fn set_identity(&mut self) {
        self.data.fill(0.0);
        for i in 0..self.n {
            self.data[i * self.n + i] = 1.0;
        }
    }

    /// Element-wise copy from a matrix of equal size
    pub fn copy_from(&mut self, other: &Matrix) -> Result<()> {
        if other.n != self.n {
            return Err(Error::shape_mismatch(
                &[self.n, self.n],
                &[other.n, other.n],
            ));
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Main diagonal
    pub fn diagonal(&self) -> Vec<f32> {
        (0..self.n).map(|i| self.data[i * self.n + i]).collect()
    }

    /// Transposed copy
    pub fn transpose(&self) -> Matrix {
        let n = self.n;
        let mut out = Matrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                out.data[j * n + i] = self.data[i * n + j];
            }
        }
        out
    }

    /// Largest absolute element-wise difference to `other`
    pub fn max_abs_diff(&self, other: &Matrix) -> Result<f32> {
        if other.n != self.n {
            return Err(Error::shape_mismatch(
                &[self.n, self.n],
                &[other.n, other.n],
            ));
        }
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .fold(0.0f32, |acc, (a, b)| acc.max((a - b).abs())))
    }

    fn check_block(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> Result<()> {
        if row0 + rows > self.n || col0 + cols > self.n {
            return Err(Error::IndexOutOfBounds {
                row: row0 + rows.saturating_sub(1),
                col: col0 + cols.saturating_sub(1),
                n: self.n,
            });
        }
        Ok(())
    }

    /// Copy the block `[row0..row0+rows, col0..col0+cols]` into a flat row-major buffer
    pub fn read_block(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> Result<Vec<f32>> {
        self.check_block(row0, col0, rows, cols)?;
        let mut out = Vec::with_capacity(rows * cols);
        for r in row0..row0 + rows {
            let start = r * self.n + col0;
            out.extend_from_slice(&self.data[start..start + cols]);
        }
        Ok(out)
    }

    /// Overwrite the block `[row0..row0+rows, col0..col0+cols]` from a flat row-major buffer
    pub fn write_block(
        &mut self,
        row0: usize,
        col0: usize,
        rows: usize,
        cols: usize,
        src: &[f32],
    ) -> Result<()> {
        self.check_block(row0, col0, rows, cols)?;
        if src.len() != rows * cols {
            return Err(Error::shape_mismatch(&[rows, cols], &[src.len()]));
        }
        for (k, chunk) in src.chunks_exact(cols.max(1)).take(rows).enumerate() {
            let start = (row0 + k) * self.n + col0;
            self.data[start..start + cols].copy_from_slice(&chunk[..cols]);
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        assert!(
            row < self.n && col < self.n,
            "index ({row}, {col}) out of bounds for {0}x{0} matrix",
            self.n
        );
        &self.data[row * self.n + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        assert!(
            row < self.n && col < self.n,
            "index ({row}, {col}) out of bounds for {0}x{0} matrix",
            self.n
        );
        &mut self.data[row * self.n + col]
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix({}x{}) ", self.n, self.n)?;
        f.debug_list()
            .entries(self.data.chunks(self.n.max(1)))
            .finish()
    }
}

/// One row per line, values as `{:.6}` separated by single spaces
impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.n {
            for (c, v) in self.row(r).iter().enumerate() {
                if c > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{v:.6}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
