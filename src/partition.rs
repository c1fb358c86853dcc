//! Row partitions for the distributed column steps
//!
//! At column step `i` with active size `s = n - i` two partitions are live:
//!
//! ```text
//! active      s rows of width s   (reflector rows, R's active block)
//! full_width  n rows of width s   (Q's trailing columns)
//! ```
//!
//! Each worker gets `rows / P` rows; the highest rank also takes the
//! remainder `rows % P`. Counts and offsets are stored in elements
//! (`row_count * width`) so they can be handed straight to gather/scatter.

use crate::error::{Error, Result};
use std::ops::Range;

/// Contiguous, order-preserving split of `rows` rows of `width` elements across workers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowPartition {
    rows: usize,
    width: usize,
    counts: Vec<usize>,
    offsets: Vec<usize>,
}

impl RowPartition {
    /// Split `rows` rows of `width` elements across `workers`
    pub fn new(workers: usize, rows: usize, width: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::invalid_config(
                "workers",
                "a partition needs at least one worker",
            ));
        }

        let piece = rows / workers;
        let mut counts = Vec::with_capacity(workers);
        let mut offsets = Vec::with_capacity(workers);
        let mut offset = 0;
        for rank in 0..workers {
            let mut row_count = piece;
            if rank == workers - 1 {
                row_count += rows % workers;
            }
            counts.push(row_count * width);
            offsets.push(offset);
            offset += row_count * width;
        }

        Ok(Self {
            rows,
            width,
            counts,
            offsets,
        })
    }

    /// Number of workers this partition is split across
    #[inline]
    pub fn parts(&self) -> usize {
        self.counts.len()
    }

    /// Rows covered by the whole partition
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Elements per row
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Total elements covered (`rows * width`)
    #[inline]
    pub fn total(&self) -> usize {
        self.rows * self.width
    }

    /// Element count per worker
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Element offset per worker
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Element count owned by `rank`
    #[inline]
    pub fn count(&self, rank: usize) -> usize {
        self.counts[rank]
    }

    /// Element offset of `rank`'s block
    #[inline]
    pub fn offset(&self, rank: usize) -> usize {
        self.offsets[rank]
    }

    /// Element range owned by `rank`
    pub fn elements(&self, rank: usize) -> Range<usize> {
        self.offsets[rank]..self.offsets[rank] + self.counts[rank]
    }

    /// Row range (relative to the partitioned block) owned by `rank`
    pub fn row_range(&self, rank: usize) -> Range<usize> {
        if self.width == 0 {
            // Zero-width rows carry no data; hand the rows out by the same rule
            let piece = self.rows / self.parts();
            let start = piece * rank;
            let end = if rank + 1 == self.parts() {
                self.rows
            } else {
                start + piece
            };
            return start..end;
        }
        let start = self.offsets[rank] / self.width;
        start..start + self.counts[rank] / self.width
    }
}

/// The pair of partitions used at one column step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionPlan {
    /// `s x s` split for the reflector and R's active block
    pub active: RowPartition,
    /// `n x s` split for Q's trailing columns
    pub full_width: RowPartition,
}

impl PartitionPlan {
    /// Plan column step `col` of an `n x n` factorization across `workers`
    pub fn new(workers: usize, n: usize, col: usize) -> Result<Self> {
        if col >= n {
            return Err(Error::IndexOutOfBounds { row: col, col, n });
        }
        let s = n - col;
        Ok(Self {
            active: RowPartition::new(workers, s, s)?,
            full_width: RowPartition::new(workers, n, s)?,
        })
    }

    /// Active size `s` of this step
    #[inline]
    pub fn active_size(&self) -> usize {
        self.active.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_WORKERS;

    fn assert_covers(p: &RowPartition) {
        let mut next = 0;
        for rank in 0..p.parts() {
            assert_eq!(p.offset(rank), next, "rank {rank} is not contiguous");
            next += p.count(rank);
        }
        assert_eq!(next, p.total());
        assert_eq!(p.counts().iter().sum::<usize>(), p.rows() * p.width());
    }

    #[test]
    fn test_single_worker_takes_everything() {
        let p = RowPartition::new(1, 7, 3).unwrap();
        assert_eq!(p.counts(), &[21]);
        assert_eq!(p.offsets(), &[0]);
        assert_eq!(p.row_range(0), 0..7);
    }

    #[test]
    fn test_remainder_on_last_rank() {
        // 10 rows over 3 workers: 3, 3, 4
        let p = RowPartition::new(3, 10, 2).unwrap();
        assert_eq!(p.counts(), &[6, 6, 8]);
        assert_eq!(p.offsets(), &[0, 6, 12]);
        assert_eq!(p.row_range(2), 6..10);
    }

    #[test]
    fn test_fewer_rows_than_workers() {
        let p = RowPartition::new(4, 2, 2).unwrap();
        assert_eq!(p.counts(), &[0, 0, 0, 4]);
        assert_eq!(p.row_range(0), 0..0);
        assert_eq!(p.row_range(3), 0..2);
        assert_covers(&p);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            RowPartition::new(0, 4, 4),
            Err(Error::InvalidConfig { field: "workers", .. })
        ));
    }

    #[test]
    fn test_plan_shapes() {
        let plan = PartitionPlan::new(2, 5, 2).unwrap();
        assert_eq!(plan.active_size(), 3);
        assert_eq!(plan.active.counts(), &[3, 6]);
        assert_eq!(plan.full_width.counts(), &[6, 9]);
        assert!(PartitionPlan::new(2, 5, 5).is_err());
    }

    #[test]
    fn test_coverage_exhaustive() {
        for n in 1..=24 {
            for workers in 1..=MAX_WORKERS {
                for col in 0..n {
                    let plan = PartitionPlan::new(workers, n, col).unwrap();
                    assert_covers(&plan.active);
                    assert_covers(&plan.full_width);

                    let rows: usize = (0..workers).map(|r| plan.active.row_range(r).len()).sum();
                    assert_eq!(rows, n - col);
                }
            }
        }
    }
}
