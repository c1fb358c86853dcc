//! Collective communication between workers
//!
//! Every worker holds private replicas of the working matrices. The only
//! channel between workers is a [`Communicator`], which offers the three
//! collectives the factorization needs:
//!
//! ```text
//! broadcast   coordinator -> all          whole buffer
//! scatter     coordinator -> each worker  one partition block each
//! gather      each worker -> coordinator  one partition block each
//! ```
//!
//! Each collective is a full barrier: no worker returns from it until every
//! worker in the group has entered it.
//!
//! Two transports are provided:
//! - [`SoloComm`]: a group of one, for single-worker runs and for exercising
//!   coordinator-only logic without threads
//! - [`ThreadComm`]: one handle per worker thread, backed by a shared
//!   rendezvous (see [`run_group`])

mod group;
mod solo;
mod threaded;

pub use group::run_group;
pub use solo::SoloComm;
pub use threaded::{ThreadComm, thread_group};

use crate::error::{Error, Result};
use crate::partition::RowPartition;

/// Rank of the coordinator in every group
pub const COORDINATOR: usize = 0;

/// What a worker is responsible for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Loads input, builds Householder vectors, owns the recombination
    Coordinator,
    /// Computes its partition blocks and mirrors the coordinator's state
    Worker,
}

impl Role {
    /// Role implied by a rank
    #[inline]
    pub fn of_rank(rank: usize) -> Self {
        if rank == COORDINATOR {
            Self::Coordinator
        } else {
            Self::Worker
        }
    }

    /// Whether this is the coordinator role
    #[inline]
    pub fn is_coordinator(self) -> bool {
        self == Self::Coordinator
    }
}

/// Owned data in flight between workers
#[derive(Clone, Debug)]
pub enum Payload {
    /// Matrix data
    F32(Vec<f32>),
    /// Headers and counters
    U64(Vec<u64>),
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for u64 {}
}

/// Element types that can travel through a collective
pub trait Wire: sealed::Sealed + Copy + Send + Sync + 'static {
    /// Wrap an owned buffer
    fn pack(data: Vec<Self>) -> Payload;
    /// View a payload as this type, if it carries this type
    fn unpack(payload: &Payload) -> Option<&[Self]>;
}

impl Wire for f32 {
    fn pack(data: Vec<Self>) -> Payload {
        Payload::F32(data)
    }

    fn unpack(payload: &Payload) -> Option<&[Self]> {
        match payload {
            Payload::F32(v) => Some(v),
            Payload::U64(_) => None,
        }
    }
}

impl Wire for u64 {
    fn pack(data: Vec<Self>) -> Payload {
        Payload::U64(data)
    }

    fn unpack(payload: &Payload) -> Option<&[Self]> {
        match payload {
            Payload::U64(v) => Some(v),
            Payload::F32(_) => None,
        }
    }
}

/// A worker's handle on its group
///
/// Every call is collective: all workers must make the same sequence of
/// calls with matching buffer sizes, or the group deadlocks or errors.
/// Arguments that only matter on the coordinator (`recv` for gather, `send`
/// for scatter) are ignored elsewhere and may be empty.
pub trait Communicator {
    /// This worker's rank in `0..size`
    fn rank(&self) -> usize;

    /// Number of workers in the group
    fn size(&self) -> usize;

    /// This worker's role
    fn role(&self) -> Role {
        Role::of_rank(self.rank())
    }

    /// Copy the coordinator's `buf` into every other worker's `buf`
    fn broadcast<T: Wire>(&self, buf: &mut [T]) -> Result<()>;

    /// Collect each worker's block of `partition` into the coordinator's `recv`
    fn gather<T: Wire>(&self, send: &[T], recv: &mut [T], partition: &RowPartition) -> Result<()>;

    /// Hand each worker its block of the coordinator's `send`
    fn scatter<T: Wire>(&self, send: &[T], recv: &mut [T], partition: &RowPartition) -> Result<()>;

    /// Tear the group down; pending and future collectives fail on every worker
    fn abort(&self);
}

/// Shape checks shared by the transports, run before entering a collective
pub(crate) fn check_partition(size: usize, partition: &RowPartition) -> Result<()> {
    if partition.parts() != size {
        return Err(Error::shape_mismatch(&[size], &[partition.parts()]));
    }
    Ok(())
}

pub(crate) fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::shape_mismatch(&[expected], &[got]));
    }
    Ok(())
}
