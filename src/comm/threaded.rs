//! In-process worker group backed by a shared rendezvous
//!
//! All collectives go through one primitive, `exchange`: every worker deposits
//! an optional payload, the last worker to arrive publishes the full set of
//! deposits and wakes the others, and every worker then reads what it needs
//! from the published snapshot.
//!
//! A worker cannot start the next exchange's publication before every worker
//! has read the current one, since publication needs all `size` deposits.
//! That keeps one published snapshot sufficient.

use super::{COORDINATOR, Communicator, Payload, Wire, check_len, check_partition};
use crate::error::{Error, Result};
use crate::partition::RowPartition;
use log::trace;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

type Snapshot = Arc<Vec<Option<Payload>>>;

struct State {
    slots: Vec<Option<Payload>>,
    arrived: usize,
    generation: u64,
    published: Snapshot,
    aborted: bool,
}

struct Rendezvous {
    size: usize,
    state: Mutex<State>,
    cond: Condvar,
}

impl Rendezvous {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(State {
                slots: (0..size).map(|_| None).collect(),
                arrived: 0,
                generation: 0,
                published: Arc::new(Vec::new()),
                aborted: false,
            }),
            cond: Condvar::new(),
        }
    }

    fn exchange(&self, rank: usize, deposit: Option<Payload>) -> Result<Snapshot> {
        let mut state = self.state.lock();
        if state.aborted {
            return Err(Error::GroupAborted);
        }

        state.slots[rank] = deposit;
        state.arrived += 1;

        if state.arrived == self.size {
            let fresh = (0..self.size).map(|_| None).collect();
            let slots = std::mem::replace(&mut state.slots, fresh);
            state.published = Arc::new(slots);
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cond.notify_all();
            return Ok(Arc::clone(&state.published));
        }

        let generation = state.generation;
        while state.generation == generation && !state.aborted {
            self.cond.wait(&mut state);
        }
        if state.generation == generation {
            return Err(Error::GroupAborted);
        }
        Ok(Arc::clone(&state.published))
    }

    fn abort(&self) {
        let mut state = self.state.lock();
        if !state.aborted {
            state.aborted = true;
            self.cond.notify_all();
        }
    }
}

/// One worker's handle on an in-process group
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Rendezvous>,
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

/// Create the handles for a group of `size` workers, indexed by rank
///
/// The handles only make progress when each one is driven by its own thread.
pub fn thread_group(size: usize) -> Result<Vec<ThreadComm>> {
    if size == 0 {
        return Err(Error::invalid_config("workers", "at least one worker is required"));
    }
    let shared = Arc::new(Rendezvous::new(size));
    Ok((0..size)
        .map(|rank| ThreadComm {
            rank,
            shared: Arc::clone(&shared),
        })
        .collect())
}

fn payload_of<T: Wire>(snapshot: &Snapshot, rank: usize) -> Result<&[T]> {
    snapshot
        .get(rank)
        .and_then(|slot| slot.as_ref())
        .and_then(T::unpack)
        .ok_or_else(|| Error::Internal(format!("missing or mistyped payload from rank {rank}")))
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn broadcast<T: Wire>(&self, buf: &mut [T]) -> Result<()> {
        let deposit = (self.rank == COORDINATOR).then(|| T::pack(buf.to_vec()));
        let snapshot = self.shared.exchange(self.rank, deposit)?;
        if self.rank != COORDINATOR {
            let data = payload_of::<T>(&snapshot, COORDINATOR)?;
            check_len(data.len(), buf.len())?;
            buf.copy_from_slice(data);
        }
        trace!("rank {}: broadcast {} elements", self.rank, buf.len());
        Ok(())
    }

    fn gather<T: Wire>(&self, send: &[T], recv: &mut [T], partition: &RowPartition) -> Result<()> {
        check_partition(self.size(), partition)?;
        check_len(partition.count(self.rank), send.len())?;
        if self.rank == COORDINATOR {
            check_len(partition.total(), recv.len())?;
        }

        let snapshot = self
            .shared
            .exchange(self.rank, Some(T::pack(send.to_vec())))?;
        if self.rank == COORDINATOR {
            for rank in 0..self.size() {
                let block = payload_of::<T>(&snapshot, rank)?;
                check_len(partition.count(rank), block.len())?;
                recv[partition.elements(rank)].copy_from_slice(block);
            }
        }
        Ok(())
    }

    fn scatter<T: Wire>(&self, send: &[T], recv: &mut [T], partition: &RowPartition) -> Result<()> {
        check_partition(self.size(), partition)?;
        check_len(partition.count(self.rank), recv.len())?;
        if self.rank == COORDINATOR {
            check_len(partition.total(), send.len())?;
        }

        let deposit = (self.rank == COORDINATOR).then(|| T::pack(send.to_vec()));
        let snapshot = self.shared.exchange(self.rank, deposit)?;
        let data = payload_of::<T>(&snapshot, COORDINATOR)?;
        check_len(partition.total(), data.len())?;
        recv.copy_from_slice(&data[partition.elements(self.rank)]);
        Ok(())
    }

    fn abort(&self) {
        self.shared.abort();
    }
}
