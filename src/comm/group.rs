//! Launching an in-process worker group

use super::{Communicator, ThreadComm, thread_group};
use crate::config::MAX_WORKERS;
use crate::error::{Error, Result};
use log::{debug, error};
use std::thread;

/// Aborts the group if the owning worker unwinds
struct AbortOnUnwind<'a>(&'a ThreadComm);

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

fn guarded<T>(comm: &ThreadComm, body: impl FnOnce(&ThreadComm) -> Result<T>) -> Result<T> {
    let _guard = AbortOnUnwind(comm);
    let result = body(comm);
    if let Err(e) = &result {
        if e.is_secondary() {
            debug!("rank {} stopping: {e}", comm.rank());
        } else {
            error!("rank {} failed: {e}", comm.rank());
        }
        comm.abort();
    }
    result
}

/// Run a group of `workers` workers to completion
///
/// The coordinator body runs on the calling thread, so it may borrow
/// non-`Send` state; ranks `1..workers` each run `worker` on a scoped thread.
/// Any worker failing or panicking aborts the group, and the first primary
/// error (one that is not a consequence of another worker's failure) is
/// returned.
pub fn run_group<T, C, W>(workers: usize, coordinator: C, worker: W) -> Result<T>
where
    C: FnOnce(&ThreadComm) -> Result<T>,
    W: Fn(&ThreadComm) -> Result<()> + Sync,
{
    if workers == 0 || workers > MAX_WORKERS {
        return Err(Error::invalid_config(
            "workers",
            format!("{workers} is outside 1..={MAX_WORKERS}"),
        ));
    }

    let mut comms = thread_group(workers)?.into_iter();
    let root = comms
        .next()
        .ok_or_else(|| Error::Internal("empty worker group".to_string()))?;

    thread::scope(|s| {
        let worker = &worker;
        let mut handles = Vec::with_capacity(workers - 1);
        let mut spawn_error = None;

        for comm in comms {
            let rank = comm.rank();
            let spawned = thread::Builder::new()
                .name(format!("eigqr-worker-{rank}"))
                .spawn_scoped(s, move || guarded(&comm, worker));
            match spawned {
                Ok(handle) => handles.push((rank, handle)),
                Err(e) => {
                    spawn_error = Some(Error::Internal(format!(
                        "failed to spawn worker {rank}: {e}"
                    )));
                    break;
                }
            }
        }

        let root_result = match spawn_error {
            Some(e) => {
                root.abort();
                Err(e)
            }
            None => guarded(&root, coordinator),
        };

        let mut worker_error = None;
        for (rank, handle) in handles {
            let outcome = handle
                .join()
                .unwrap_or_else(|_| Err(Error::Internal(format!("worker {rank} panicked"))));
            if let Err(e) = outcome {
                if worker_error.is_none() && !e.is_secondary() {
                    worker_error = Some(e);
                }
            }
        }

        match (root_result, worker_error) {
            (Err(e), Some(primary)) if e.is_secondary() => Err(primary),
            (Err(e), _) => Err(e),
            (Ok(_), Some(primary)) => Err(primary),
            (Ok(value), None) => Ok(value),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_rejects_bad_size() {
        let run = |n| run_group(n, |_| Ok(()), |_| Ok(()));
        assert!(matches!(run(0), Err(Error::InvalidConfig { .. })));
        assert!(matches!(run(MAX_WORKERS + 1), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_group_returns_coordinator_value() {
        let value = run_group(
            3,
            |comm| {
                let mut buf = [42u64];
                comm.broadcast(&mut buf)?;
                Ok(comm.size())
            },
            |comm| {
                let mut buf = [0u64];
                comm.broadcast(&mut buf)?;
                assert_eq!(buf, [42]);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn test_worker_failure_surfaces_as_primary_error() {
        let result: Result<()> = run_group(
            2,
            |comm| {
                let mut buf = [0.0f32; 2];
                comm.broadcast(&mut buf)
            },
            |_| Err(Error::Internal("boom".to_string())),
        );
        assert!(matches!(result, Err(Error::Internal(msg)) if msg == "boom"));
    }

    #[test]
    fn test_worker_panic_aborts_group() {
        let result: Result<()> = run_group(
            2,
            |comm| {
                let mut buf = [0.0f32; 1];
                comm.broadcast(&mut buf)
            },
            |_| panic!("worker died"),
        );
        assert!(matches!(result, Err(Error::Internal(msg)) if msg.contains("panicked")));
    }
}
