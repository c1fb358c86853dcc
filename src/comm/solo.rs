//! Group of one

use super::{Communicator, Wire, check_len, check_partition};
use crate::error::Result;
use crate::partition::RowPartition;

/// Communicator for a single worker; it is always the coordinator
#[derive(Clone, Copy, Debug, Default)]
pub struct SoloComm;

impl Communicator for SoloComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast<T: Wire>(&self, _buf: &mut [T]) -> Result<()> {
        Ok(())
    }

    fn gather<T: Wire>(&self, send: &[T], recv: &mut [T], partition: &RowPartition) -> Result<()> {
        check_partition(1, partition)?;
        check_len(partition.count(0), send.len())?;
        check_len(partition.total(), recv.len())?;
        recv[partition.elements(0)].copy_from_slice(send);
        Ok(())
    }

    fn scatter<T: Wire>(&self, send: &[T], recv: &mut [T], partition: &RowPartition) -> Result<()> {
        check_partition(1, partition)?;
        check_len(partition.total(), send.len())?;
        check_len(partition.count(0), recv.len())?;
        recv.copy_from_slice(&send[partition.elements(0)]);
        Ok(())
    }

    fn abort(&self) {}
}
