//! Fjall-backed lease store
//!
//! Persists the lease start in a Fjall keyspace: one partition, one key,
//! a big-endian i64 value. Every write is followed by a synchronous
//! persist; `write_lease` returning means the value survives a crash.

use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tokenlog_lease_store::{LeaseStore, LeaseStoreError, Result};

const PARTITION_SEQUENCER: &str = "sequencer";
const KEY_CURRENT: &[u8] = b"CURRENT";

/// Durable lease store over a Fjall keyspace
pub struct FjallLeaseStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallLeaseStore {
    /// Open (or create) a lease store under the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .map_err(|e| LeaseStoreError::Backend(format!("create {}: {}", path.display(), e)))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .map_err(backend_error)?;

        let partition = keyspace
            .open_partition(
                PARTITION_SEQUENCER,
                PartitionCreateOptions::default().compression(fjall::CompressionType::None),
            )
            .map_err(backend_error)?;

        Ok(Self {
            keyspace,
            partition,
        })
    }
}

impl LeaseStore for FjallLeaseStore {
    fn read_lease(&self) -> Result<Option<i64>> {
        let slice = match self.partition.get(KEY_CURRENT).map_err(backend_error)? {
            Some(slice) => slice,
            None => return Ok(None),
        };

        let bytes: [u8; 8] = slice.as_ref().try_into().map_err(|_| {
            LeaseStoreError::Corrupt(format!("expected 8 bytes, found {}", slice.len()))
        })?;
        Ok(Some(i64::from_be_bytes(bytes)))
    }

    fn write_lease(&self, pos: i64) -> Result<()> {
        self.partition
            .insert(KEY_CURRENT, pos.to_be_bytes())
            .map_err(backend_error)?;
        // Durability contract: do not return before the value is synced.
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(backend_error)?;
        Ok(())
    }
}

fn backend_error(e: fjall::Error) -> LeaseStoreError {
    LeaseStoreError::Backend(e.to_string())
}
