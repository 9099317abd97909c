//! In-memory lease store implementation

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokenlog_lease_store::{LeaseStore, LeaseStoreError, Result};

/// In-memory lease store for testing
///
/// Writes can be made to fail on demand so lease-exhaustion paths are
/// testable without a real backend outage.
#[derive(Default)]
pub struct MemoryLeaseStore {
    lease: RwLock<Option<i64>>,
    fail_writes: AtomicBool,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-persisted lease, as after a previous run
    pub fn with_lease(pos: i64) -> Self {
        Self {
            lease: RwLock::new(Some(pos)),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent writes fail with a backend error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Last value written, for assertions
    pub fn current(&self) -> Option<i64> {
        *self.lease.read()
    }
}

impl LeaseStore for MemoryLeaseStore {
    fn read_lease(&self) -> Result<Option<i64>> {
        Ok(*self.lease.read())
    }

    fn write_lease(&self, pos: i64) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LeaseStoreError::Backend("injected write failure".into()));
        }
        *self.lease.write() = Some(pos);
        Ok(())
    }
}
