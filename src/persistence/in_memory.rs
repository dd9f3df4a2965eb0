use super::*;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::Arc;

/// Fake in-memory persistence.
///
/// The in-memory stores keep their own data; all a transaction has to
/// provide is mutual exclusion, so this is one global write lock.
/// Transactions serialize, which is exactly what makes the
/// check-then-write on bids atomic. Useful for unit tests and demos.
#[derive(Debug, Clone)]
pub struct InMemoryPersistence {
    lock: Arc<RwLock<()>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            lock: Arc::new(RwLock::new(())),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl Persistence for InMemoryPersistence {
    type Connection = InMemoryConnection;

    fn get_connection(&self) -> Result<Self::Connection> {
        Ok(InMemoryConnection {
            lock: self.lock.clone(),
        })
    }
}

#[derive(Debug)]
pub struct InMemoryConnection {
    lock: Arc<RwLock<()>>,
}

impl Connection for InMemoryConnection {
    type Transaction<'a> = InMemoryTransaction<'a>;

    fn start_transaction(&mut self) -> Result<Self::Transaction<'_>> {
        Ok(InMemoryTransaction {
            _lock_guard: self.lock.write(),
        })
    }
}

#[derive(Debug)]
pub struct InMemoryTransaction<'a> {
    _lock_guard: RwLockWriteGuard<'a, ()>,
}

impl<'a> Transaction for InMemoryTransaction<'a> {
    fn commit(self) -> Result<()> {
        Ok(())
    }

    // TODO: simulating rollbacks in a general way is not trivial
    // and would require the `InMemory*` stores to snapshot their
    // previous values when the transaction starts.
    fn rollback(self) -> Result<()> {
        anyhow::bail!("not supported")
    }
}
