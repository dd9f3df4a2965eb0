use super::{ServiceId, ServiceIdRef};
use crate::event_log::Offset;
use crate::persistence::postgres::{PostgresConnection, PostgresPersistence, PostgresTransaction};
use crate::persistence::{
    ConnectionOf, InMemoryConnection, InMemoryPersistence, InMemoryTransaction, Persistence,
    TransactionOf,
};
use anyhow::Result;
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};

/// A persistent store keeping track of the last event each follower
/// service has processed
pub trait ProgressTracker {
    type Persistence: Persistence;

    fn load(
        &self,
        conn: &mut ConnectionOf<Self::Persistence>,
        id: ServiceIdRef,
    ) -> Result<Option<Offset>>;

    fn store_tr<'a>(
        &self,
        transaction: &mut TransactionOf<'a, Self::Persistence>,
        id: ServiceIdRef,
        offset: Offset,
    ) -> Result<()>;
}

pub type SharedProgressTracker<P> =
    Arc<dyn ProgressTracker<Persistence = P> + Send + Sync + 'static>;

pub struct InMemoryProgressTracker {
    store: Mutex<BTreeMap<ServiceId, Offset>>,
}

impl InMemoryProgressTracker {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn new_shared() -> SharedProgressTracker<InMemoryPersistence> {
        Arc::new(Self::new())
    }
}

impl Default for InMemoryProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker for InMemoryProgressTracker {
    type Persistence = InMemoryPersistence;

    fn load(&self, _conn: &mut InMemoryConnection, id: ServiceIdRef) -> Result<Option<Offset>> {
        Ok(self.store.lock().get(id).copied())
    }

    fn store_tr<'a>(
        &self,
        _transaction: &mut InMemoryTransaction<'a>,
        id: ServiceIdRef,
        offset: Offset,
    ) -> Result<()> {
        self.store.lock().insert(id.to_owned(), offset);
        Ok(())
    }
}

pub struct PostgresProgressTracker;

impl PostgresProgressTracker {
    pub fn new_shared() -> SharedProgressTracker<PostgresPersistence> {
        Arc::new(Self)
    }
}

impl ProgressTracker for PostgresProgressTracker {
    type Persistence = PostgresPersistence;

    fn load(&self, conn: &mut PostgresConnection, id: ServiceIdRef) -> Result<Option<Offset>> {
        let row = conn.query_opt(
            "SELECT last_offset FROM service_progress WHERE service_id = $1",
            &[&id],
        )?;
        row.map(|row| Ok(u64::try_from(row.get::<_, i64>(0))?))
            .transpose()
    }

    fn store_tr<'a>(
        &self,
        transaction: &mut PostgresTransaction<'a>,
        id: ServiceIdRef,
        offset: Offset,
    ) -> Result<()> {
        transaction.execute(
            "INSERT INTO service_progress (service_id, last_offset) VALUES ($1, $2) \
             ON CONFLICT (service_id) DO UPDATE SET last_offset = EXCLUDED.last_offset",
            &[&id, &i64::try_from(offset)?],
        )?;
        Ok(())
    }
}
