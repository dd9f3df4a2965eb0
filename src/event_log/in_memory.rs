use super::*;
use crate::persistence::{InMemoryConnection, InMemoryPersistence, InMemoryTransaction};
use anyhow::format_err;
use parking_lot::{Condvar, Mutex};

pub struct InMemoryLog {
    inner: Mutex<Vec<Event>>,
    condvar: Condvar,
}

impl InMemoryLog {
    fn write_events(&self, events: &[Event]) -> Result<Offset> {
        let mut inner = self.inner.lock();

        inner.extend_from_slice(events);
        self.condvar.notify_all();

        Ok(u64::try_from(inner.len())?)
    }
}

impl Reader for InMemoryLog {
    type Persistence = InMemoryPersistence;

    fn get_start_offset(&self) -> Result<Offset> {
        Ok(0)
    }

    fn read(
        &self,
        _conn: &mut InMemoryConnection,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>> {
        let offset_usize = usize::try_from(offset)?;

        let mut inner = self.inner.lock();

        if inner.len() <= offset_usize {
            match timeout {
                Some(timeout) => {
                    let _ = self.condvar.wait_for(&mut inner, timeout);
                }
                None => self.condvar.wait(&mut inner),
            }
        }

        let data: Vec<_> = inner
            .get(offset_usize..)
            .ok_or_else(|| format_err!("offset out of bounds: {offset}"))?
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, details)| LogEvent {
                offset: offset + u64::try_from(i + 1).expect("no fail"),
                details: details.clone(),
            })
            .collect();

        Ok(WithOffset {
            offset: offset + u64::try_from(data.len()).expect("no fail"),
            data,
        })
    }
}

impl Writer for InMemoryLog {
    type Persistence = InMemoryPersistence;

    fn write(&self, _conn: &mut InMemoryConnection, events: &[Event]) -> Result<Offset> {
        self.write_events(events)
    }

    fn write_tr<'a>(
        &self,
        _transaction: &mut InMemoryTransaction<'a>,
        events: &[Event],
    ) -> Result<Offset> {
        self.write_events(events)
    }
}

pub fn new_in_memory_shared() -> (
    SharedWriter<InMemoryPersistence>,
    SharedReader<InMemoryPersistence>,
) {
    let log = Arc::new(InMemoryLog {
        inner: Mutex::new(Vec::new()),
        condvar: Condvar::default(),
    });
    (log.clone(), log)
}
