use super::*;
use crate::persistence::postgres::{PostgresConnection, PostgresPersistence, PostgresTransaction};
use ::postgres::types::Json;

/// Event log backed by the `events` table. Offsets are row ids, so
/// they can have gaps after rolled-back writes; readers only ever
/// compare them for "past this point".
pub struct PostgresEventLog;

impl PostgresEventLog {
    pub fn new_shared() -> (
        SharedWriter<PostgresPersistence>,
        SharedReader<PostgresPersistence>,
    ) {
        let log = Arc::new(PostgresEventLog);
        (log.clone(), log)
    }
}

fn insert_events(
    client: &mut impl ::postgres::GenericClient,
    events: &[Event],
) -> Result<Offset> {
    let mut last_id: Option<i64> = None;
    for event in events {
        let row = client.query_one(
            "INSERT INTO events (details) VALUES ($1) RETURNING id",
            &[&Json(event)],
        )?;
        last_id = Some(row.get(0));
    }
    let last_id = match last_id {
        Some(id) => id,
        None => client
            .query_one("SELECT COALESCE(MAX(id), 0) FROM events", &[])?
            .get(0),
    };
    Ok(u64::try_from(last_id)?)
}

fn query_events(
    client: &mut impl ::postgres::GenericClient,
    offset: Offset,
    limit: usize,
) -> Result<WithOffset<Vec<LogEvent>>> {
    let rows = client.query(
        "SELECT id, details FROM events WHERE id > $1 ORDER BY id LIMIT $2",
        &[&i64::try_from(offset)?, &i64::try_from(limit)?],
    )?;

    let mut new_offset = offset;
    let mut data = Vec::with_capacity(rows.len());
    for row in rows {
        let id = u64::try_from(row.get::<_, i64>(0))?;
        let Json(details) = row.get::<_, Json<Event>>(1);
        new_offset = id;
        data.push(LogEvent {
            offset: id,
            details,
        });
    }

    Ok(WithOffset {
        offset: new_offset,
        data,
    })
}

impl Reader for PostgresEventLog {
    type Persistence = PostgresPersistence;

    fn get_start_offset(&self) -> Result<Offset> {
        Ok(0)
    }

    fn read(
        &self,
        conn: &mut PostgresConnection,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>> {
        let res = query_events(&mut **conn, offset, limit)?;
        if !res.data.is_empty() {
            return Ok(res);
        }

        // TODO: use LISTEN/NOTIFY instead of sleep-and-requery
        if let Some(timeout) = timeout {
            std::thread::sleep(timeout);
            return query_events(&mut **conn, offset, limit);
        }

        Ok(res)
    }
}

impl Writer for PostgresEventLog {
    type Persistence = PostgresPersistence;

    fn write(&self, conn: &mut PostgresConnection, events: &[Event]) -> Result<Offset> {
        insert_events(&mut **conn, events)
    }

    fn write_tr<'a>(
        &self,
        transaction: &mut PostgresTransaction<'a>,
        events: &[Event],
    ) -> Result<Offset> {
        insert_events(transaction, events)
    }
}
