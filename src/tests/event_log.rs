use crate::{
    event::Event,
    event_log::{new_in_memory_shared, LogEvent, Reader as _, WithOffset, Writer as _},
    persistence::{InMemoryPersistence, Persistence},
};
use anyhow::Result;
use std::time::Duration;

#[test]
fn event_log_sanity_check() -> Result<()> {
    let persistence = InMemoryPersistence::new();
    let (event_writer, event_reader) = new_in_memory_shared();

    let start_offset = event_reader.get_start_offset()?;

    let mut conn = persistence.get_connection()?;

    assert_eq!(
        event_reader.read(&mut conn, start_offset, 0, Some(Duration::ZERO))?,
        WithOffset {
            offset: start_offset,
            data: vec![]
        }
    );

    assert_eq!(
        event_reader.read(&mut conn, start_offset, 1, Some(Duration::ZERO))?,
        WithOffset {
            offset: start_offset,
            data: vec![]
        }
    );

    let inserted_offset = event_writer.write(&mut conn, &[Event::Test])?;

    assert_eq!(
        event_reader.read(&mut conn, inserted_offset, 1, Some(Duration::ZERO))?,
        WithOffset {
            offset: inserted_offset,
            data: vec![]
        }
    );

    assert_eq!(
        event_reader.read(&mut conn, start_offset, 1, Some(Duration::ZERO))?,
        WithOffset {
            offset: inserted_offset,
            data: vec![LogEvent {
                offset: inserted_offset,
                details: Event::Test
            }]
        }
    );

    Ok(())
}

#[test]
fn reads_resume_where_they_stopped() -> Result<()> {
    let persistence = InMemoryPersistence::new();
    let (event_writer, event_reader) = new_in_memory_shared();

    let mut conn = persistence.get_connection()?;
    event_writer.write(&mut conn, &[Event::Test, Event::Test, Event::Test])?;

    let first = event_reader.read(&mut conn, 0, 2, Some(Duration::ZERO))?;
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.offset, 2);

    let rest = event_reader.read(&mut conn, first.offset, 2, Some(Duration::ZERO))?;
    assert_eq!(rest.data.len(), 1);
    assert_eq!(rest.offset, 3);

    Ok(())
}
