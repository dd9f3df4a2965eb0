use crate::{
    event::Event,
    event_log::{new_in_memory_shared, Writer as _},
    persistence::{InMemoryPersistence, InMemoryTransaction, Persistence},
    service::{
        progress::{InMemoryProgressTracker, ProgressTracker as _},
        LogFollowerService, ServiceControl, ServiceId,
    },
};
use anyhow::Result;
use parking_lot::Mutex;
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

struct Recording {
    seen: Arc<Mutex<Vec<Event>>>,
}

impl LogFollowerService<InMemoryPersistence> for Recording {
    fn get_log_progress_id(&self) -> ServiceId {
        "recording".to_owned()
    }

    fn handle_event<'a>(
        &mut self,
        _transaction: &mut InMemoryTransaction<'a>,
        event: Event,
    ) -> Result<()> {
        self.seen.lock().push(event);
        Ok(())
    }
}

#[test]
fn follower_replays_events_and_tracks_progress() -> Result<()> {
    let persistence = InMemoryPersistence::new();
    let (event_writer, event_reader) = new_in_memory_shared();
    let progress_store = InMemoryProgressTracker::new_shared();
    let svc_ctl = ServiceControl::new(persistence.clone(), progress_store.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let handle = svc_ctl.spawn_log_follower(Recording { seen: seen.clone() }, event_reader);

    let mut conn = persistence.get_connection()?;
    event_writer.write(&mut conn, &[Event::Test, Event::Test])?;
    drop(conn);

    let deadline = Instant::now() + Duration::from_secs(5);
    while seen.lock().len() < 2 {
        assert!(Instant::now() < deadline, "follower never caught up");
        thread::sleep(Duration::from_millis(20));
    }

    svc_ctl.stop_all();
    handle.join()?;

    let mut conn = persistence.get_connection()?;
    assert_eq!(progress_store.load(&mut conn, "recording")?, Some(2));

    Ok(())
}
