pub mod api;
pub mod audit;
pub mod progress;

use crate::{
    event::Event,
    event_log::{self, Reader as _, WithOffset},
    persistence::{Connection, Persistence, Transaction, TransactionOf},
};
use self::progress::ProgressTracker as _;
use anyhow::{bail, format_err, Result};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tracing::error;

pub type ServiceId = String;
pub type ServiceIdRef<'a> = &'a str;

/// A service that handles events from the log
pub trait LogFollowerService<P: Persistence>: Send {
    fn get_log_progress_id(&self) -> ServiceId;

    fn handle_event<'a>(
        &mut self,
        transaction: &mut TransactionOf<'a, P>,
        event: Event,
    ) -> Result<()>;
}

/// A service that is a loop that does something
pub trait LoopService: Send {
    fn run_iteration(&mut self) -> Result<()>;
}

/// Service execution control
///
/// All services are basically a loop, and we would like to be able to
/// gracefully terminate them, and handle a top-level error of any of
/// them by gracefully stopping everything else.
#[derive(Clone)]
pub struct ServiceControl<P: Persistence> {
    stop_all: Arc<AtomicBool>,
    persistence: P,
    progress_store: progress::SharedProgressTracker<P>,
}

impl<P: Persistence> ServiceControl<P> {
    pub fn new(persistence: P, progress_store: progress::SharedProgressTracker<P>) -> Self {
        Self {
            stop_all: Default::default(),
            persistence,
            progress_store,
        }
    }

    pub fn stop_all(&self) {
        self.stop_all.store(true, Ordering::SeqCst);
    }

    pub fn spawn_loop(&self, mut service: impl LoopService + 'static) -> JoinHandle {
        self.spawn_loop_raw(move || service.run_iteration())
    }

    pub fn spawn_log_follower(
        &self,
        mut service: impl LogFollowerService<P> + 'static,
        event_reader: event_log::SharedReader<P>,
    ) -> JoinHandle {
        self.spawn_event_loop(
            &service.get_log_progress_id(),
            event_reader,
            move |transaction, event| service.handle_event(transaction, event),
        )
    }

    /// Start a new service as a loop, with a certain body
    ///
    /// This will take care of checking the termination condition and
    /// handling any errors returned by `f`.
    fn spawn_loop_raw<F>(&self, mut f: F) -> JoinHandle
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));

        JoinHandle::new(
            stop.clone(),
            thread::spawn({
                let stop_all = self.stop_all.clone();
                move || match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    while !stop.load(Ordering::SeqCst) && !stop_all.load(Ordering::SeqCst) {
                        if let Err(e) = f() {
                            stop_all.store(true, Ordering::SeqCst);
                            return Err(e);
                        }
                    }
                    Ok(())
                })) {
                    Err(_e) => {
                        stop_all.store(true, Ordering::SeqCst);
                        bail!("service panicked");
                    }
                    Ok(res) => res,
                }
            }),
        )
    }

    fn spawn_event_loop<F>(
        &self,
        service_id: ServiceIdRef,
        event_reader: event_log::SharedReader<P>,
        mut f: F,
    ) -> JoinHandle
    where
        F: for<'a> FnMut(&mut TransactionOf<'a, P>, Event) -> Result<()> + Send + 'static,
    {
        let service_id = service_id.to_owned();

        let mut progress = {
            match (|| {
                let mut connection = self.persistence.get_connection()?;
                Ok(
                    if let Some(offset) = self.progress_store.load(&mut connection, &service_id)? {
                        offset
                    } else {
                        event_reader.get_start_offset()?
                    },
                )
            })() {
                // To avoid returning a `Result` directly from here, spawn a
                // thread that will immediately terminate with an error, just
                // like it would if the initial progress load had been done
                // from the spawned thread itself.
                Err(e) => {
                    return JoinHandle::new(
                        Arc::new(AtomicBool::new(false)),
                        thread::spawn(move || Err(e)),
                    )
                }
                Ok(offset) => offset,
            }
        };

        self.spawn_loop_raw({
            let progress_store = self.progress_store.clone();
            let persistence = self.persistence.clone();
            move || {
                let mut connection = persistence.get_connection()?;

                let WithOffset {
                    offset: new_offset,
                    data: events,
                } = event_reader.read(
                    &mut connection,
                    progress,
                    1,
                    Some(Duration::from_secs(1)),
                )?;

                if events.is_empty() {
                    return Ok(());
                }

                let mut transaction = connection.start_transaction()?;

                for event in events {
                    f(&mut transaction, event.details)?;
                    progress_store.store_tr(&mut transaction, &service_id, new_offset)?;
                }
                transaction.commit()?;

                progress = new_offset;
                Ok(())
            }
        })
    }
}

/// Simple thread join wrapper that stops and joins the thread on drop
pub struct JoinHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl JoinHandle {
    fn new(stop: Arc<AtomicBool>, handle: thread::JoinHandle<Result<()>>) -> Self {
        JoinHandle {
            stop,
            thread: Some(handle),
        }
    }

    fn join_mut(&mut self) -> Result<()> {
        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|e| format_err!("join failed: {:?}", e))?
        } else {
            Ok(())
        }
    }

    pub fn join(mut self) -> Result<()> {
        self.join_mut()
    }
}

impl Drop for JoinHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.join_mut() {
            error!("service failed: {e:#}");
        }
    }
}
