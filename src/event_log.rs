//! Append-only event log
//!
//! Mutations append domain events; follower services replay them at
//! their own pace, remembering their position in the progress store.
mod in_memory;
pub mod postgres;

pub use self::in_memory::*;

use crate::event::Event;
use crate::persistence::{ConnectionOf, Persistence, TransactionOf};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Position in the log. Reading from offset `n` skips the first `n`
/// events; an event's own offset is the position to read from to see
/// everything after it.
pub type Offset = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    pub offset: Offset,
    pub details: Event,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithOffset<T> {
    pub offset: Offset,
    pub data: T,
}

pub trait Reader {
    type Persistence: Persistence;

    fn get_start_offset(&self) -> Result<Offset>;

    /// Read up to `limit` events past `offset`, blocking up to
    /// `timeout` when the log has nothing new.
    fn read(
        &self,
        conn: &mut ConnectionOf<Self::Persistence>,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>>;
}

pub trait Writer {
    type Persistence: Persistence;

    fn write(&self, conn: &mut ConnectionOf<Self::Persistence>, events: &[Event])
        -> Result<Offset>;

    fn write_tr<'a>(
        &self,
        transaction: &mut TransactionOf<'a, Self::Persistence>,
        events: &[Event],
    ) -> Result<Offset>;
}

pub type SharedReader<P> = Arc<dyn Reader<Persistence = P> + Send + Sync + 'static>;
pub type SharedWriter<P> = Arc<dyn Writer<Persistence = P> + Send + Sync + 'static>;
