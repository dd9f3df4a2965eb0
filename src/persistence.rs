//! Database persistence traits
//!
//! Expressing atomic transactions spanning multiple stores in a
//! hexagonal architecture is the tricky part of this design. The
//! `Persistence` family keeps store traits generic over the concrete
//! backend, so the same service code runs against the in-memory fake
//! and Postgres.
//!
//! Some discussion:
//!
//! * https://www.reddit.com/r/rust/comments/p9amqt/hexagonal_architecture_in_rust_1/h9ypjoo
//! * https://www.reddit.com/r/golang/comments/i1vy4s/ddd_vs_db_transactions_how_to_reconcile/
mod in_memory;
pub mod postgres;

pub use self::in_memory::*;

use anyhow::Result;

/// An instance of a persistence (store) that can hold data
///
/// Must be cloneable and thread-safe.
pub trait Persistence: Send + Sync + Clone + 'static {
    type Connection: Connection;

    /// Get a connection to a store
    fn get_connection(&self) -> Result<Self::Connection>;
}

/// A connection to a database/persistence
pub trait Connection {
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    fn start_transaction(&mut self) -> Result<Self::Transaction<'_>>;
}

/// A database transaction
pub trait Transaction {
    fn commit(self) -> Result<()>;
    fn rollback(self) -> Result<()>;
}

pub type ConnectionOf<P> = <P as Persistence>::Connection;
pub type TransactionOf<'a, P> = <<P as Persistence>::Connection as Connection>::Transaction<'a>;
