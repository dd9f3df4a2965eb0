use super::*;
use r2d2_postgres::PostgresConnectionManager;

pub type PostgresConnection =
    r2d2::PooledConnection<PostgresConnectionManager<::postgres::NoTls>>;
pub type PostgresTransaction<'a> = ::postgres::Transaction<'a>;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: r2d2::Pool<PostgresConnectionManager<::postgres::NoTls>>,
}

impl PostgresPersistence {
    pub fn connect(database_url: &str) -> Result<Self> {
        let manager = PostgresConnectionManager::new(database_url.parse()?, ::postgres::NoTls);
        Ok(Self {
            pool: r2d2::Pool::new(manager)?,
        })
    }

    /// Create the tables this service needs, if they aren't there yet.
    pub fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_connection()?;
        conn.batch_execute(
            "CREATE TABLE IF NOT EXISTS users (
                 clerk_user_id TEXT PRIMARY KEY,
                 phone_number TEXT NOT NULL,
                 first_name TEXT NOT NULL,
                 last_name TEXT NOT NULL,
                 role TEXT NOT NULL,
                 pincode TEXT NOT NULL,
                 state TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS requirements (
                 id BIGSERIAL PRIMARY KEY,
                 clerk_user_id TEXT NOT NULL,
                 item TEXT NOT NULL,
                 quantity BIGINT NOT NULL,
                 unit TEXT NOT NULL,
                 price BIGINT NOT NULL,
                 pincode TEXT NOT NULL,
                 state TEXT NOT NULL,
                 status TEXT NOT NULL DEFAULT 'open'
             );
             CREATE TABLE IF NOT EXISTS bids (
                 id BIGSERIAL PRIMARY KEY,
                 item TEXT NOT NULL,
                 state TEXT NOT NULL,
                 supplier_id TEXT NOT NULL,
                 supplier_name TEXT NOT NULL,
                 price BIGINT NOT NULL,
                 UNIQUE (item, state, supplier_id)
             );
             CREATE TABLE IF NOT EXISTS events (
                 id BIGSERIAL PRIMARY KEY,
                 details JSONB NOT NULL
             );
             CREATE TABLE IF NOT EXISTS service_progress (
                 service_id TEXT PRIMARY KEY,
                 last_offset BIGINT NOT NULL
             );",
        )?;
        Ok(())
    }
}

impl Persistence for PostgresPersistence {
    type Connection = PostgresConnection;

    fn get_connection(&self) -> Result<Self::Connection> {
        Ok(self.pool.get()?)
    }
}

impl Connection for PostgresConnection {
    type Transaction<'a> = PostgresTransaction<'a>;

    fn start_transaction(&mut self) -> Result<Self::Transaction<'_>> {
        Ok(self.transaction()?)
    }
}

impl<'a> Transaction for PostgresTransaction<'a> {
    fn commit(self) -> Result<()> {
        Ok(::postgres::Transaction::commit(self)?)
    }

    fn rollback(self) -> Result<()> {
        Ok(::postgres::Transaction::rollback(self)?)
    }
}
