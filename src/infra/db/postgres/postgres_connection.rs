use std::time::Duration;

use anyhow::Result;
use diesel::{
    PgConnection,
    connection::{CacheSize, Connection, SimpleConnection},
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};

use crate::config::config_model::Database;

/// Applied to every pooled connection: no prepared statement cache (pgbouncer in
/// transaction mode) and a server-side bound on every statement.
#[derive(Debug)]
struct SessionSettings {
    statement_timeout_ms: u64,
}

impl CustomizeConnection<PgConnection, R2d2Error> for SessionSettings {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);
        conn.batch_execute(&format!(
            "SET statement_timeout = {}",
            self.statement_timeout_ms
        ))
        .map_err(R2d2Error::QueryError)?;
        Ok(())
    }
}

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

pub fn establish_connection(database: &Database) -> Result<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(&database.url);
    let pool = Pool::builder()
        .max_size(database.max_pool_size)
        .connection_timeout(Duration::from_secs(database.connection_timeout_secs))
        .connection_customizer(Box::new(SessionSettings {
            statement_timeout_ms: database.statement_timeout_ms,
        }))
        .build(manager)?;
    Ok(pool)
}
