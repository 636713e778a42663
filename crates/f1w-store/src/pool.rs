//! Connection management (§4.1, §5 "single-writer discipline"): an r2d2
//! pool for concurrent reads, plus one dedicated writer connection behind a
//! `tokio::sync::Mutex` so Diesel/SQLite never sees two writers at once.
//! Migrations are embedded and applied once at [`Store::connect`].

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use f1w_core::error::WatcherError;
use tokio::sync::Mutex;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type PooledSqlite = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Entry point every repository borrows from. Cloning is cheap: the pool and
/// writer mutex are both reference-counted internally.
#[derive(Clone)]
pub struct Store {
    pub(crate) read_pool: SqlitePool,
    pub(crate) writer: std::sync::Arc<Mutex<SqliteConnection>>,
}

impl Store {
    /// Opens (creating if absent) the SQLite database at `database_path` and
    /// runs pending migrations. Foreign keys are enabled on every connection
    /// since SQLite defaults them off.
    pub fn connect(database_path: &str) -> Result<Self, WatcherError> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_path);
        let read_pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| WatcherError::Database {
                message: format!("failed to build read pool: {e}"),
            })?;

        let mut writer_conn = SqliteConnection::establish(database_path).map_err(|e| {
            WatcherError::Database {
                message: format!("failed to open writer connection: {e}"),
            }
        })?;

        enable_foreign_keys(&mut writer_conn)?;
        writer_conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| WatcherError::Database {
                message: format!("migration failed: {e}"),
            })?;

        Ok(Self {
            read_pool,
            writer: std::sync::Arc::new(Mutex::new(writer_conn)),
        })
    }

    /// A pooled connection for reads. Multiple callers may hold one
    /// concurrently.
    pub fn read(&self) -> Result<PooledSqlite, WatcherError> {
        self.read_pool.get().map_err(|e| WatcherError::Database {
            message: format!("failed to acquire read connection: {e}"),
        })
    }

    /// Exclusive access to the single writer connection. Callers must keep
    /// the critical section short — every mutating query in the crate goes
    /// through this lock.
    pub async fn writer(&self) -> tokio::sync::MutexGuard<'_, SqliteConnection> {
        self.writer.lock().await
    }
}

fn enable_foreign_keys(conn: &mut SqliteConnection) -> Result<(), WatcherError> {
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(conn)
        .map_err(|e| WatcherError::Database {
            message: format!("failed to enable foreign keys: {e}"),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (Store, tempfile::TempPath) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.into_temp_path();
        let store = Store::connect(path.to_str().unwrap()).unwrap();
        (store, path)
    }

    #[test]
    fn connect_runs_migrations_idempotently() {
        let (store, _path) = temp_store();
        assert!(store.read().is_ok());
    }
}
