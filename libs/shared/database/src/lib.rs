pub mod migrations;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use shared_config::AppConfig;

/// Handle to the SQLite store. A single connection behind a mutex:
/// every unit of work takes the lock for its full duration, which
/// linearizes competing mutations. The schema's unique constraints
/// back the same invariants at the storage level.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open database")?;
        Self::init(conn)
    }

    /// Fresh private database, used by tests.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("failed to set database pragmas")?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a read-only unit of work against the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))?;
        f(&conn)
    }

    /// Run a mutation inside an IMMEDIATE transaction. Committed on Ok,
    /// rolled back when `f` returns Err, so a failed operation leaves
    /// the store untouched.
    pub fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin transaction")?;
        let result = f(&tx)?;
        tx.commit().context("failed to commit transaction")?;
        Ok(result)
    }
}

/// Shared application state handed to every cell router.
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medibook-test.db");
        let path = path.to_str().unwrap();

        {
            let db = Db::open(path).unwrap();
            db.with_tx(|tx| {
                tx.execute(
                    "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
                     VALUES ('u1', 'Alice', 'alice@x.com', 'h', 'patient', '2024-01-01', '2024-01-01')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }

        let reopened = Db::open(path).unwrap();
        let count: i64 = reopened
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn failed_transactions_roll_back() {
        let db = Db::open_in_memory().unwrap();

        let result: anyhow::Result<()> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
                 VALUES ('u1', 'Alice', 'alice@x.com', 'h', 'patient', '2024-01-01', '2024-01-01')",
                [],
            )?;
            Err(anyhow!("abort"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }
}
