use core_types::DbPool;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, PoolError};
use diesel::result::Error as DieselError;
use diesel::{Connection, SqliteConnection};
use serde::{Deserialize, Serialize};

use crate::error::GeneralError;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoreSettings {
    /// Path of the SQLite database file.
    pub database_path: String,
    pub pool_size: u32,
    /// How long a writer waits for the write lock before giving up.
    pub busy_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_path: String::from("ledger.db"),
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Handle to the persistent store. Cloning is cheap and every clone shares the
/// same connection pool; construct it once at startup and hand it to whoever
/// needs it.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    /// Opens (or creates) the database, switches it to WAL and applies pending
    /// migrations before any pooled connection is handed out.
    pub fn open(settings: &StoreSettings) -> Result<Self, GeneralError> {
        {
            let mut conn = SqliteConnection::establish(&settings.database_path)?;
            conn.batch_execute(&format!(
                "PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;",
                settings.busy_timeout_ms
            ))?;
            crate::init(&mut conn)?;
        }

        let manager = ConnectionManager::<SqliteConnection>::new(settings.database_path.clone());
        let pool = r2d2_pool(manager, settings)?;

        Ok(Self { pool })
    }

    /// Runs `f` as one atomic unit of work. The transaction starts with
    /// `BEGIN IMMEDIATE`, so the write lock is held from the first read and
    /// concurrent writers queue behind it. Returning `Err` rolls back.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, E>,
        E: From<DieselError> + From<PoolError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.immediate_transaction(f)
    }

    /// Runs `f` against a consistent snapshot. Under WAL readers never block
    /// the writer.
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, E>,
        E: From<DieselError> + From<PoolError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.transaction(f)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn r2d2_pool(
    manager: ConnectionManager<SqliteConnection>,
    settings: &StoreSettings,
) -> Result<DbPool, PoolError> {
    diesel::r2d2::Pool::builder()
        .max_size(settings.pool_size)
        .connection_customizer(Box::new(ConnectionPragmas {
            busy_timeout_ms: settings.busy_timeout_ms,
        }))
        .build(manager)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    pub struct TestStore {
        pub store: Store,
        _dir: TempDir,
    }

    pub fn open() -> TestStore {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = StoreSettings {
            database_path: dir.path().join("ledger.db").to_string_lossy().into_owned(),
            pool_size: 4,
            busy_timeout_ms: 5_000,
        };
        let store = Store::open(&settings).expect("store opens");
        TestStore { store, _dir: dir }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support;
    use crate::users::{InsertableUser, User};
    use diesel::prelude::*;
    use diesel::result::Error as DieselError;
    use diesel::sql_types::BigInt;

    #[derive(Debug)]
    enum TestError {
        Db(DieselError),
        Abort,
    }

    impl From<DieselError> for TestError {
        fn from(err: DieselError) -> Self {
            TestError::Db(err)
        }
    }

    impl From<diesel::r2d2::PoolError> for TestError {
        fn from(_: diesel::r2d2::PoolError) -> Self {
            TestError::Abort
        }
    }

    #[derive(QueryableByName)]
    struct Pragma {
        #[diesel(sql_type = BigInt)]
        foreign_keys: i64,
    }

    fn alice() -> InsertableUser<'static> {
        InsertableUser {
            id: "u-1",
            phone: "2348000000001",
            email: "alice@example.com",
            first_name: "Alice",
            last_name: "Doe",
            created_at: now(),
        }
    }

    fn now() -> chrono::NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }

    #[test]
    fn failed_unit_of_work_rolls_back() {
        let t = test_support::open();

        let result: Result<(), TestError> = t.store.write(|conn| {
            alice().insert(conn)?;
            Err(TestError::Abort)
        });
        assert!(matches!(result, Err(TestError::Abort)));

        let found: Option<User> = t
            .store
            .read(|conn| User::get_by_phone(conn, "2348000000001").map_err(TestError::from))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn committed_unit_of_work_is_visible() {
        let t = test_support::open();

        t.store
            .write(|conn| alice().insert(conn).map_err(TestError::from))
            .unwrap();

        let found = t
            .store
            .read(|conn| User::get_by_email(conn, "alice@example.com").map_err(TestError::from))
            .unwrap()
            .expect("user exists");
        assert_eq!(found.first_name, "Alice");
    }

    #[test]
    fn pooled_connections_enforce_foreign_keys() {
        let t = test_support::open();

        let pragma: Pragma = t
            .store
            .read(|conn| {
                diesel::sql_query("PRAGMA foreign_keys")
                    .get_result::<Pragma>(conn)
                    .map_err(TestError::from)
            })
            .unwrap();
        assert_eq!(pragma.foreign_keys, 1);
    }

    #[test]
    fn reopening_skips_applied_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let settings = super::StoreSettings {
            database_path: dir.path().join("ledger.db").to_string_lossy().into_owned(),
            pool_size: 2,
            busy_timeout_ms: 1_000,
        };
        let first = super::Store::open(&settings).unwrap();
        first
            .write(|conn| alice().insert(conn).map_err(TestError::from))
            .unwrap();
        drop(first);

        let second = super::Store::open(&settings).unwrap();
        let found = second
            .read(|conn| User::get_by_id(conn, "u-1").map_err(TestError::from))
            .unwrap();
        assert!(found.is_some());
    }
}
