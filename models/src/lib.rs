#[macro_use]
extern crate diesel;

use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub mod balances;
pub mod deposits;
mod error;
mod schema;
pub mod stats;
pub mod store;
pub mod transactions;
pub mod users;

pub use error::GeneralError;
pub use store::{Store, StoreSettings};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Our init function must be called once at the startup of any program using this crate.
/// It brings the schema up to date; already applied migrations are skipped.
pub fn init(conn: &mut SqliteConnection) -> Result<(), GeneralError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|err| GeneralError::MigrationError(err.to_string()))
}
