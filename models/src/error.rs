use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneralError {
    #[error("Migrations failed to run: {0}")]
    MigrationError(String),
    #[error("Couldn't open the database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("Couldn't configure the database: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("Couldn't build the connection pool: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}
