use diesel::SqliteConnection;
use models::transactions::Transaction;
use rand::distributions::Alphanumeric;
use rand::Rng;
use xerror::ledger::LedgerError;

pub const TRANSFER_PREFIX: &str = "tx";
pub const DEPOSIT_PREFIX: &str = "dep";

const SUFFIX_LEN: usize = 16;

/// Source of candidate transaction references. Candidates need not be
/// unique, the ledger verifies them against the log before use.
pub trait ReferenceGenerator: Send + Sync {
    fn generate(&self, prefix: &str) -> String;
}

/// `<prefix>_<unix millis>_<16 alphanumerics>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomReference;

impl ReferenceGenerator for RandomReference {
    fn generate(&self, prefix: &str) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        format!("{}_{}_{}", prefix, utils::time::time_now(), suffix)
    }
}

/// Draws candidates until one is absent from the transaction log. Must run
/// inside the write transaction that inserts the row.
pub(crate) fn allocate(
    conn: &mut SqliteConnection,
    generator: &dyn ReferenceGenerator,
    prefix: &str,
    attempts: u32,
) -> Result<String, LedgerError> {
    for _ in 0..attempts {
        let candidate = generator.generate(prefix);
        if !Transaction::reference_exists(conn, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(LedgerError::ReferenceCollision)
}

/// Re-runs a whole unit of work while it fails with a retryable error.
pub(crate) fn with_retries<T, F>(logger: &slog::Logger, attempts: u32, mut unit: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Result<T, LedgerError>,
{
    let mut attempt = 1;
    loop {
        match unit() {
            Err(err) if err.is_retryable() && attempt < attempts => {
                slog::warn!(logger, "Retrying unit of work"; "attempt" => attempt, "reason" => %err);
                attempt += 1;
            }
            result => return result,
        }
    }
}
