pub mod accounts;
pub mod deposits;
pub mod journal;
pub mod reference;
pub mod transfer;

pub use accounts::{AccountStore, NewUser};
pub use deposits::DepositLedger;
pub use journal::{Counterparty, Direction, HistoryEntry, TransactionLog};
pub use reference::{RandomReference, ReferenceGenerator};
pub use transfer::{TransferEngine, TransferReceipt};

use models::stats::LedgerTotals;
use models::{Store, StoreSettings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utils::xlogging::LoggingSettings;
use xerror::ledger::LedgerError;

fn default_reference_attempts() -> u32 {
    transfer::DEFAULT_REFERENCE_ATTEMPTS
}

fn default_history_limit() -> usize {
    10
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LedgerSettings {
    pub store: StoreSettings,
    /// Upper bound on reference draws, and on re-runs of a unit of work
    /// after a reference collision.
    #[serde(default = "default_reference_attempts")]
    pub reference_attempts: u32,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub logging_settings: LoggingSettings,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            reference_attempts: default_reference_attempts(),
            history_limit: default_history_limit(),
            logging_settings: LoggingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total_users: i64,
    pub total_transactions: i64,
    pub pending_deposits: i64,
    pub total_btc_sats: i64,
    pub total_usdt_cents: i64,
}

impl From<LedgerTotals> for LedgerStats {
    fn from(totals: LedgerTotals) -> Self {
        Self {
            total_users: totals.users,
            total_transactions: totals.transactions,
            pending_deposits: totals.pending_deposits,
            total_btc_sats: totals.btc_sats,
            total_usdt_cents: totals.usdt_cents,
        }
    }
}

/// Every ledger component wired to one shared store.
#[derive(Clone)]
pub struct Ledger {
    pub accounts: AccountStore,
    pub transfers: TransferEngine,
    pub deposits: DepositLedger,
    pub journal: TransactionLog,
    store: Store,
}

impl Ledger {
    pub fn new(store: Store, logger: slog::Logger) -> Self {
        Self::with_references(
            store,
            logger,
            Arc::new(RandomReference),
            transfer::DEFAULT_REFERENCE_ATTEMPTS,
        )
    }

    pub fn from_settings(store: Store, settings: &LedgerSettings, logger: slog::Logger) -> Self {
        Self::with_references(store, logger, Arc::new(RandomReference), settings.reference_attempts)
    }

    pub fn with_references(
        store: Store,
        logger: slog::Logger,
        references: Arc<dyn ReferenceGenerator>,
        reference_attempts: u32,
    ) -> Self {
        let accounts = AccountStore::new(store.clone(), logger.new(slog::o!("component" => "accounts")));
        let transfers = TransferEngine::new(store.clone(), logger.new(slog::o!("component" => "transfers")))
            .with_references(references.clone())
            .with_reference_attempts(reference_attempts);
        let deposits = DepositLedger::new(store.clone(), logger.new(slog::o!("component" => "deposits")))
            .with_references(references)
            .with_reference_attempts(reference_attempts);
        let journal = TransactionLog::new(store.clone(), logger.new(slog::o!("component" => "journal")));

        Self {
            accounts,
            transfers,
            deposits,
            journal,
            store,
        }
    }

    pub fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let totals = self.store.read(|conn| Ok::<_, LedgerError>(LedgerTotals::get(conn)?))?;
        Ok(totals.into())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use models::{Store, StoreSettings};
    use tempfile::TempDir;

    pub struct TestStore {
        pub store: Store,
        _dir: TempDir,
    }

    pub fn open() -> TestStore {
        let dir = tempfile::tempdir().unwrap();
        let settings = StoreSettings {
            database_path: dir.path().join("ledger.db").to_string_lossy().into_owned(),
            pool_size: 4,
            busy_timeout_ms: 5_000,
        };
        let store = Store::open(&settings).unwrap();
        TestStore { store, _dir: dir }
    }
}
