use core_types::{Currency, DepositId, DepositStatus};
use std::sync::Arc;

use models::deposits::{Deposit, InsertableDeposit};
use models::users::User;
use models::Store;
use uuid::Uuid;
use xerror::ledger::LedgerError;

use crate::accounts::credit;
use crate::journal;
use crate::reference::{self, RandomReference, ReferenceGenerator, DEPOSIT_PREFIX};
use crate::transfer::DEFAULT_REFERENCE_ATTEMPTS;

/// Externally funded credits. A deposit only touches a balance when it is
/// confirmed, and it can be confirmed once.
#[derive(Clone)]
pub struct DepositLedger {
    store: Store,
    logger: slog::Logger,
    references: Arc<dyn ReferenceGenerator>,
    reference_attempts: u32,
}

impl DepositLedger {
    pub fn new(store: Store, logger: slog::Logger) -> Self {
        Self {
            store,
            logger,
            references: Arc::new(RandomReference),
            reference_attempts: DEFAULT_REFERENCE_ATTEMPTS,
        }
    }

    pub fn with_references(mut self, references: Arc<dyn ReferenceGenerator>) -> Self {
        self.references = references;
        self
    }

    pub fn with_reference_attempts(mut self, attempts: u32) -> Self {
        self.reference_attempts = attempts.max(1);
        self
    }

    pub fn create_deposit(
        &self,
        user_id: &str,
        address: &str,
        currency: Currency,
        expected_amount: Option<i64>,
    ) -> Result<DepositId, LedgerError> {
        if let Some(amount) = expected_amount.filter(|amount| *amount <= 0) {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let id = Uuid::new_v4().to_string();
        self.store.write(|conn| {
            if !User::exists(conn, user_id)? {
                return Err(LedgerError::UserNotFound);
            }
            InsertableDeposit {
                id: &id,
                user_id,
                address,
                currency: currency.as_str(),
                expected_amount,
                status: DepositStatus::Pending.as_str(),
                created_at: utils::time::now(),
            }
            .insert(conn)?;
            Ok(())
        })?;

        slog::info!(self.logger, "Opened deposit"; "deposit_id" => &id, "user_id" => user_id, "currency" => currency.as_str());
        Ok(id)
    }

    /// Settles a pending deposit: marks it confirmed, credits the user and logs
    /// a `deposit` row. A deposit that is no longer pending is left untouched.
    pub fn confirm_deposit(
        &self,
        deposit_id: &str,
        actual_amount: i64,
        external_reference: &str,
    ) -> Result<Deposit, LedgerError> {
        if actual_amount <= 0 {
            return Err(LedgerError::InvalidAmount(actual_amount));
        }

        let result = reference::with_retries(&self.logger, self.reference_attempts, || {
            self.store.write(|conn| {
                let deposit = Deposit::get_by_id(conn, deposit_id)?
                    .ok_or_else(|| LedgerError::DepositNotFound(deposit_id.to_string()))?;
                if deposit.status().map_err(LedgerError::CorruptRecord)? != DepositStatus::Pending {
                    return Err(LedgerError::AlreadyConfirmed(deposit_id.to_string()));
                }
                let currency = deposit.currency().map_err(LedgerError::CorruptRecord)?;

                let now = utils::time::now();
                if Deposit::mark_confirmed(conn, deposit_id, actual_amount, external_reference, now)? == 0 {
                    return Err(LedgerError::AlreadyConfirmed(deposit_id.to_string()));
                }
                credit(conn, &deposit.user_id, currency, actual_amount, now)?;

                let reference = reference::allocate(
                    conn,
                    self.references.as_ref(),
                    DEPOSIT_PREFIX,
                    self.reference_attempts,
                )?;
                let description = format!("Deposit confirmed ({})", external_reference);
                journal::append_deposit(
                    conn,
                    &deposit.user_id,
                    actual_amount,
                    currency,
                    &description,
                    &reference,
                    now,
                )?;

                Deposit::get_by_id(conn, deposit_id)?
                    .ok_or_else(|| LedgerError::DepositNotFound(deposit_id.to_string()))
            })
        });

        match &result {
            Ok(deposit) => slog::info!(
                self.logger,
                "Deposit confirmed";
                "deposit_id" => deposit_id,
                "user_id" => &deposit.user_id,
                "amount" => actual_amount,
                "external_reference" => external_reference
            ),
            Err(LedgerError::AlreadyConfirmed(_)) => {
                slog::warn!(self.logger, "Ignoring repeated confirmation"; "deposit_id" => deposit_id)
            }
            Err(err) => slog::warn!(self.logger, "Couldn't confirm deposit: {}", err; "deposit_id" => deposit_id),
        }
        result
    }

    /// Closes a pending deposit without crediting anything.
    pub fn fail_deposit(&self, deposit_id: &str) -> Result<Deposit, LedgerError> {
        let deposit = self.store.write(|conn| {
            let deposit = Deposit::get_by_id(conn, deposit_id)?
                .ok_or_else(|| LedgerError::DepositNotFound(deposit_id.to_string()))?;
            if Deposit::mark_failed(conn, deposit_id)? == 0 {
                return Err(LedgerError::DepositNotPending {
                    id: deposit.id,
                    status: deposit.status,
                });
            }
            Deposit::get_by_id(conn, deposit_id)?.ok_or_else(|| LedgerError::DepositNotFound(deposit_id.to_string()))
        })?;

        slog::info!(self.logger, "Deposit failed"; "deposit_id" => deposit_id);
        Ok(deposit)
    }

    pub fn get_deposit(&self, deposit_id: &str) -> Result<Deposit, LedgerError> {
        self.store.read(|conn| {
            Deposit::get_by_id(conn, deposit_id)?.ok_or_else(|| LedgerError::DepositNotFound(deposit_id.to_string()))
        })
    }

    /// Newest first.
    pub fn pending_deposits(&self, user_id: &str) -> Result<Vec<Deposit>, LedgerError> {
        self.store.read(|conn| {
            if !User::exists(conn, user_id)? {
                return Err(LedgerError::UserNotFound);
            }
            Ok(Deposit::get_pending_by_user(conn, user_id)?)
        })
    }

    pub fn find_pending_by_address(&self, address: &str) -> Result<Option<Deposit>, LedgerError> {
        self.store.read(|conn| Ok(Deposit::get_pending_by_address(conn, address)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{AccountStore, NewUser};
    use crate::test_support;
    use rstest::rstest;
    use xerror::ledger::LedgerErrorKind;

    struct Fixture {
        _t: test_support::TestStore,
        accounts: AccountStore,
        deposits: DepositLedger,
        user_id: String,
    }

    fn fixture() -> Fixture {
        let t = test_support::open();
        let logger = utils::xlogging::discard();
        let accounts = AccountStore::new(t.store.clone(), logger.clone());
        let deposits = DepositLedger::new(t.store.clone(), logger);
        let user_id = accounts
            .create_user(&NewUser {
                phone: "2348000000001",
                email: "ada@example.com",
                first_name: "Ada",
                last_name: "Obi",
            })
            .unwrap();
        Fixture {
            _t: t,
            accounts,
            deposits,
            user_id,
        }
    }

    #[test]
    fn confirmation_credits_the_deposit_currency() {
        let f = fixture();
        let id = f
            .deposits
            .create_deposit(&f.user_id, "TQaddr", Currency::USDT, Some(5_000))
            .unwrap();
        assert_eq!(f.accounts.get_balance(&f.user_id).unwrap().usdt_cents, 0);

        let deposit = f.deposits.confirm_deposit(&id, 4_990, "0xabc").unwrap();
        assert_eq!(deposit.status(), Ok(DepositStatus::Confirmed));
        assert_eq!(deposit.actual_amount, Some(4_990));
        assert_eq!(deposit.external_reference.as_deref(), Some("0xabc"));

        let balance = f.accounts.get_balance(&f.user_id).unwrap();
        assert_eq!(balance.usdt_cents, 4_990);
        assert_eq!(balance.btc_sats, 0);
    }

    #[test]
    fn second_confirmation_is_rejected() {
        let f = fixture();
        let id = f
            .deposits
            .create_deposit(&f.user_id, "bc1q", Currency::BTC, None)
            .unwrap();

        f.deposits.confirm_deposit(&id, 50_000, "txid").unwrap();
        let err = f.deposits.confirm_deposit(&id, 50_000, "txid").unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::AlreadyConfirmed);
        assert_eq!(f.accounts.get_balance(&f.user_id).unwrap().btc_sats, 50_000);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    fn rejects_non_positive_amounts(#[case] amount: i64) {
        let f = fixture();
        let err = f
            .deposits
            .create_deposit(&f.user_id, "bc1q", Currency::BTC, Some(amount))
            .unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::InvalidAmount);

        let id = f
            .deposits
            .create_deposit(&f.user_id, "bc1q", Currency::BTC, None)
            .unwrap();
        let err = f.deposits.confirm_deposit(&id, amount, "txid").unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::InvalidAmount);
        assert_eq!(
            f.deposits.get_deposit(&id).unwrap().status(),
            Ok(DepositStatus::Pending)
        );
    }

    #[test]
    fn unknown_ids_are_reported() {
        let f = fixture();
        let err = f.deposits.confirm_deposit("missing", 1, "txid").unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::DepositNotFound);
        let err = f.deposits.fail_deposit("missing").unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::DepositNotFound);
        let err = f
            .deposits
            .create_deposit("ghost", "bc1q", Currency::BTC, None)
            .unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::UserNotFound);
    }

    #[test]
    fn failed_deposit_is_terminal() {
        let f = fixture();
        let id = f
            .deposits
            .create_deposit(&f.user_id, "bc1q", Currency::BTC, None)
            .unwrap();

        let failed = f.deposits.fail_deposit(&id).unwrap();
        assert_eq!(failed.status(), Ok(DepositStatus::Failed));

        let err = f.deposits.fail_deposit(&id).unwrap_err();
        assert!(matches!(err, LedgerError::DepositNotPending { ref status, .. } if status == "failed"));
        let err = f.deposits.confirm_deposit(&id, 1_000, "late").unwrap_err();
        assert_eq!(err.kind(), LedgerErrorKind::AlreadyConfirmed);
        assert_eq!(f.accounts.get_balance(&f.user_id).unwrap().btc_sats, 0);
    }

    #[test]
    fn pending_lookups() {
        let f = fixture();
        let first = f
            .deposits
            .create_deposit(&f.user_id, "bc1q", Currency::BTC, None)
            .unwrap();
        let second = f
            .deposits
            .create_deposit(&f.user_id, "TQaddr", Currency::USDT, Some(100))
            .unwrap();
        f.deposits.confirm_deposit(&first, 10, "txid").unwrap();

        let pending = f.deposits.pending_deposits(&f.user_id).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second);

        assert_eq!(
            f.deposits.find_pending_by_address("TQaddr").unwrap().map(|d| d.id),
            Some(second)
        );
        assert!(f.deposits.find_pending_by_address("bc1q").unwrap().is_none());
        assert_eq!(
            f.deposits.pending_deposits("ghost").unwrap_err().kind(),
            LedgerErrorKind::UserNotFound
        );
    }
}
