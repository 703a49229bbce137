use core_types::{Currency, TxId};
use serde::Serialize;
use std::sync::Arc;

use models::Store;
use xerror::ledger::LedgerError;

use crate::accounts::{credit, debit};
use crate::journal::{self, Entry};
use crate::reference::{self, RandomReference, ReferenceGenerator, TRANSFER_PREFIX};

pub const DEFAULT_REFERENCE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub transaction_id: TxId,
    pub reference: String,
}

/// Moves funds between users, or out of the ledger, as single units of work.
#[derive(Clone)]
pub struct TransferEngine {
    store: Store,
    logger: slog::Logger,
    references: Arc<dyn ReferenceGenerator>,
    reference_attempts: u32,
}

impl TransferEngine {
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

    /// Debits the sender, credits the recipient and logs a `transfer` row.
    /// Either all of it commits or none of it does.
    pub fn create_transfer(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        amount: i64,
        currency: Currency,
        description: &str,
    ) -> Result<TransferReceipt, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if from_user_id == to_user_id {
            slog::warn!(self.logger, "User tried to send to self"; "user_id" => from_user_id);
            return Err(LedgerError::SelfTransfer);
        }

        let result = reference::with_retries(&self.logger, self.reference_attempts, || {
            self.store.write(|conn| {
                let now = utils::time::now();
                debit(conn, from_user_id, currency, amount, now)?;
                credit(conn, to_user_id, currency, amount, now)?;

                let reference = reference::allocate(
                    conn,
                    self.references.as_ref(),
                    TRANSFER_PREFIX,
                    self.reference_attempts,
                )?;
                let entry = Entry {
                    from_user_id: Some(from_user_id),
                    to_user_id: Some(to_user_id),
                    amount,
                    currency,
                    description,
                };
                let transaction_id = journal::append_transfer(conn, &entry, &reference, now)?;

                Ok(TransferReceipt {
                    transaction_id,
                    reference,
                })
            })
        });

        match &result {
            Ok(receipt) => slog::info!(
                self.logger,
                "Transfer committed";
                "reference" => &receipt.reference,
                "from" => from_user_id,
                "to" => to_user_id,
                "amount" => amount,
                "currency" => currency.as_str()
            ),
            Err(err) => self.log_rejection("transfer", from_user_id, err),
        }
        result
    }

    /// Debits the user and logs a `withdrawal` row. Paying out is someone
    /// else's concern.
    pub fn create_withdrawal(
        &self,
        user_id: &str,
        amount: i64,
        currency: Currency,
        description: &str,
    ) -> Result<TransferReceipt, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let result = reference::with_retries(&self.logger, self.reference_attempts, || {
            self.store.write(|conn| {
                let now = utils::time::now();
                debit(conn, user_id, currency, amount, now)?;

                let reference = reference::allocate(
                    conn,
                    self.references.as_ref(),
                    TRANSFER_PREFIX,
                    self.reference_attempts,
                )?;
                let transaction_id =
                    journal::append_withdrawal(conn, user_id, amount, currency, description, &reference, now)?;

                Ok(TransferReceipt {
                    transaction_id,
                    reference,
                })
            })
        });

        match &result {
            Ok(receipt) => slog::info!(
                self.logger,
                "Withdrawal committed";
                "reference" => &receipt.reference,
                "user_id" => user_id,
                "amount" => amount,
                "currency" => currency.as_str()
            ),
            Err(err) => self.log_rejection("withdrawal", user_id, err),
        }
        result
    }

    fn log_rejection(&self, operation: &str, user_id: &str, err: &LedgerError) {
        match err {
            LedgerError::Database(_) | LedgerError::Pool(_) | LedgerError::CorruptRecord(_) => {
                slog::error!(self.logger, "{} failed: {}", operation, err; "user_id" => user_id)
            }
            _ => slog::warn!(self.logger, "{} rejected: {}", operation, err; "user_id" => user_id),
        }
    }
}
