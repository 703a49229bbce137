use core_types::{Currency, Denom, Money};
use ledger::{HistoryEntry, Ledger, LedgerStats, NewUser, TransferReceipt};
use models::deposits::Deposit;
use models::users::User;
use rust_decimal::Decimal;
use serde::Serialize;
use structopt::StructOpt;
use thiserror::Error;
use xerror::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("No user registered with phone {0}.")]
    UnknownPhone(String),
    #[error("No user registered with email {0}.")]
    UnknownEmail(String),
    #[error("Amount {0} can't be expressed in minor units.")]
    Amount(Decimal),
    #[error("Deposit is in {expected}, amount was given in {given}.")]
    CurrencyMismatch { expected: Currency, given: Currency },
}

#[derive(Debug, StructOpt)]
pub enum Action {
    /// Register a user with zero balances
    CreateUser {
        #[structopt(long = "phone")]
        phone: String,
        #[structopt(long = "email")]
        email: String,
        #[structopt(long = "first-name")]
        first_name: String,
        #[structopt(long = "last-name")]
        last_name: String,
    },
    Balance {
        #[structopt(long = "phone")]
        phone: String,
    },
    /// Send funds to another user, addressed by email
    Send {
        #[structopt(long = "phone")]
        phone: String,
        #[structopt(long = "to")]
        to_email: String,
        #[structopt(short = "a", long = "amount")]
        amount: Decimal,
        #[structopt(short = "d", long = "denom", default_value = "sats")]
        denom: Denom,
        #[structopt(long = "description", default_value = "")]
        description: String,
    },
    Withdraw {
        #[structopt(long = "phone")]
        phone: String,
        #[structopt(short = "a", long = "amount")]
        amount: Decimal,
        #[structopt(short = "d", long = "denom", default_value = "sats")]
        denom: Denom,
        #[structopt(long = "description", default_value = "")]
        description: String,
    },
    /// Open a pending deposit against an address
    Deposit {
        #[structopt(long = "phone")]
        phone: String,
        #[structopt(long = "address")]
        address: String,
        #[structopt(short = "d", long = "denom", default_value = "sats")]
        denom: Denom,
        #[structopt(long = "expected")]
        expected: Option<Decimal>,
    },
    ConfirmDeposit {
        #[structopt(long = "id")]
        deposit_id: String,
        #[structopt(short = "a", long = "amount")]
        amount: Decimal,
        #[structopt(short = "d", long = "denom", default_value = "sats")]
        denom: Denom,
        #[structopt(long = "reference")]
        external_reference: String,
    },
    FailDeposit {
        #[structopt(long = "id")]
        deposit_id: String,
    },
    PendingDeposits {
        #[structopt(long = "phone")]
        phone: String,
    },
    History {
        #[structopt(long = "phone")]
        phone: String,
        #[structopt(short = "n", long = "limit")]
        limit: Option<usize>,
    },
    Stats,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    UserCreated { user_id: String },
    Balance { btc: Money, usdt: Money },
    Receipt(TransferReceipt),
    DepositOpened { deposit_id: String },
    Deposit(Deposit),
    Deposits { deposits: Vec<Deposit> },
    History { entries: Vec<HistoryEntry> },
    Stats(LedgerStats),
}

fn minor_units(amount: Decimal, denom: Denom) -> Result<i64, CliError> {
    denom.to_minor_units(amount).ok_or(CliError::Amount(amount))
}

fn user_by_phone(ledger: &Ledger, phone: &str) -> Result<User, CliError> {
    ledger
        .accounts
        .get_user_by_phone(phone)?
        .ok_or_else(|| CliError::UnknownPhone(phone.to_string()))
}

impl Action {
    pub fn execute(self, ledger: &Ledger, history_limit: usize) -> Result<Outcome, CliError> {
        match self {
            Self::CreateUser {
                phone,
                email,
                first_name,
                last_name,
            } => {
                let user_id = ledger.accounts.create_user(&NewUser {
                    phone: &phone,
                    email: &email,
                    first_name: &first_name,
                    last_name: &last_name,
                })?;
                Ok(Outcome::UserCreated { user_id })
            }
            Self::Balance { phone } => {
                let user = user_by_phone(ledger, &phone)?;
                let balance = ledger.accounts.get_balance(&user.id)?;
                Ok(Outcome::Balance {
                    btc: Money::new(Currency::BTC, balance.amount(Currency::BTC)),
                    usdt: Money::new(Currency::USDT, balance.amount(Currency::USDT)),
                })
            }
            Self::Send {
                phone,
                to_email,
                amount,
                denom,
                description,
            } => {
                let sender = user_by_phone(ledger, &phone)?;
                let recipient = ledger
                    .accounts
                    .get_user_by_email(&to_email)?
                    .ok_or(CliError::UnknownEmail(to_email))?;
                let receipt = ledger.transfers.create_transfer(
                    &sender.id,
                    &recipient.id,
                    minor_units(amount, denom)?,
                    denom.currency(),
                    &description,
                )?;
                Ok(Outcome::Receipt(receipt))
            }
            Self::Withdraw {
                phone,
                amount,
                denom,
                description,
            } => {
                let user = user_by_phone(ledger, &phone)?;
                let receipt = ledger.transfers.create_withdrawal(
                    &user.id,
                    minor_units(amount, denom)?,
                    denom.currency(),
                    &description,
                )?;
                Ok(Outcome::Receipt(receipt))
            }
            Self::Deposit {
                phone,
                address,
                denom,
                expected,
            } => {
                let user = user_by_phone(ledger, &phone)?;
                let expected = expected.map(|value| minor_units(value, denom)).transpose()?;
                let deposit_id = ledger
                    .deposits
                    .create_deposit(&user.id, &address, denom.currency(), expected)?;
                Ok(Outcome::DepositOpened { deposit_id })
            }
            Self::ConfirmDeposit {
                deposit_id,
                amount,
                denom,
                external_reference,
            } => {
                let deposit = ledger.deposits.get_deposit(&deposit_id)?;
                let expected = deposit.currency().map_err(LedgerError::CorruptRecord)?;
                if expected != denom.currency() {
                    return Err(CliError::CurrencyMismatch {
                        expected,
                        given: denom.currency(),
                    });
                }
                let deposit =
                    ledger
                        .deposits
                        .confirm_deposit(&deposit_id, minor_units(amount, denom)?, &external_reference)?;
                Ok(Outcome::Deposit(deposit))
            }
            Self::FailDeposit { deposit_id } => Ok(Outcome::Deposit(ledger.deposits.fail_deposit(&deposit_id)?)),
            Self::PendingDeposits { phone } => {
                let user = user_by_phone(ledger, &phone)?;
                let deposits = ledger.deposits.pending_deposits(&user.id)?;
                Ok(Outcome::Deposits { deposits })
            }
            Self::History { phone, limit } => {
                let user = user_by_phone(ledger, &phone)?;
                let entries = ledger.journal.get_history(&user.id, limit.unwrap_or(history_limit))?;
                Ok(Outcome::History { entries })
            }
            Self::Stats => Ok(Outcome::Stats(ledger.stats()?)),
        }
    }
}
