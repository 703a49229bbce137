use chrono::NaiveDateTime;
use core_types::{Currency, Money, TxId, TxType};
use diesel::SqliteConnection;
use models::transactions::{HistoryRow, InsertableTransaction};
use models::users::User;
use models::Store;
use serde::Serialize;
use std::str::FromStr;
use xerror::ledger::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counterparty {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Counterparty {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One line of a user's history, seen from that user's side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: TxId,
    pub reference: String,
    pub tx_type: TxType,
    pub amount: Money,
    pub direction: Direction,
    /// `None` for deposits and withdrawals
    pub counterparty: Option<Counterparty>,
    pub description: String,
    pub created_at: NaiveDateTime,
}

/// Read side of the transaction log. Rows are appended only through the
/// crate-internal `append_*` functions, from inside the unit of work that
/// moves the matching balance.
#[derive(Clone)]
pub struct TransactionLog {
    store: Store,
    logger: slog::Logger,
}

impl TransactionLog {
    pub fn new(store: Store, logger: slog::Logger) -> Self {
        Self { store, logger }
    }

    /// Most recent first, at most `limit` entries.
    pub fn get_history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, LedgerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = self.store.read(|conn| {
            if !User::exists(conn, user_id)? {
                return Err(LedgerError::UserNotFound);
            }
            if limit == 0 {
                return Ok(Vec::new());
            }
            Ok(HistoryRow::for_user(conn, user_id, limit)?)
        })?;

        slog::debug!(self.logger, "Loaded history"; "user_id" => user_id, "entries" => rows.len());
        rows.into_iter().map(|row| to_entry(user_id, row)).collect()
    }
}

fn to_entry(user_id: &str, row: HistoryRow) -> Result<HistoryEntry, LedgerError> {
    let currency = Currency::from_str(&row.currency).map_err(LedgerError::CorruptRecord)?;
    let tx_type = TxType::from_str(&row.tx_type).map_err(LedgerError::CorruptRecord)?;

    let incoming = row.to_user_id.as_deref() == Some(user_id);
    let (direction, counterparty) = if incoming {
        let sender = match (row.from_user_id, row.sender_first_name, row.sender_last_name, row.sender_email) {
            (Some(id), Some(first_name), Some(last_name), Some(email)) => Some(Counterparty {
                user_id: id,
                first_name,
                last_name,
                email,
            }),
            _ => None,
        };
        (Direction::Incoming, sender)
    } else {
        let receiver = match (
            row.to_user_id,
            row.receiver_first_name,
            row.receiver_last_name,
            row.receiver_email,
        ) {
            (Some(id), Some(first_name), Some(last_name), Some(email)) => Some(Counterparty {
                user_id: id,
                first_name,
                last_name,
                email,
            }),
            _ => None,
        };
        (Direction::Outgoing, receiver)
    };

    Ok(HistoryEntry {
        id: row.id,
        reference: row.reference,
        tx_type,
        amount: Money::new(currency, row.amount),
        direction,
        counterparty,
        description: row.description,
        created_at: row.created_at,
    })
}

/// What a log row records, minus the reference and timestamp.
pub(crate) struct Entry<'a> {
    pub from_user_id: Option<&'a str>,
    pub to_user_id: Option<&'a str>,
    pub amount: i64,
    pub currency: Currency,
    pub description: &'a str,
}

fn append(
    conn: &mut SqliteConnection,
    tx_type: TxType,
    entry: &Entry,
    reference: &str,
    now: NaiveDateTime,
) -> Result<TxId, LedgerError> {
    let id = InsertableTransaction {
        from_user_id: entry.from_user_id,
        to_user_id: entry.to_user_id,
        amount: entry.amount,
        currency: entry.currency.as_str(),
        tx_type: tx_type.as_str(),
        reference,
        description: entry.description,
        created_at: now,
    }
    .insert(conn)?;
    Ok(id)
}

pub(crate) fn append_transfer(
    conn: &mut SqliteConnection,
    entry: &Entry,
    reference: &str,
    now: NaiveDateTime,
) -> Result<TxId, LedgerError> {
    append(conn, TxType::Transfer, entry, reference, now)
}

pub(crate) fn append_deposit(
    conn: &mut SqliteConnection,
    to_user_id: &str,
    amount: i64,
    currency: Currency,
    description: &str,
    reference: &str,
    now: NaiveDateTime,
) -> Result<TxId, LedgerError> {
    let entry = Entry {
        from_user_id: None,
        to_user_id: Some(to_user_id),
        amount,
        currency,
        description,
    };
    append(conn, TxType::Deposit, &entry, reference, now)
}

pub(crate) fn append_withdrawal(
    conn: &mut SqliteConnection,
    from_user_id: &str,
    amount: i64,
    currency: Currency,
    description: &str,
    reference: &str,
    now: NaiveDateTime,
) -> Result<TxId, LedgerError> {
    let entry = Entry {
        from_user_id: Some(from_user_id),
        to_user_id: None,
        amount,
        currency,
        description,
    };
    append(conn, TxType::Withdrawal, &entry, reference, now)
}
