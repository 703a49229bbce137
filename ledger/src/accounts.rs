use chrono::NaiveDateTime;
use core_types::{Currency, Money, UserId};
use diesel::SqliteConnection;
use models::balances::Balance;
use models::users::{InsertableUser, User};
use models::Store;
use uuid::Uuid;
use xerror::ledger::LedgerError;

/// Registration details for a new user. Format validation of phone and
/// email is the caller's job.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub phone: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// User identity and the balance row that comes with it.
#[derive(Clone)]
pub struct AccountStore {
    store: Store,
    logger: slog::Logger,
}

impl AccountStore {
    pub fn new(store: Store, logger: slog::Logger) -> Self {
        Self { store, logger }
    }

    /// Registers a user together with a zeroed balance in one unit of work.
    pub fn create_user(&self, new_user: &NewUser) -> Result<UserId, LedgerError> {
        let id = Uuid::new_v4().to_string();

        let result = self.store.write(|conn| {
            if User::get_by_phone(conn, new_user.phone)?.is_some() {
                return Err(LedgerError::DuplicatePhone);
            }
            if User::get_by_email(conn, new_user.email)?.is_some() {
                return Err(LedgerError::DuplicateEmail);
            }

            let now = utils::time::now();
            InsertableUser {
                id: &id,
                phone: new_user.phone,
                email: new_user.email,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                created_at: now,
            }
            .insert(conn)?;
            Balance::insert_zero(conn, &id, now)?;
            Ok(())
        });

        match result {
            Ok(()) => {
                slog::info!(self.logger, "Created user"; "user_id" => &id);
                Ok(id)
            }
            Err(err) => {
                slog::warn!(self.logger, "Couldn't create user: {}", err);
                Err(err)
            }
        }
    }

    pub fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, LedgerError> {
        self.store.read(|conn| Ok(User::get_by_id(conn, user_id)?))
    }

    pub fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, LedgerError> {
        self.store.read(|conn| Ok(User::get_by_phone(conn, phone)?))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError> {
        self.store.read(|conn| Ok(User::get_by_email(conn, email)?))
    }

    pub fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, LedgerError> {
        self.store.read(|conn| Ok(User::list(conn, limit, offset)?))
    }

    pub fn get_balance(&self, user_id: &str) -> Result<Balance, LedgerError> {
        self.store
            .read(|conn| Balance::get_by_user(conn, user_id)?.ok_or(LedgerError::UserNotFound))
    }

    pub fn get_money(&self, user_id: &str, currency: Currency) -> Result<Money, LedgerError> {
        let balance = self.get_balance(user_id)?;
        Ok(Money::new(currency, balance.amount(currency)))
    }
}

/// Removes `amount` from a user's balance. Runs inside the caller's write
/// transaction; nothing is written when the balance is short.
pub(crate) fn debit(
    conn: &mut SqliteConnection,
    user_id: &str,
    currency: Currency,
    amount: i64,
    now: NaiveDateTime,
) -> Result<i64, LedgerError> {
    let balance = Balance::get_by_user(conn, user_id)?.ok_or(LedgerError::UserNotFound)?;
    let available = balance.amount(currency);
    if amount > available {
        return Err(LedgerError::InsufficientBalance {
            available,
            requested: amount,
        });
    }

    let updated = available - amount;
    Balance::set_amount(conn, user_id, currency, updated, now)?;
    Ok(updated)
}

pub(crate) fn credit(
    conn: &mut SqliteConnection,
    user_id: &str,
    currency: Currency,
    amount: i64,
    now: NaiveDateTime,
) -> Result<i64, LedgerError> {
    let balance = Balance::get_by_user(conn, user_id)?.ok_or(LedgerError::UserNotFound)?;
    let updated = balance
        .amount(currency)
        .checked_add(amount)
        .ok_or(LedgerError::BalanceOverflow)?;

    Balance::set_amount(conn, user_id, currency, updated, now)?;
    Ok(updated)
}
