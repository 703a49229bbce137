use diesel::r2d2::PoolError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Phone number is already registered.")]
    DuplicatePhone,
    #[error("Email is already registered.")]
    DuplicateEmail,
    #[error("User not found.")]
    UserNotFound,
    #[error("Deposit {0} not found.")]
    DepositNotFound(String),
    #[error("Insufficient balance: available {available}, requested {requested}.")]
    InsufficientBalance { available: i64, requested: i64 },
    #[error("Invalid amount {0}, amounts must be positive.")]
    InvalidAmount(i64),
    #[error("Deposit {0} has already been confirmed or closed.")]
    AlreadyConfirmed(String),
    #[error("Deposit {id} is already {status}.")]
    DepositNotPending { id: String, status: String },
    #[error("Sender and recipient are the same user.")]
    SelfTransfer,
    #[error("Transaction reference collided with an existing one.")]
    ReferenceCollision,
    #[error("Balance would overflow.")]
    BalanceOverflow,
    #[error("Store constraint violated: {0}")]
    ConstraintViolation(String),
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
    #[error("Database error: {0}")]
    Database(#[source] DieselError),
    #[error("Couldn't get a store connection: {0}")]
    Pool(#[from] PoolError),
}

/// Flat, serializable discriminant of [`LedgerError`] for callers that only
/// need to branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerErrorKind {
    DuplicatePhone,
    DuplicateEmail,
    UserNotFound,
    DepositNotFound,
    InsufficientBalance,
    InvalidAmount,
    AlreadyConfirmed,
    DepositNotPending,
    SelfTransfer,
    ReferenceCollision,
    BalanceOverflow,
    ConstraintViolation,
    CorruptRecord,
    Storage,
}

impl LedgerError {
    pub fn kind(&self) -> LedgerErrorKind {
        match self {
            LedgerError::DuplicatePhone => LedgerErrorKind::DuplicatePhone,
            LedgerError::DuplicateEmail => LedgerErrorKind::DuplicateEmail,
            LedgerError::UserNotFound => LedgerErrorKind::UserNotFound,
            LedgerError::DepositNotFound(_) => LedgerErrorKind::DepositNotFound,
            LedgerError::InsufficientBalance { .. } => LedgerErrorKind::InsufficientBalance,
            LedgerError::InvalidAmount(_) => LedgerErrorKind::InvalidAmount,
            LedgerError::AlreadyConfirmed(_) => LedgerErrorKind::AlreadyConfirmed,
            LedgerError::DepositNotPending { .. } => LedgerErrorKind::DepositNotPending,
            LedgerError::SelfTransfer => LedgerErrorKind::SelfTransfer,
            LedgerError::ReferenceCollision => LedgerErrorKind::ReferenceCollision,
            LedgerError::BalanceOverflow => LedgerErrorKind::BalanceOverflow,
            LedgerError::ConstraintViolation(_) => LedgerErrorKind::ConstraintViolation,
            LedgerError::CorruptRecord(_) => LedgerErrorKind::CorruptRecord,
            LedgerError::Database(_) | LedgerError::Pool(_) => LedgerErrorKind::Storage,
        }
    }

    /// Whether re-running the whole unit of work may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ReferenceCollision)
    }
}

/// Constraint failures map onto the domain taxonomy. SQLite names the failing
/// column in the message (`UNIQUE constraint failed: users.phone`).
impl From<DieselError> for LedgerError {
    fn from(error: DieselError) -> Self {
        if let DieselError::DatabaseError(kind, info) = &error {
            let message = info.message();
            let translated = match kind {
                DatabaseErrorKind::UniqueViolation if message.contains("users.phone") => Some(LedgerError::DuplicatePhone),
                DatabaseErrorKind::UniqueViolation if message.contains("users.email") => Some(LedgerError::DuplicateEmail),
                DatabaseErrorKind::UniqueViolation if message.contains("transactions.reference") => {
                    Some(LedgerError::ReferenceCollision)
                }
                DatabaseErrorKind::ForeignKeyViolation => Some(LedgerError::UserNotFound),
                DatabaseErrorKind::CheckViolation => Some(LedgerError::ConstraintViolation(message.to_string())),
                _ => None,
            };
            if let Some(translated) = translated {
                return translated;
            }
        }
        LedgerError::Database(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn db_error(kind: DatabaseErrorKind, message: &'static str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_string()))
    }

    #[rstest]
    #[case(
        DatabaseErrorKind::UniqueViolation,
        "UNIQUE constraint failed: users.phone",
        LedgerErrorKind::DuplicatePhone
    )]
    #[case(
        DatabaseErrorKind::UniqueViolation,
        "UNIQUE constraint failed: users.email",
        LedgerErrorKind::DuplicateEmail
    )]
    #[case(
        DatabaseErrorKind::UniqueViolation,
        "UNIQUE constraint failed: transactions.reference",
        LedgerErrorKind::ReferenceCollision
    )]
    #[case(
        DatabaseErrorKind::ForeignKeyViolation,
        "FOREIGN KEY constraint failed",
        LedgerErrorKind::UserNotFound
    )]
    #[case(
        DatabaseErrorKind::CheckViolation,
        "CHECK constraint failed: btc_sats >= 0",
        LedgerErrorKind::ConstraintViolation
    )]
    #[case(
        DatabaseErrorKind::UniqueViolation,
        "UNIQUE constraint failed: deposits.id",
        LedgerErrorKind::Storage
    )]
    fn translates_store_constraints(
        #[case] kind: DatabaseErrorKind,
        #[case] message: &'static str,
        #[case] expected: LedgerErrorKind,
    ) {
        let error: LedgerError = db_error(kind, message).into();
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn not_found_stays_a_storage_error() {
        let error: LedgerError = DieselError::NotFound.into();
        assert!(matches!(error, LedgerError::Database(DieselError::NotFound)));
    }

    #[test]
    fn only_reference_collisions_are_retryable() {
        assert!(LedgerError::ReferenceCollision.is_retryable());
        assert!(!LedgerError::SelfTransfer.is_retryable());
        assert!(!LedgerError::InsufficientBalance {
            available: 1,
            requested: 2
        }
        .is_retryable());
    }
}
