use crate::schema::deposits;
use chrono::NaiveDateTime;
use core_types::{Currency, DepositStatus};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::Serialize;
use std::str::FromStr;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, PartialEq)]
#[diesel(table_name = deposits)]
pub struct Deposit {
    pub id: String,
    pub user_id: String,
    /// Address the user was told to pay into
    pub address: String,
    pub currency: String,
    pub expected_amount: Option<i64>,
    /// Set on confirmation
    pub actual_amount: Option<i64>,
    pub status: String,
    /// On-chain txid or provider reference supplied on confirmation
    pub external_reference: Option<String>,
    pub created_at: NaiveDateTime,
    pub confirmed_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = deposits)]
pub struct InsertableDeposit<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub address: &'a str,
    pub currency: &'a str,
    pub expected_amount: Option<i64>,
    pub status: &'a str,
    pub created_at: NaiveDateTime,
}

impl Deposit {
    pub fn currency(&self) -> Result<Currency, String> {
        Currency::from_str(&self.currency)
    }

    pub fn status(&self) -> Result<DepositStatus, String> {
        DepositStatus::from_str(&self.status)
    }

    pub fn get_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<Self>, DieselError> {
        deposits::table
            .filter(deposits::id.eq(id))
            .select(Self::as_select())
            .first::<Self>(conn)
            .optional()
    }

    pub fn get_pending_by_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<Self>, DieselError> {
        deposits::table
            .filter(deposits::user_id.eq(user_id))
            .filter(deposits::status.eq(DepositStatus::Pending.as_str()))
            .order(deposits::created_at.desc())
            .select(Self::as_select())
            .load::<Self>(conn)
    }

    /// Newest pending deposit opened against `address`.
    pub fn get_pending_by_address(
        conn: &mut SqliteConnection,
        address: &str,
    ) -> Result<Option<Self>, DieselError> {
        deposits::table
            .filter(deposits::address.eq(address))
            .filter(deposits::status.eq(DepositStatus::Pending.as_str()))
            .order(deposits::created_at.desc())
            .select(Self::as_select())
            .first::<Self>(conn)
            .optional()
    }

    /// Moves a pending deposit to confirmed. Returns the number of rows changed,
    /// zero when somebody else already closed it.
    pub fn mark_confirmed(
        conn: &mut SqliteConnection,
        id: &str,
        amount: i64,
        external_reference: &str,
        now: NaiveDateTime,
    ) -> Result<usize, DieselError> {
        diesel::update(
            deposits::table
                .filter(deposits::id.eq(id))
                .filter(deposits::status.eq(DepositStatus::Pending.as_str())),
        )
        .set((
            deposits::status.eq(DepositStatus::Confirmed.as_str()),
            deposits::actual_amount.eq(Some(amount)),
            deposits::external_reference.eq(Some(external_reference)),
            deposits::confirmed_at.eq(Some(now)),
        ))
        .execute(conn)
    }

    pub fn mark_failed(conn: &mut SqliteConnection, id: &str) -> Result<usize, DieselError> {
        diesel::update(
            deposits::table
                .filter(deposits::id.eq(id))
                .filter(deposits::status.eq(DepositStatus::Pending.as_str())),
        )
        .set(deposits::status.eq(DepositStatus::Failed.as_str()))
        .execute(conn)
    }
}

impl<'a> InsertableDeposit<'a> {
    pub fn insert(&self, conn: &mut SqliteConnection) -> Result<usize, DieselError> {
        diesel::insert_into(deposits::table).values(self).execute(conn)
    }
}
