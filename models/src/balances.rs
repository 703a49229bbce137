use crate::schema::balances;
use chrono::NaiveDateTime;
use core_types::Currency;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::Serialize;

/// One row per user holding every currency balance in minor units.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, PartialEq)]
#[diesel(table_name = balances, primary_key(user_id))]
pub struct Balance {
    pub user_id: String,
    pub btc_sats: i64,
    pub usdt_cents: i64,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = balances)]
pub struct InsertableBalance<'a> {
    pub user_id: &'a str,
    pub btc_sats: i64,
    pub usdt_cents: i64,
    pub updated_at: NaiveDateTime,
}

impl Balance {
    pub fn amount(&self, currency: Currency) -> i64 {
        match currency {
            Currency::BTC => self.btc_sats,
            Currency::USDT => self.usdt_cents,
        }
    }

    pub fn get_by_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<Self>, DieselError> {
        balances::table
            .filter(balances::user_id.eq(user_id))
            .select(Self::as_select())
            .first::<Self>(conn)
            .optional()
    }

    pub fn insert_zero(conn: &mut SqliteConnection, user_id: &str, now: NaiveDateTime) -> Result<usize, DieselError> {
        diesel::insert_into(balances::table)
            .values(InsertableBalance {
                user_id,
                btc_sats: 0,
                usdt_cents: 0,
                updated_at: now,
            })
            .execute(conn)
    }

    /// Overwrites a single currency column. Callers compute the new value
    /// inside the same write transaction they read the old one in.
    pub fn set_amount(
        conn: &mut SqliteConnection,
        user_id: &str,
        currency: Currency,
        amount: i64,
        now: NaiveDateTime,
    ) -> Result<usize, DieselError> {
        let target = balances::table.filter(balances::user_id.eq(user_id));
        match currency {
            Currency::BTC => diesel::update(target)
                .set((balances::btc_sats.eq(amount), balances::updated_at.eq(now)))
                .execute(conn),
            Currency::USDT => diesel::update(target)
                .set((balances::usdt_cents.eq(amount), balances::updated_at.eq(now)))
                .execute(conn),
        }
    }
}
