use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::BigInt;
use serde::Serialize;

/// Aggregate figures over the whole ledger.
#[derive(QueryableByName, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LedgerTotals {
    #[diesel(sql_type = BigInt)]
    pub users: i64,
    #[diesel(sql_type = BigInt)]
    pub transactions: i64,
    #[diesel(sql_type = BigInt)]
    pub pending_deposits: i64,
    #[diesel(sql_type = BigInt)]
    pub btc_sats: i64,
    #[diesel(sql_type = BigInt)]
    pub usdt_cents: i64,
}

const TOTALS_QUERY: &str = "\
    SELECT \
        (SELECT COUNT(*) FROM users) AS users, \
        (SELECT COUNT(*) FROM transactions) AS transactions, \
        (SELECT COUNT(*) FROM deposits WHERE status = 'pending') AS pending_deposits, \
        (SELECT COALESCE(SUM(btc_sats), 0) FROM balances) AS btc_sats, \
        (SELECT COALESCE(SUM(usdt_cents), 0) FROM balances) AS usdt_cents";

impl LedgerTotals {
    pub fn get(conn: &mut SqliteConnection) -> Result<Self, DieselError> {
        diesel::sql_query(TOTALS_QUERY).get_result::<Self>(conn)
    }
}
