use crate::schema::transactions;
use chrono::NaiveDateTime;
use core_types::{Currency, TxType};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::{BigInt, Nullable, Text, Timestamp};
use serde::Serialize;
use std::str::FromStr;

/// Append-only log row. Transfers carry both parties, deposits only a
/// recipient and withdrawals only a sender.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, PartialEq)]
#[diesel(table_name = transactions)]
pub struct Transaction {
    pub id: i64,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub tx_type: String,
    pub reference: String,
    pub description: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = transactions)]
pub struct InsertableTransaction<'a> {
    pub from_user_id: Option<&'a str>,
    pub to_user_id: Option<&'a str>,
    pub amount: i64,
    pub currency: &'a str,
    pub tx_type: &'a str,
    pub reference: &'a str,
    pub description: &'a str,
    pub created_at: NaiveDateTime,
}

impl Transaction {
    pub fn currency(&self) -> Result<Currency, String> {
        Currency::from_str(&self.currency)
    }

    pub fn kind(&self) -> Result<TxType, String> {
        TxType::from_str(&self.tx_type)
    }

    pub fn get_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, DieselError> {
        transactions::table
            .filter(transactions::id.eq(id))
            .select(Self::as_select())
            .first::<Self>(conn)
            .optional()
    }

    pub fn get_by_reference(conn: &mut SqliteConnection, reference: &str) -> Result<Option<Self>, DieselError> {
        transactions::table
            .filter(transactions::reference.eq(reference))
            .select(Self::as_select())
            .first::<Self>(conn)
            .optional()
    }

    pub fn reference_exists(conn: &mut SqliteConnection, reference: &str) -> Result<bool, DieselError> {
        diesel::select(diesel::dsl::exists(
            transactions::table.filter(transactions::reference.eq(reference)),
        ))
        .get_result(conn)
    }

    pub fn count(conn: &mut SqliteConnection) -> Result<i64, DieselError> {
        transactions::table.count().get_result(conn)
    }
}

impl<'a> InsertableTransaction<'a> {
    /// Appends the row and returns its sequence id.
    pub fn insert(&self, conn: &mut SqliteConnection) -> Result<i64, DieselError> {
        diesel::insert_into(transactions::table)
            .values(self)
            .returning(transactions::id)
            .get_result(conn)
    }
}

/// A transaction involving a user, joined with the names of both parties.
#[derive(QueryableByName, Debug, Clone, PartialEq)]
pub struct HistoryRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Nullable<Text>)]
    pub from_user_id: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub to_user_id: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub amount: i64,
    #[diesel(sql_type = Text)]
    pub currency: String,
    #[diesel(sql_type = Text)]
    pub tx_type: String,
    #[diesel(sql_type = Text)]
    pub reference: String,
    #[diesel(sql_type = Text)]
    pub description: String,
    #[diesel(sql_type = Timestamp)]
    pub created_at: NaiveDateTime,
    #[diesel(sql_type = Nullable<Text>)]
    pub sender_first_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub sender_last_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub sender_email: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub receiver_first_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub receiver_last_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub receiver_email: Option<String>,
}

const HISTORY_QUERY: &str = "\
    SELECT t.id, t.from_user_id, t.to_user_id, t.amount, t.currency, t.tx_type, \
           t.reference, t.description, t.created_at, \
           s.first_name AS sender_first_name, s.last_name AS sender_last_name, s.email AS sender_email, \
           r.first_name AS receiver_first_name, r.last_name AS receiver_last_name, r.email AS receiver_email \
    FROM transactions t \
    LEFT JOIN users s ON s.id = t.from_user_id \
    LEFT JOIN users r ON r.id = t.to_user_id \
    WHERE t.from_user_id = ? OR t.to_user_id = ? \
    ORDER BY t.created_at DESC, t.id DESC \
    LIMIT ?";

impl HistoryRow {
    /// Most recent first. Rows sharing a timestamp fall back to insertion order.
    pub fn for_user(conn: &mut SqliteConnection, user_id: &str, limit: i64) -> Result<Vec<Self>, DieselError> {
        diesel::sql_query(HISTORY_QUERY)
            .bind::<Text, _>(user_id)
            .bind::<Text, _>(user_id)
            .bind::<BigInt, _>(limit)
            .load::<Self>(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::InsertableUser;
    use chrono::Duration;
    use diesel::result::DatabaseErrorKind;

    fn conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        crate::init(&mut conn).unwrap();
        for (id, phone, first) in [("u-a", "1", "Ann"), ("u-b", "2", "Ben"), ("u-c", "3", "Cal")] {
            InsertableUser {
                id,
                phone,
                email: &format!("{id}@example.com"),
                first_name: first,
                last_name: "Test",
                created_at: chrono::Utc::now().naive_utc(),
            }
            .insert(&mut conn)
            .unwrap();
        }
        conn
    }

    fn transfer<'a>(from: &'a str, to: &'a str, reference: &'a str, at: NaiveDateTime) -> InsertableTransaction<'a> {
        InsertableTransaction {
            from_user_id: Some(from),
            to_user_id: Some(to),
            amount: 100,
            currency: "btc",
            tx_type: "transfer",
            reference,
            description: "",
            created_at: at,
        }
    }

    #[test]
    fn ids_increase_and_reference_is_unique() {
        let mut conn = conn();
        let now = chrono::Utc::now().naive_utc();

        let first = transfer("u-a", "u-b", "tx_1", now).insert(&mut conn).unwrap();
        let second = transfer("u-b", "u-a", "tx_2", now).insert(&mut conn).unwrap();
        assert!(second > first);

        assert!(Transaction::reference_exists(&mut conn, "tx_1").unwrap());
        assert!(!Transaction::reference_exists(&mut conn, "tx_3").unwrap());

        let err = transfer("u-a", "u-b", "tx_1", now).insert(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
        ));

        let row = Transaction::get_by_reference(&mut conn, "tx_2").unwrap().unwrap();
        assert_eq!(row.currency(), Ok(Currency::BTC));
        assert_eq!(row.kind(), Ok(TxType::Transfer));
    }

    #[test]
    fn history_is_newest_first_and_scoped_to_the_user() {
        let mut conn = conn();
        let t0 = chrono::Utc::now().naive_utc();

        transfer("u-a", "u-b", "tx_1", t0).insert(&mut conn).unwrap();
        transfer("u-b", "u-a", "tx_2", t0 + Duration::seconds(1)).insert(&mut conn).unwrap();
        transfer("u-b", "u-c", "tx_3", t0 + Duration::seconds(2)).insert(&mut conn).unwrap();
        // same timestamp as tx_2, inserted later
        transfer("u-a", "u-c", "tx_4", t0 + Duration::seconds(1)).insert(&mut conn).unwrap();

        let rows = HistoryRow::for_user(&mut conn, "u-a", 10).unwrap();
        let refs: Vec<_> = rows.iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(refs, vec!["tx_4", "tx_2", "tx_1"]);
        assert_eq!(rows[1].sender_first_name.as_deref(), Some("Ben"));
        assert_eq!(rows[0].receiver_first_name.as_deref(), Some("Cal"));

        let limited = HistoryRow::for_user(&mut conn, "u-a", 1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].reference, "tx_4");
    }

    #[test]
    fn deposit_rows_have_no_sender() {
        let mut conn = conn();
        InsertableTransaction {
            from_user_id: None,
            to_user_id: Some("u-a"),
            amount: 5000,
            currency: "usdt",
            tx_type: "deposit",
            reference: "dep_1",
            description: "Deposit confirmed",
            created_at: chrono::Utc::now().naive_utc(),
        }
        .insert(&mut conn)
        .unwrap();

        let rows = HistoryRow::for_user(&mut conn, "u-a", 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].sender_first_name.is_none());
        assert_eq!(rows[0].receiver_first_name.as_deref(), Some("Ann"));
    }
}
