use crate::schema::users;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: String,
    /// Phone number, unique across users
    pub phone: String,
    /// Email, unique across users
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct InsertableUser<'a> {
    pub id: &'a str,
    pub phone: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn get_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<Self>, DieselError> {
        users::table
            .filter(users::id.eq(id))
            .select(Self::as_select())
            .first::<Self>(conn)
            .optional()
    }

    pub fn get_by_phone(conn: &mut SqliteConnection, phone: &str) -> Result<Option<Self>, DieselError> {
        users::table
            .filter(users::phone.eq(phone))
            .select(Self::as_select())
            .first::<Self>(conn)
            .optional()
    }

    pub fn get_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Option<Self>, DieselError> {
        users::table
            .filter(users::email.eq(email))
            .select(Self::as_select())
            .first::<Self>(conn)
            .optional()
    }

    pub fn exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, DieselError> {
        diesel::select(diesel::dsl::exists(users::table.filter(users::id.eq(id)))).get_result(conn)
    }

    /// Users in registration order, paged.
    pub fn list(conn: &mut SqliteConnection, limit: i64, offset: i64) -> Result<Vec<Self>, DieselError> {
        users::table
            .order((users::created_at.asc(), users::id.asc()))
            .limit(limit)
            .offset(offset)
            .select(Self::as_select())
            .load::<Self>(conn)
    }

    pub fn count(conn: &mut SqliteConnection) -> Result<i64, DieselError> {
        users::table.count().get_result(conn)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl<'a> InsertableUser<'a> {
    pub fn insert(&self, conn: &mut SqliteConnection) -> Result<usize, DieselError> {
        diesel::insert_into(users::table).values(self).execute(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::DatabaseErrorKind;

    fn conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        crate::init(&mut conn).unwrap();
        conn
    }

    fn insert(conn: &mut SqliteConnection, id: &str, phone: &str, email: &str) -> Result<usize, DieselError> {
        InsertableUser {
            id,
            phone,
            email,
            first_name: "Ada",
            last_name: "Obi",
            created_at: chrono::Utc::now().naive_utc(),
        }
        .insert(conn)
    }

    #[test]
    fn lookups_by_unique_keys() {
        let mut conn = conn();
        insert(&mut conn, "u-1", "2348000000001", "ada@example.com").unwrap();

        let by_phone = User::get_by_phone(&mut conn, "2348000000001").unwrap().unwrap();
        let by_email = User::get_by_email(&mut conn, "ada@example.com").unwrap().unwrap();
        assert_eq!(by_phone, by_email);
        assert_eq!(by_phone.full_name(), "Ada Obi");

        assert!(User::get_by_phone(&mut conn, "000").unwrap().is_none());
        assert!(User::exists(&mut conn, "u-1").unwrap());
        assert!(!User::exists(&mut conn, "u-2").unwrap());
    }

    #[test]
    fn duplicate_phone_is_a_unique_violation() {
        let mut conn = conn();
        insert(&mut conn, "u-1", "2348000000001", "ada@example.com").unwrap();

        let err = insert(&mut conn, "u-2", "2348000000001", "other@example.com").unwrap_err();
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                assert!(info.message().contains("users.phone"))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lists_in_registration_order() {
        let mut conn = conn();
        insert(&mut conn, "u-1", "1", "a@example.com").unwrap();
        insert(&mut conn, "u-2", "2", "b@example.com").unwrap();
        insert(&mut conn, "u-3", "3", "c@example.com").unwrap();

        let page = User::list(&mut conn, 2, 1).unwrap();
        let ids: Vec<_> = page.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u-2", "u-3"]);
        assert_eq!(User::count(&mut conn).unwrap(), 3);
    }
}
