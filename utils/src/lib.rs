pub mod config;
pub mod xlogging;

pub mod time {
    use chrono::{NaiveDateTime, Utc};
    use std::time::SystemTime;

    pub fn time_now() -> u64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Wall clock in UTC, as stored in the ledger's timestamp columns.
    pub fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}
