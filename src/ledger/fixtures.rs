//! Ledger builders shared by unit tests.

use bigdecimal::{BigDecimal, FromPrimitive};
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::types::Transaction;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Transaction at `hours` after the fixed base time.
pub fn tx(id: &str, sender: &str, receiver: &str, amount: f64, hours: i64) -> Transaction {
    Transaction::new(
        id,
        sender,
        receiver,
        BigDecimal::from_f64(amount).unwrap(),
        base_time() + Duration::hours(hours),
    )
}

/// Chain of transfers `path[0] -> path[1] -> ...`, one hour apart starting at `start_hour`.
pub fn path(prefix: &str, accounts: &[&str], start_hour: i64) -> Vec<Transaction> {
    accounts
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            tx(
                &format!("{prefix}{i}"),
                w[0],
                w[1],
                1000.0,
                start_hour + i as i64,
            )
        })
        .collect()
}
