use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};

/// Account identifiers are opaque strings taken from the ledger.
pub type AccountId = String;

/// A single normalized transfer, immutable once ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub amount: BigDecimal,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: BigDecimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
        }
    }

    /// Amount as a float, for statistics only. Totals stay in `BigDecimal`.
    pub fn amount_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(0.0)
    }

    pub fn is_self_loop(&self) -> bool {
        self.sender == self.receiver
    }
}
