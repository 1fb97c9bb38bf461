use bigdecimal::{BigDecimal, Zero};

use crate::error::{AnalysisError, AnalysisResult};

use super::types::Transaction;

/// Validated, ordered, read-only sequence of transactions for one analysis run.
/// Every detector reads from the same store through the graph built over it.
#[derive(Debug)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
}

impl TransactionStore {
    /// Validate and freeze a transaction sequence.
    ///
    /// Size is checked before anything else so that oversized input is rejected
    /// without touching its contents. Rows are reported 1-based.
    pub fn new(transactions: Vec<Transaction>, max_transactions: usize) -> AnalysisResult<Self> {
        if transactions.len() > max_transactions {
            return Err(AnalysisError::ResourceExceeded {
                count: transactions.len(),
                max: max_transactions,
            });
        }

        let zero = BigDecimal::zero();
        let mut self_loops = 0usize;
        for (idx, t) in transactions.iter().enumerate() {
            let row = idx + 1;
            if t.id.trim().is_empty() {
                return Err(AnalysisError::malformed(row, "missing transaction id"));
            }
            if t.sender.trim().is_empty() {
                return Err(AnalysisError::malformed(row, "missing sender"));
            }
            if t.receiver.trim().is_empty() {
                return Err(AnalysisError::malformed(row, "missing receiver"));
            }
            if t.amount < zero {
                return Err(AnalysisError::malformed(
                    row,
                    format!("negative amount {}", t.amount),
                ));
            }
            if t.is_self_loop() {
                self_loops += 1;
            }
        }

        if self_loops > 0 {
            tracing::warn!(
                self_loops,
                "Self-loop transactions accepted; they count toward degree only"
            );
        }

        tracing::debug!(transactions = transactions.len(), "Transaction store validated");
        Ok(Self { transactions })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get(&self, idx: usize) -> Option<&Transaction> {
        self.transactions.get(idx)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
