pub mod ingest;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use store::TransactionStore;
pub use types::{AccountId, Transaction};
