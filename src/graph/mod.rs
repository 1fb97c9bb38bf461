pub mod builder;
pub mod cluster;

pub use builder::{AccountNode, AggregatedEdge, TransactionGraph};
