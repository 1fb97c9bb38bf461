pub mod anomaly;
pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod pipeline;
pub mod report;

pub use error::{AnalysisError, AnalysisResult};
pub use pipeline::{analyze, analyze_csv};
