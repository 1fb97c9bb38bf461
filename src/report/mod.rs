pub mod builder;
pub mod scoring;
pub mod types;

pub use builder::build_report;
pub use types::{AccountReport, FraudRing, GraphView, Report, Summary, SuspiciousAccount};
