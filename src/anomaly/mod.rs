pub mod cycles;
pub mod engine;
pub mod legitimacy;
pub mod shell;
pub mod smurfing;
pub mod types;

pub use engine::{DetectionEngine, Detections};
pub use types::{LegitimacyReason, PatternType, RingCandidate, RingEvidence};
