use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Laundering structures the engine can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Cycle,
    FanOut,
    FanIn,
    LayeredShell,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cycle => "cycle",
            Self::FanOut => "fan_out",
            Self::FanIn => "fan_in",
            Self::LayeredShell => "layered_shell",
        }
    }
}

/// Pattern-specific evidence behind a ring. Node indices refer to the graph
/// the ring was detected on.
#[derive(Debug, Clone, PartialEq)]
pub enum RingEvidence {
    /// Simple cycles unioned into this ring, each in canonical rotation.
    Cycle { cycles: Vec<Vec<usize>> },
    /// One hub sending to many receivers inside a single window.
    FanOut {
        hub: usize,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    },
    /// Many senders paying one hub inside a single window.
    FanIn {
        hub: usize,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    },
    /// Shell chains unioned into this ring, each ordered from origin to endpoint.
    LayeredShell { chains: Vec<Vec<usize>> },
}

/// A ring as emitted by a detector, before ids and scores are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct RingCandidate {
    /// Member node indices, ascending.
    pub members: Vec<usize>,
    /// Indices of the distinct transactions that make up the ring.
    pub transactions: BTreeSet<usize>,
    pub evidence: RingEvidence,
}

impl RingCandidate {
    pub fn pattern_type(&self) -> PatternType {
        match self.evidence {
            RingEvidence::Cycle { .. } => PatternType::Cycle,
            RingEvidence::FanOut { .. } => PatternType::FanOut,
            RingEvidence::FanIn { .. } => PatternType::FanIn,
            RingEvidence::LayeredShell { .. } => PatternType::LayeredShell,
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// Why the legitimacy guard cleared an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegitimacyReason {
    /// Large inbound volume, never pays out.
    MerchantSink,
    /// Large outbound volume, never receives.
    PayrollSource,
    /// Many senders paying consistent amounts.
    MerchantPattern,
    /// Many receivers paid consistent amounts.
    PayrollPattern,
}

impl LegitimacyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MerchantSink => "merchant_sink",
            Self::PayrollSource => "payroll_source",
            Self::MerchantPattern => "merchant_pattern",
            Self::PayrollPattern => "payroll_pattern",
        }
    }
}
