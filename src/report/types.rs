use std::collections::BTreeMap;

use serde::Serialize;

use crate::anomaly::PatternType;

/// Final output of one analysis run, serialized as the JSON report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub summary: Summary,
    /// Descending by `risk_score`; ties keep ring id order.
    pub fraud_rings: Vec<FraudRing>,
    pub accounts: BTreeMap<String, AccountReport>,
    /// Accounts with a positive score, highest first.
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub graph: GraphView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_transactions: usize,
    pub total_accounts_analyzed: usize,
    pub fraud_rings_detected: usize,
    pub suspicious_accounts_flagged: usize,
    pub processing_time_seconds: f64,
    pub is_partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudRing {
    pub ring_id: String,
    pub pattern_type: PatternType,
    pub member_accounts: Vec<String>,
    pub transaction_count: usize,
    pub risk_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountReport {
    pub score: u8,
    pub patterns: Vec<PatternType>,
    pub ring_ids: Vec<String>,
    /// Secondary signals such as `cycle_length_3`, `high_velocity`, `rapid_layering`.
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: u8,
    pub detected_patterns: Vec<PatternType>,
    pub ring_ids: Vec<String>,
    pub flags: Vec<String>,
}

// ============================================================
// Visualization
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub is_fraud: bool,
    pub risk_score: u8,
    pub in_degree: usize,
    pub out_degree: usize,
    pub ring_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub count: usize,
    pub total_amount: f64,
}
