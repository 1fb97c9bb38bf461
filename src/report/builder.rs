use std::collections::BTreeMap;
use std::time::Instant;

use bigdecimal::ToPrimitive;

use crate::anomaly::{Detections, PatternType, RingCandidate};
use crate::config::AnalysisConfig;
use crate::graph::TransactionGraph;

use super::scoring::{ring_risk, score_accounts, AccountScore};
use super::types::*;

/// Merge detector findings into the final report.
///
/// Ring ids are handed out in detection order (cycles, fan-out, fan-in,
/// layered shell) before the rings are sorted by risk, so ids are stable for a
/// given input regardless of scores.
pub fn build_report(
    graph: &TransactionGraph,
    detections: &Detections,
    config: &AnalysisConfig,
    input_partial: bool,
    started: Instant,
) -> Report {
    let identified: Vec<(String, &RingCandidate)> = detections
        .rings()
        .enumerate()
        .map(|(i, ring)| (format!("RING_{:03}", i + 1), ring))
        .collect();

    let scores = score_accounts(
        graph,
        identified.iter().map(|(id, ring)| (id.as_str(), *ring)),
        &detections.legitimate,
        config,
    );

    let mut fraud_rings: Vec<FraudRing> = identified
        .iter()
        .map(|(ring_id, ring)| FraudRing {
            ring_id: ring_id.clone(),
            pattern_type: ring.pattern_type(),
            member_accounts: ring.members.iter().map(|&m| graph.account(m).to_string()).collect(),
            transaction_count: ring.transaction_count(),
            risk_score: ring_risk(ring, &scores),
        })
        .collect();
    // Stable: equal scores keep detection order.
    fraud_rings.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

    let accounts: BTreeMap<String, AccountReport> = scores
        .iter()
        .map(|(&idx, s)| {
            (
                graph.account(idx).to_string(),
                AccountReport {
                    score: s.score,
                    patterns: s.patterns.iter().copied().collect(),
                    ring_ids: s.ring_ids.iter().cloned().collect(),
                    flags: s.flags(),
                },
            )
        })
        .collect();

    let suspicious_accounts = suspicious_accounts(graph, &scores);

    let summary = Summary {
        total_transactions: graph.transaction_count(),
        total_accounts_analyzed: graph.node_count(),
        fraud_rings_detected: fraud_rings.len(),
        suspicious_accounts_flagged: suspicious_accounts.len(),
        processing_time_seconds: round_to(started.elapsed().as_secs_f64(), 3),
        is_partial: input_partial || detections.is_partial(),
    };

    tracing::info!(
        rings = summary.fraud_rings_detected,
        flagged = summary.suspicious_accounts_flagged,
        cycle_rings = count_pattern(&fraud_rings, PatternType::Cycle),
        shell_rings = count_pattern(&fraud_rings, PatternType::LayeredShell),
        is_partial = summary.is_partial,
        "Report built"
    );

    Report {
        summary,
        fraud_rings,
        accounts,
        suspicious_accounts,
        graph: graph_view(graph, &scores),
    }
}

fn suspicious_accounts(
    graph: &TransactionGraph,
    scores: &BTreeMap<usize, AccountScore>,
) -> Vec<SuspiciousAccount> {
    let mut flagged: Vec<SuspiciousAccount> = scores
        .iter()
        .filter(|(_, s)| s.score > 0)
        .map(|(&idx, s)| SuspiciousAccount {
            account_id: graph.account(idx).to_string(),
            suspicion_score: s.score,
            detected_patterns: s.patterns.iter().copied().collect(),
            ring_ids: s.ring_ids.iter().cloned().collect(),
            flags: s.flags(),
        })
        .collect();
    flagged.sort_by(|a, b| {
        b.suspicion_score
            .cmp(&a.suspicion_score)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
    flagged
}

fn graph_view(graph: &TransactionGraph, scores: &BTreeMap<usize, AccountScore>) -> GraphView {
    let nodes = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let score = scores.get(&idx);
            GraphNode {
                id: node.id.clone(),
                is_fraud: score.is_some(),
                risk_score: score.map(|s| s.score).unwrap_or(0),
                in_degree: node.in_degree(),
                out_degree: node.out_degree(),
                ring_ids: score
                    .map(|s| s.ring_ids.iter().cloned().collect())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let edges = graph
        .aggregated_edges()
        .into_iter()
        .map(|e| GraphEdge {
            source: graph.account(e.source).to_string(),
            target: graph.account(e.target).to_string(),
            count: e.transfer_count,
            total_amount: round_to(e.total_amount.to_f64().unwrap_or(0.0), 2),
        })
        .collect();

    GraphView { nodes, edges }
}

fn count_pattern(rings: &[FraudRing], pattern: PatternType) -> usize {
    rings.iter().filter(|r| r.pattern_type == pattern).count()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::DetectionEngine;
    use crate::ledger::fixtures::{path, tx};
    use crate::ledger::TransactionStore;

    #[test]
    fn test_report_from_cycle_and_fan_out() {
        let mut txs = path("C", &["A", "B", "C", "A"], 0);
        txs.extend((0..10).map(|i| tx(&format!("F{i}"), "HUB", &format!("R{i}"), 50.0, 200 + i)));
        let store = TransactionStore::new(txs, 1000).unwrap();
        let graph = TransactionGraph::build(&store);
        let config = AnalysisConfig::default();
        let detections = DetectionEngine::new(&config).run(&graph);

        let report = build_report(&graph, &detections, &config, false, Instant::now());

        assert_eq!(report.summary.total_transactions, 13);
        assert_eq!(report.summary.total_accounts_analyzed, 14);
        assert_eq!(report.summary.fraud_rings_detected, 2);
        assert!(!report.summary.is_partial);

        // cycle members: 40 + 15, hub: 30 + 15
        let top = &report.fraud_rings[0];
        assert_eq!(top.ring_id, "RING_001");
        assert_eq!(top.pattern_type, PatternType::Cycle);
        assert_eq!(top.risk_score, 55);
        assert_eq!(report.fraud_rings[1].pattern_type, PatternType::FanOut);
        assert_eq!(report.fraud_rings[1].risk_score, 45);

        assert_eq!(report.accounts["A"].patterns, vec![PatternType::Cycle]);
        assert_eq!(report.accounts["A"].flags, vec!["cycle_length_3", "high_velocity"]);
        assert_eq!(report.accounts["HUB"].ring_ids, vec!["RING_002"]);
        assert_eq!(report.suspicious_accounts[0].flags, report.accounts["A"].flags);
        assert_eq!(report.suspicious_accounts[0].account_id, "A");
        assert_eq!(report.summary.suspicious_accounts_flagged, 14);

        let hub = report.graph.nodes.iter().find(|n| n.id == "HUB").unwrap();
        assert!(hub.is_fraud);
        assert_eq!(hub.out_degree, 10);
        assert_eq!(hub.ring_ids, vec!["RING_002"]);
        assert_eq!(report.graph.edges.len(), 13);
    }

    #[test]
    fn test_partial_input_marks_report() {
        let store = TransactionStore::new(path("P", &["A", "B"], 0), 10).unwrap();
        let graph = TransactionGraph::build(&store);
        let config = AnalysisConfig::default();
        let detections = DetectionEngine::new(&config).run(&graph);

        let report = build_report(&graph, &detections, &config, true, Instant::now());
        assert!(report.summary.is_partial);
        assert!(report.fraud_rings.is_empty());
        assert!(report.accounts.is_empty());
        assert!(report.graph.nodes.iter().all(|n| !n.is_fraud && n.ring_ids.is_empty()));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.0005, 3), 0.001);
    }
}
