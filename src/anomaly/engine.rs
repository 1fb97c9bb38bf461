use std::collections::BTreeMap;
use std::thread::{self, ScopedJoinHandle};

use crate::config::AnalysisConfig;
use crate::graph::TransactionGraph;

use super::cycles::{self, CycleScan};
use super::legitimacy;
use super::shell;
use super::smurfing;
use super::types::{LegitimacyReason, RingCandidate};

/// Raw findings of one run, before scoring.
#[derive(Debug, Default)]
pub struct Detections {
    pub cycles: Vec<RingCandidate>,
    /// Fan-out rings first, then fan-in rings.
    pub smurfing: Vec<RingCandidate>,
    pub shells: Vec<RingCandidate>,
    pub legitimate: BTreeMap<usize, LegitimacyReason>,
    pub cycle_budget_exhausted: bool,
    /// Detectors that panicked; their contribution is empty.
    pub failed_detectors: Vec<&'static str>,
}

impl Detections {
    /// Whether any part of the graph went unanalyzed.
    pub fn is_partial(&self) -> bool {
        self.cycle_budget_exhausted || !self.failed_detectors.is_empty()
    }

    pub fn rings(&self) -> impl Iterator<Item = &RingCandidate> {
        self.cycles.iter().chain(&self.smurfing).chain(&self.shells)
    }
}

/// Runs the cycle, smurfing and shell detectors against one graph.
pub struct DetectionEngine<'c> {
    config: &'c AnalysisConfig,
}

impl<'c> DetectionEngine<'c> {
    pub fn new(config: &'c AnalysisConfig) -> Self {
        Self { config }
    }

    /// The three detectors only read the graph, so each gets its own scoped
    /// thread. A panic in one is logged and treated as an empty result; the
    /// others still contribute.
    pub fn run(&self, graph: &TransactionGraph) -> Detections {
        let config = self.config;
        let mut failed_detectors = Vec::new();

        let (cycle_scan, smurfing, shells) = thread::scope(|s| {
            let cycle_task = s.spawn(|| cycles::detect_cycles(graph, &config.cycles));
            let smurfing_task = s.spawn(|| smurfing::detect_smurfing(graph, &config.smurfing));
            let shell_task = s.spawn(|| shell::detect_shell_chains(graph, &config.shell));

            (
                join_isolated("cycle", cycle_task, &mut failed_detectors),
                join_isolated("smurfing", smurfing_task, &mut failed_detectors),
                join_isolated("shell", shell_task, &mut failed_detectors),
            )
        });
        let CycleScan {
            rings: cycles,
            budget_exhausted,
            ..
        } = cycle_scan;

        let legitimate = legitimacy::identify_legitimate_accounts(graph, &config.legitimacy);

        Detections {
            cycles,
            smurfing,
            shells,
            legitimate,
            cycle_budget_exhausted: budget_exhausted,
            failed_detectors,
        }
    }
}

/// Join a detector thread, substituting an empty result if it panicked.
pub(crate) fn join_isolated<T: Default>(
    name: &'static str,
    handle: ScopedJoinHandle<'_, T>,
    failed: &mut Vec<&'static str>,
) -> T {
    match handle.join() {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                detector = name,
                "Detector panicked, continuing without its findings"
            );
            failed.push(name);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::types::PatternType;
    use crate::ledger::fixtures::{path, tx};
    use crate::ledger::TransactionStore;

    #[test]
    fn test_runs_all_detectors() {
        let mut txs = path("C", &["A", "B", "C", "A"], 0);
        txs.extend((0..10).map(|i| tx(&format!("F{i}"), "HUB", &format!("R{i}"), 50.0, i)));
        let store = TransactionStore::new(txs, 1000).unwrap();
        let graph = TransactionGraph::build(&store);
        let config = AnalysisConfig::default();

        let detections = DetectionEngine::new(&config).run(&graph);
        assert_eq!(detections.cycles.len(), 1);
        assert_eq!(detections.smurfing.len(), 1);
        assert_eq!(detections.smurfing[0].pattern_type(), PatternType::FanOut);
        assert!(!detections.is_partial());
        assert_eq!(detections.rings().count(), 2);
    }

    #[test]
    fn test_panicking_detector_is_isolated() {
        let mut failed = Vec::new();
        let (healthy, broken): (Vec<u32>, Vec<u32>) = thread::scope(|s| {
            let ok = s.spawn(|| vec![1, 2, 3]);
            let bad = s.spawn(|| -> Vec<u32> { panic!("detector bug") });
            (
                join_isolated("healthy", ok, &mut failed),
                join_isolated("broken", bad, &mut failed),
            )
        });
        assert_eq!(healthy, vec![1, 2, 3]);
        assert!(broken.is_empty());
        assert_eq!(failed, vec!["broken"]);
    }
}
