use std::collections::BTreeSet;
use std::time::Instant;

use crate::config::CycleConfig;
use crate::graph::cluster::merge_overlapping;
use crate::graph::TransactionGraph;

use super::types::{RingCandidate, RingEvidence};

/// Outcome of a cycle scan. `budget_exhausted` means the search stopped early,
/// on the deadline or the cycle cap, and the rings cover only what it reached.
#[derive(Debug, Default)]
pub struct CycleScan {
    pub rings: Vec<RingCandidate>,
    pub cycles_found: usize,
    pub budget_exhausted: bool,
}

/// Why a search unwound before covering the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    Deadline,
    CycleCap,
}

/// Bounded-depth DFS state for one scan.
///
/// A search rooted at `start` only enters nodes with a larger index, so every
/// simple cycle is found exactly once, from its smallest node, and the path
/// is already in canonical rotation when it closes.
struct CycleSearch<'g, 'a> {
    graph: &'g TransactionGraph<'a>,
    min_len: usize,
    max_len: usize,
    max_cycles: usize,
    deadline: Option<Instant>,
    path: Vec<usize>,
    on_path: Vec<bool>,
    cycles: Vec<Vec<usize>>,
}

impl<'g, 'a> CycleSearch<'g, 'a> {
    fn check_budget(&self) -> Result<(), Halt> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Halt::Deadline),
            _ => Ok(()),
        }
    }

    fn run_from(&mut self, start: usize) -> Result<(), Halt> {
        self.check_budget()?;
        self.path.push(start);
        self.on_path[start] = true;
        let outcome = self.extend(start, start);
        self.on_path[start] = false;
        self.path.pop();
        outcome
    }

    fn extend(&mut self, start: usize, current: usize) -> Result<(), Halt> {
        let graph = self.graph;
        for next in graph.successors(current) {
            self.check_budget()?;

            if next == start {
                if self.path.len() >= self.min_len {
                    self.record()?;
                }
                continue;
            }
            if next < start || self.on_path[next] || self.path.len() >= self.max_len {
                continue;
            }

            self.path.push(next);
            self.on_path[next] = true;
            let outcome = self.extend(start, next);
            self.on_path[next] = false;
            self.path.pop();
            outcome?;
        }
        Ok(())
    }

    fn record(&mut self) -> Result<(), Halt> {
        self.cycles.push(canonical_rotation(&self.path));
        if self.cycles.len() >= self.max_cycles {
            return Err(Halt::CycleCap);
        }
        Ok(())
    }
}

/// Rotate a cycle so that its smallest node comes first. Direction is kept.
pub fn canonical_rotation(cycle: &[usize]) -> Vec<usize> {
    let Some(pivot) = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, node)| **node)
        .map(|(pos, _)| pos)
    else {
        return Vec::new();
    };
    cycle[pivot..].iter().chain(&cycle[..pivot]).copied().collect()
}

/// Enumerate simple directed cycles with `min_len..=max_len` members and
/// union those sharing two or more members into rings.
///
/// Stops exploring once `time_budget` has elapsed or `max_cycles` cycles are
/// recorded, and returns whatever was found; the scan is then flagged as
/// exhausted rather than failed. The cap bounds the merge and ring assembly
/// that follow the search.
pub fn detect_cycles(graph: &TransactionGraph, config: &CycleConfig) -> CycleScan {
    let started = Instant::now();
    let mut search = CycleSearch {
        graph,
        min_len: config.min_len,
        max_len: config.max_len,
        max_cycles: config.max_cycles,
        deadline: started.checked_add(config.time_budget()),
        path: Vec::with_capacity(config.max_len),
        on_path: vec![false; graph.node_count()],
        cycles: Vec::new(),
    };

    let mut budget_exhausted = false;
    for start in 0..graph.node_count() {
        let node = graph.node(start);
        if node.unique_senders.is_empty() || node.unique_receivers.is_empty() {
            continue;
        }
        if let Err(halt) = search.run_from(start) {
            budget_exhausted = true;
            match halt {
                Halt::Deadline => tracing::warn!(
                    budget_ms = config.time_budget_ms,
                    cycles = search.cycles.len(),
                    "Cycle search time budget exhausted, returning partial results"
                ),
                Halt::CycleCap => tracing::warn!(
                    max_cycles = config.max_cycles,
                    "Cycle cap reached, returning partial results"
                ),
            }
            break;
        }
    }

    let cycles_found = search.cycles.len();
    let clusters = merge_overlapping(&search.cycles);
    let mut slots: Vec<Option<Vec<usize>>> = search.cycles.into_iter().map(Some).collect();
    let rings: Vec<RingCandidate> = clusters
        .into_iter()
        .map(|cluster| {
            let grouped: Vec<Vec<usize>> = cluster.into_iter().filter_map(|c| slots[c].take()).collect();
            cycle_ring(graph, grouped)
        })
        .collect();

    tracing::info!(
        cycles = cycles_found,
        rings = rings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        budget_exhausted,
        "Cycle detection finished"
    );

    CycleScan {
        rings,
        cycles_found,
        budget_exhausted,
    }
}

/// Build one ring from a group of cycles. Its transactions are every transfer
/// along any hop of any cycle in the group.
fn cycle_ring(graph: &TransactionGraph, cycles: Vec<Vec<usize>>) -> RingCandidate {
    let mut members = BTreeSet::new();
    let mut transactions = BTreeSet::new();
    for cycle in &cycles {
        members.extend(cycle.iter().copied());
        for (pos, &from) in cycle.iter().enumerate() {
            let to = cycle[(pos + 1) % cycle.len()];
            transactions.extend(graph.edges_between(from, to));
        }
    }
    RingCandidate {
        members: members.into_iter().collect(),
        transactions,
        evidence: RingEvidence::Cycle { cycles },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ledger::fixtures::{path, tx};
    use crate::ledger::{Transaction, TransactionStore};

    fn scan(txs: Vec<Transaction>, config: &CycleConfig) -> (Vec<Vec<String>>, CycleScan) {
        let store = TransactionStore::new(txs, 10_000).unwrap();
        let graph = TransactionGraph::build(&store);
        let result = detect_cycles(&graph, config);
        let members = result
            .rings
            .iter()
            .map(|r| r.members.iter().map(|&m| graph.account(m).to_string()).collect())
            .collect();
        (members, result)
    }

    #[test]
    fn test_single_triangle() {
        let (members, result) = scan(path("C", &["A", "B", "C", "A"], 0), &CycleConfig::default());
        assert_eq!(members, vec![vec!["A", "B", "C"]]);
        assert_eq!(result.rings[0].transaction_count(), 3);
        assert_eq!(result.cycles_found, 1);
        assert!(!result.budget_exhausted);
    }

    #[test]
    fn test_cycles_sharing_two_members_merge() {
        let mut txs = path("X", &["A", "B", "C", "A"], 0);
        txs.extend(path("Y", &["B", "C", "D", "B"], 10));
        let (members, result) = scan(txs, &CycleConfig::default());
        assert_eq!(members, vec![vec!["A", "B", "C", "D"]]);
        assert_eq!(result.cycles_found, 2);
        // B->C appears in both cycles: two parallel transfers, both counted once
        assert_eq!(result.rings[0].transaction_count(), 6);
    }

    #[test]
    fn test_cycles_sharing_one_member_stay_separate() {
        let mut txs = path("X", &["A", "B", "C", "A"], 0);
        txs.extend(path("Y", &["C", "D", "E", "C"], 10));
        let (members, _) = scan(txs, &CycleConfig::default());
        assert_eq!(members, vec![vec!["A", "B", "C"], vec!["C", "D", "E"]]);
    }

    #[test]
    fn test_length_bounds() {
        // 2-cycle and 6-cycle are both outside 3..=5
        let mut txs = path("P", &["A", "B", "A"], 0);
        txs.extend(path("Q", &["K", "L", "M", "N", "O", "P", "K"], 0));
        let (members, _) = scan(txs, &CycleConfig::default());
        assert!(members.is_empty());

        let five = path("F", &["V", "W", "X", "Y", "Z", "V"], 0);
        let (members, _) = scan(five, &CycleConfig::default());
        assert_eq!(members, vec![vec!["V", "W", "X", "Y", "Z"]]);
    }

    #[test]
    fn test_parallel_edges_counted_in_transactions() {
        let mut txs = path("C", &["A", "B", "C", "A"], 0);
        txs.push(tx("EXTRA", "A", "B", 5.0, 9));
        let (_, result) = scan(txs, &CycleConfig::default());
        assert_eq!(result.cycles_found, 1);
        assert_eq!(result.rings[0].transaction_count(), 4);
    }

    #[test]
    fn test_self_loops_ignored() {
        let (members, _) = scan(vec![tx("T1", "A", "A", 1.0, 0)], &CycleConfig::default());
        assert!(members.is_empty());
    }

    #[test]
    fn test_zero_budget_returns_partial() {
        let config = CycleConfig {
            time_budget_ms: 0,
            ..CycleConfig::default()
        };
        let (members, result) = scan(path("C", &["A", "B", "C", "A"], 0), &config);
        assert!(result.budget_exhausted);
        assert!(members.is_empty());
    }

    #[test]
    fn test_canonical_rotation() {
        assert_eq!(canonical_rotation(&[4, 2, 7]), vec![2, 7, 4]);
        assert_eq!(canonical_rotation(&[1, 5, 3]), vec![1, 5, 3]);
        assert!(canonical_rotation(&[]).is_empty());
    }

    /// Every ordered pair of `n` accounts, one transfer each.
    fn complete_digraph(n: usize) -> Vec<Transaction> {
        let mut txs = Vec::new();
        for i in 0..n {
            for j in (0..n).filter(|&j| j != i) {
                let id = format!("K{i:02}_{j:02}");
                txs.push(tx(&id, &format!("N{i:02}"), &format!("N{j:02}"), 10.0, (i * n + j) as i64));
            }
        }
        txs
    }

    #[test]
    fn test_cycle_cap_stops_dense_search() {
        let config = CycleConfig {
            max_cycles: 500,
            ..CycleConfig::default()
        };
        let (members, result) = scan(complete_digraph(12), &config);
        assert!(result.budget_exhausted);
        assert_eq!(result.cycles_found, 500);
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn test_dense_graph_stays_within_time_budget() {
        // 40 accounts all paying each other: millions of 3..=5 cycles
        let store = TransactionStore::new(complete_digraph(40), 10_000).unwrap();
        let graph = TransactionGraph::build(&store);
        let config = CycleConfig {
            time_budget_ms: 200,
            ..CycleConfig::default()
        };

        let started = Instant::now();
        let result = detect_cycles(&graph, &config);
        let elapsed = started.elapsed();

        assert!(result.budget_exhausted);
        assert!(result.cycles_found <= config.max_cycles);
        assert!(
            elapsed < config.time_budget() + Duration::from_millis(1000),
            "took {elapsed:?} on a 200ms budget"
        );

        let started = Instant::now();
        let result = detect_cycles(&graph, &CycleConfig::default());
        assert!(result.budget_exhausted);
        assert!(started.elapsed() < CycleConfig::default().time_budget());
    }
}
