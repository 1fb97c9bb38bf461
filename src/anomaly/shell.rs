use std::collections::BTreeSet;
use std::time::Instant;

use crate::config::ShellConfig;
use crate::graph::cluster::merge_overlapping;
use crate::graph::TransactionGraph;

use super::types::{RingCandidate, RingEvidence};

/// DFS state for walking chains out of one origin.
struct ChainWalk<'g, 'a> {
    graph: &'g TransactionGraph<'a>,
    is_shell: &'g [bool],
    min_hops: usize,
    max_hops: usize,
    path: Vec<usize>,
    on_path: Vec<bool>,
    chains: Vec<Vec<usize>>,
}

impl<'g, 'a> ChainWalk<'g, 'a> {
    /// Shell intermediates on the current path, excluding the origin.
    fn hops(&self) -> usize {
        self.path.len() - 1
    }

    fn walk(&mut self, current: usize) {
        let graph = self.graph;
        for next in graph.successors(current) {
            // Revisiting the path is a loop, not a chain.
            if self.on_path[next] {
                continue;
            }

            if !self.is_shell[next] {
                if self.hops() >= self.min_hops {
                    let mut chain = self.path.clone();
                    chain.push(next);
                    self.chains.push(chain);
                }
                continue;
            }

            self.path.push(next);
            self.on_path[next] = true;

            let dead_end = graph.successors(next).next().is_none();
            if dead_end || self.hops() >= self.max_hops {
                // `next` ends the chain; it is an endpoint, not an intermediate.
                if self.hops() - 1 >= self.min_hops {
                    self.chains.push(self.path.clone());
                }
            } else {
                self.walk(next);
            }

            self.on_path[next] = false;
            self.path.pop();
        }
    }
}

/// Find chains of low-activity accounts relaying funds between two endpoints.
///
/// Walks start only at non-shell accounts and continue only through shell
/// candidates (total degree at or below `max_shell_degree`). A chain needs at
/// least `min_shell_hops` shell intermediates and ends at a non-shell account,
/// a shell account with no onward transfers, or the depth bound. Chains that
/// share two or more accounts are unioned into one ring.
pub fn detect_shell_chains(graph: &TransactionGraph, config: &ShellConfig) -> Vec<RingCandidate> {
    let started = Instant::now();
    let is_shell: Vec<bool> = graph
        .nodes()
        .iter()
        .map(|n| n.total_degree() <= config.max_shell_degree)
        .collect();

    let mut walker = ChainWalk {
        graph,
        is_shell: &is_shell,
        min_hops: config.min_shell_hops,
        max_hops: config.max_chain_hops,
        path: Vec::new(),
        on_path: vec![false; graph.node_count()],
        chains: Vec::new(),
    };

    for origin in (0..graph.node_count()).filter(|&n| !is_shell[n]) {
        walker.path.push(origin);
        walker.on_path[origin] = true;
        walker.walk(origin);
        walker.on_path[origin] = false;
        walker.path.pop();
    }

    let chains = walker.chains;
    let rings: Vec<RingCandidate> = merge_overlapping(&chains)
        .into_iter()
        .map(|cluster| {
            let grouped: Vec<Vec<usize>> = cluster.into_iter().map(|c| chains[c].clone()).collect();
            chain_ring(graph, grouped)
        })
        .collect();

    tracing::info!(
        shell_candidates = is_shell.iter().filter(|s| **s).count(),
        chains = chains.len(),
        rings = rings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Shell chain detection finished"
    );
    rings
}

fn chain_ring(graph: &TransactionGraph, chains: Vec<Vec<usize>>) -> RingCandidate {
    let mut members = BTreeSet::new();
    let mut transactions = BTreeSet::new();
    for chain in &chains {
        members.extend(chain.iter().copied());
        for hop in chain.windows(2) {
            transactions.extend(graph.edges_between(hop[0], hop[1]));
        }
    }
    RingCandidate {
        members: members.into_iter().collect(),
        transactions,
        evidence: RingEvidence::LayeredShell { chains },
    }
}
