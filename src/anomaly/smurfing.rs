use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use chrono::Duration;

use crate::config::SmurfingConfig;
use crate::graph::TransactionGraph;

use super::types::{RingCandidate, RingEvidence};

const TIGHT_VELOCITY_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanDirection {
    Out,
    In,
}

/// How close together an account's two nearest transactions are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VelocityTier {
    None,
    /// Two transactions within the smurfing window (72h by default).
    Window,
    /// Two transactions within 24 hours.
    Tight,
}

/// Scan every account for fan-out bursts, then every account for fan-in bursts.
pub fn detect_smurfing(graph: &TransactionGraph, config: &SmurfingConfig) -> Vec<RingCandidate> {
    let started = Instant::now();
    let window = Duration::hours(config.window_hours);

    let mut rings = Vec::new();
    for direction in [FanDirection::Out, FanDirection::In] {
        for hub in 0..graph.node_count() {
            if let Some(ring) = find_burst(graph, hub, direction, window, config.fan_threshold) {
                rings.push(ring);
            }
        }
    }

    tracing::info!(
        rings = rings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Smurfing detection finished"
    );
    rings
}

/// Find the earliest window in which `hub` deals with at least `threshold`
/// distinct counterparties in one direction.
///
/// The window slides over the hub's time-ordered transactions: the right edge
/// advances one transaction at a time and the left edge retracts while the span
/// exceeds `window`, so both boundaries are inclusive. Once the threshold is
/// hit, the left edge is pulled in as far as the distinct count allows and
/// that minimal window becomes the ring.
pub fn find_burst(
    graph: &TransactionGraph,
    hub: usize,
    direction: FanDirection,
    window: Duration,
    threshold: usize,
) -> Option<RingCandidate> {
    let node = graph.node(hub);
    let (edges, distinct) = match direction {
        FanDirection::Out => (&node.outgoing, &node.unique_receivers),
        FanDirection::In => (&node.incoming, &node.unique_senders),
    };
    if distinct.iter().filter(|&&peer| peer != hub).count() < threshold {
        return None;
    }

    // (transaction index, counterparty node index), already time-ordered
    let flow: Vec<(usize, usize)> = edges
        .iter()
        .filter_map(|&t| {
            let txn = graph.transaction(t);
            let peer = match direction {
                FanDirection::Out => &txn.receiver,
                FanDirection::In => &txn.sender,
            };
            let peer = graph.index_of(peer)?;
            (peer != hub).then_some((t, peer))
        })
        .collect();

    let at = |pos: usize| graph.transaction(flow[pos].0).timestamp;
    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut left = 0;

    for right in 0..flow.len() {
        *counts.entry(flow[right].1).or_insert(0) += 1;

        while at(right) - at(left) > window {
            release(&mut counts, flow[left].1);
            left += 1;
        }

        if counts.len() >= threshold {
            while counts.get(&flow[left].1).copied().unwrap_or(0) > 1 {
                release(&mut counts, flow[left].1);
                left += 1;
            }

            let burst = &flow[left..=right];
            let members: BTreeSet<usize> = burst
                .iter()
                .map(|&(_, peer)| peer)
                .chain(std::iter::once(hub))
                .collect();
            let (window_start, window_end) = (at(left), at(right));
            let evidence = match direction {
                FanDirection::Out => RingEvidence::FanOut {
                    hub,
                    window_start,
                    window_end,
                },
                FanDirection::In => RingEvidence::FanIn {
                    hub,
                    window_start,
                    window_end,
                },
            };

            tracing::debug!(
                hub = graph.account(hub),
                direction = ?direction,
                counterparties = members.len() - 1,
                "Smurfing burst found"
            );

            return Some(RingCandidate {
                members: members.into_iter().collect(),
                transactions: burst.iter().map(|&(t, _)| t).collect(),
                evidence,
            });
        }
    }

    None
}

fn release(counts: &mut HashMap<usize, usize>, peer: usize) {
    if let Some(count) = counts.get_mut(&peer) {
        *count -= 1;
        if *count == 0 {
            counts.remove(&peer);
        }
    }
}

/// Velocity of an account across everything it sent or received, independent
/// of whether any fan threshold was reached.
pub fn velocity_tier(graph: &TransactionGraph, account: usize, window: Duration) -> VelocityTier {
    let stamps = graph.activity_timestamps(account);
    let Some(closest) = stamps.windows(2).map(|pair| pair[1] - pair[0]).min() else {
        return VelocityTier::None;
    };

    if closest <= Duration::hours(TIGHT_VELOCITY_HOURS) {
        VelocityTier::Tight
    } else if closest <= window {
        VelocityTier::Window
    } else {
        VelocityTier::None
    }
}
