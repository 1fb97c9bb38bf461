use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;

use crate::anomaly::smurfing::{velocity_tier, VelocityTier};
use crate::anomaly::{LegitimacyReason, PatternType, RingCandidate, RingEvidence};
use crate::config::AnalysisConfig;
use crate::graph::TransactionGraph;

const RAPID_LAYERING_HOURS: i64 = 24;
const MAX_SCORE: u32 = 100;

/// Accumulated suspicion for one account that belongs to at least one ring.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountScore {
    pub score: u8,
    pub patterns: BTreeSet<PatternType>,
    pub ring_ids: BTreeSet<String>,
    pub velocity: VelocityTier,
    pub rapid_layering: bool,
    pub legitimacy: Option<LegitimacyReason>,
    /// Lengths of the simple cycles the account closes.
    pub cycle_lengths: BTreeSet<usize>,
}

impl AccountScore {
    /// Secondary tags behind the score: `cycle_length_N`, `high_velocity`,
    /// `rapid_layering`.
    pub fn flags(&self) -> Vec<String> {
        let mut flags: Vec<String> = self
            .cycle_lengths
            .iter()
            .map(|len| format!("cycle_length_{len}"))
            .collect();
        if self.velocity != VelocityTier::None {
            flags.push("high_velocity".to_string());
        }
        if self.rapid_layering {
            flags.push("rapid_layering".to_string());
        }
        flags
    }
}

/// Score every ring member.
///
/// Each pattern family counts once per account however many rings of that
/// family it sits in. The sum is capped at 100 before the legitimacy penalty
/// is subtracted, and the result never drops below 0.
pub fn score_accounts<'r>(
    graph: &TransactionGraph,
    rings: impl IntoIterator<Item = (&'r str, &'r RingCandidate)>,
    legitimate: &BTreeMap<usize, LegitimacyReason>,
    config: &AnalysisConfig,
) -> BTreeMap<usize, AccountScore> {
    let mut scores: BTreeMap<usize, AccountScore> = BTreeMap::new();
    let window = Duration::hours(config.smurfing.window_hours);

    for (ring_id, ring) in rings {
        let pattern = ring.pattern_type();
        let rapid = pattern == PatternType::LayeredShell && is_rapid_layering(graph, ring);
        for &member in &ring.members {
            let entry = scores.entry(member).or_insert_with(|| AccountScore {
                score: 0,
                patterns: BTreeSet::new(),
                ring_ids: BTreeSet::new(),
                velocity: velocity_tier(graph, member, window),
                rapid_layering: false,
                legitimacy: legitimate.get(&member).copied(),
                cycle_lengths: BTreeSet::new(),
            });
            if let RingEvidence::Cycle { cycles } = &ring.evidence {
                entry
                    .cycle_lengths
                    .extend(cycles.iter().filter(|c| c.contains(&member)).map(Vec::len));
            }
            entry.patterns.insert(pattern);
            entry.ring_ids.insert(ring_id.to_string());
            entry.rapid_layering |= rapid;
        }
    }

    for entry in scores.values_mut() {
        entry.score = final_score(entry, config);
    }
    scores
}

fn final_score(entry: &AccountScore, config: &AnalysisConfig) -> u8 {
    let weights = &config.scoring;
    let has = |p: PatternType| entry.patterns.contains(&p);

    let velocity = match entry.velocity {
        VelocityTier::Tight => weights.velocity_24h,
        VelocityTier::Window => weights.velocity_72h,
        VelocityTier::None => 0,
    };
    let raw = [
        (has(PatternType::Cycle), weights.cycle),
        (has(PatternType::FanOut) || has(PatternType::FanIn), weights.smurfing),
        (has(PatternType::LayeredShell), weights.shell),
        (entry.rapid_layering, weights.rapid_layering),
        (true, velocity),
    ]
    .into_iter()
    .filter(|(hit, _)| *hit)
    .fold(0u32, |acc, (_, weight)| acc.saturating_add(weight));

    let mut score = raw.min(MAX_SCORE);
    if entry.legitimacy.is_some() {
        score = score.saturating_sub(config.legitimacy.penalty);
    }
    score as u8
}

/// A ring moves money rapidly when every consecutive pair of its
/// transactions, in time order, is less than 24 hours apart.
pub fn is_rapid_layering(graph: &TransactionGraph, ring: &RingCandidate) -> bool {
    let mut stamps: Vec<_> = ring
        .transactions
        .iter()
        .map(|&t| graph.transaction(t).timestamp)
        .collect();
    if stamps.len() < 2 {
        return false;
    }
    stamps.sort();
    let limit = Duration::hours(RAPID_LAYERING_HOURS);
    stamps.windows(2).all(|pair| pair[1] - pair[0] < limit)
}

/// A ring's risk is the highest final score among its members.
pub fn ring_risk(ring: &RingCandidate, scores: &BTreeMap<usize, AccountScore>) -> u8 {
    ring.members
        .iter()
        .filter_map(|m| scores.get(m).map(|s| s.score))
        .max()
        .unwrap_or(0)
}
