use std::collections::BTreeMap;

use crate::config::LegitimacyConfig;
use crate::graph::{AccountNode, TransactionGraph};

use super::types::LegitimacyReason;

/// Classify one account as a likely merchant or payroll account.
///
/// The bulk rules look only at degree. The statistical traps additionally
/// require many distinct counterparties paying (or paid) consistent amounts,
/// measured by the coefficient of variation.
pub fn classify(
    graph: &TransactionGraph,
    node: &AccountNode,
    config: &LegitimacyConfig,
) -> Option<LegitimacyReason> {
    let (in_deg, out_deg) = (node.in_degree(), node.out_degree());

    if in_deg >= config.bulk_degree && out_deg == 0 {
        return Some(LegitimacyReason::MerchantSink);
    }
    if out_deg >= config.bulk_degree && in_deg == 0 {
        return Some(LegitimacyReason::PayrollSource);
    }

    let consistent = |edges: &[usize]| {
        let amounts: Vec<f64> = edges.iter().map(|&t| graph.transaction(t).amount_f64()).collect();
        coefficient_of_variation(&amounts)
            .map(|cv| cv < config.max_coefficient_of_variation)
            .unwrap_or(false)
    };

    if in_deg >= config.trap_degree
        && node.unique_senders.len() >= config.trap_unique_counterparties
        && consistent(&node.incoming)
    {
        return Some(LegitimacyReason::MerchantPattern);
    }
    if out_deg >= config.trap_degree
        && node.unique_receivers.len() >= config.trap_unique_counterparties
        && consistent(&node.outgoing)
    {
        return Some(LegitimacyReason::PayrollPattern);
    }

    None
}

/// Every account the guard clears, keyed by node index.
pub fn identify_legitimate_accounts(
    graph: &TransactionGraph,
    config: &LegitimacyConfig,
) -> BTreeMap<usize, LegitimacyReason> {
    let legitimate: BTreeMap<usize, LegitimacyReason> = graph
        .nodes()
        .iter()
        .enumerate()
        .filter_map(|(idx, node)| classify(graph, node, config).map(|reason| (idx, reason)))
        .collect();

    tracing::info!(accounts = legitimate.len(), "Legitimacy guard classified accounts");
    legitimate
}

/// Population standard deviation over mean. A zero mean counts as no variation.
pub fn coefficient_of_variation(amounts: &[f64]) -> Option<f64> {
    if amounts.is_empty() {
        return None;
    }
    let n = amounts.len() as f64;
    let mean = amounts.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return Some(0.0);
    }
    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean)
}
