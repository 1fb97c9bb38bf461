use std::collections::{BTreeMap, BTreeSet, HashMap};

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use crate::ledger::{Transaction, TransactionStore};

/// Per-account aggregates, derived once per run.
///
/// `incoming`/`outgoing` hold transaction indices into the store, ordered by
/// timestamp with ties broken by transaction id. Counterparty sets hold node
/// indices.
#[derive(Debug)]
pub struct AccountNode {
    pub id: String,
    pub incoming: Vec<usize>,
    pub outgoing: Vec<usize>,
    /// `outgoing` grouped by receiver node, same order within each receiver.
    pub transfers_to: BTreeMap<usize, Vec<usize>>,
    pub total_in_volume: BigDecimal,
    pub total_out_volume: BigDecimal,
    pub unique_senders: BTreeSet<usize>,
    pub unique_receivers: BTreeSet<usize>,
}

impl AccountNode {
    fn new(id: String) -> Self {
        Self {
            id,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            transfers_to: BTreeMap::new(),
            total_in_volume: BigDecimal::zero(),
            total_out_volume: BigDecimal::zero(),
            unique_senders: BTreeSet::new(),
            unique_receivers: BTreeSet::new(),
        }
    }

    pub fn in_degree(&self) -> usize {
        self.incoming.len()
    }

    pub fn out_degree(&self) -> usize {
        self.outgoing.len()
    }

    pub fn total_degree(&self) -> usize {
        self.in_degree() + self.out_degree()
    }
}

/// All transfers between one ordered pair of accounts, collapsed for display.
#[derive(Debug, Clone)]
pub struct AggregatedEdge {
    pub source: usize,
    pub target: usize,
    pub transfer_count: usize,
    pub total_amount: BigDecimal,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Directed multigraph over a transaction store: accounts are nodes, every
/// transaction is an edge. Read-only once built.
///
/// Node indices follow the lexicographic order of account ids, so iteration
/// order (and everything derived from it) is deterministic.
#[derive(Debug)]
pub struct TransactionGraph<'a> {
    store: &'a TransactionStore,
    nodes: Vec<AccountNode>,
    index: HashMap<String, usize>,
}

impl<'a> TransactionGraph<'a> {
    /// Build the graph. The store has already rejected blank account ids.
    pub fn build(store: &'a TransactionStore) -> Self {
        let ids: BTreeSet<&str> = store
            .transactions()
            .iter()
            .flat_map(|t| [t.sender.as_str(), t.receiver.as_str()])
            .collect();

        let mut nodes: Vec<AccountNode> = ids.iter().map(|id| AccountNode::new(id.to_string())).collect();
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.to_string(), idx))
            .collect();

        for (tx_idx, t) in store.transactions().iter().enumerate() {
            let s = index[t.sender.as_str()];
            let r = index[t.receiver.as_str()];

            let sender = &mut nodes[s];
            sender.outgoing.push(tx_idx);
            sender.total_out_volume += &t.amount;
            sender.unique_receivers.insert(r);

            let receiver = &mut nodes[r];
            receiver.incoming.push(tx_idx);
            receiver.total_in_volume += &t.amount;
            receiver.unique_senders.insert(s);
        }

        let txs = store.transactions();
        let chronological = |a: &usize, b: &usize| {
            let (ta, tb) = (&txs[*a], &txs[*b]);
            ta.timestamp.cmp(&tb.timestamp).then_with(|| ta.id.cmp(&tb.id))
        };
        for node in &mut nodes {
            node.incoming.sort_by(chronological);
            node.outgoing.sort_by(chronological);
            for &t in &node.outgoing {
                let receiver = index[txs[t].receiver.as_str()];
                node.transfers_to.entry(receiver).or_default().push(t);
            }
        }

        tracing::debug!(
            accounts = nodes.len(),
            transactions = store.len(),
            "Transaction graph built"
        );

        Self { store, nodes, index }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.store.len()
    }

    pub fn nodes(&self) -> &[AccountNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &AccountNode {
        &self.nodes[idx]
    }

    pub fn index_of(&self, account: &str) -> Option<usize> {
        self.index.get(account).copied()
    }

    pub fn account(&self, idx: usize) -> &str {
        &self.nodes[idx].id
    }

    pub fn transaction(&self, tx_idx: usize) -> &Transaction {
        &self.store.transactions()[tx_idx]
    }

    /// Distinct successors of `idx`, excluding the node itself.
    pub fn successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[idx]
            .unique_receivers
            .iter()
            .copied()
            .filter(move |&r| r != idx)
    }

    /// Transaction indices of every transfer `from -> to`.
    pub fn edges_between(&self, from: usize, to: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[from]
            .transfers_to
            .get(&to)
            .into_iter()
            .flatten()
            .copied()
    }

    /// Timestamps of all transactions an account sent or received, ascending.
    /// A self-loop is one transaction and contributes one timestamp.
    pub fn activity_timestamps(&self, idx: usize) -> Vec<DateTime<Utc>> {
        let node = &self.nodes[idx];
        let sent = node
            .outgoing
            .iter()
            .filter(|&&t| !self.transaction(t).is_self_loop());
        let mut stamps: Vec<DateTime<Utc>> = node
            .incoming
            .iter()
            .chain(sent)
            .map(|&t| self.transaction(t).timestamp)
            .collect();
        stamps.sort();
        stamps
    }

    /// Collapse parallel edges into one aggregate per (source, target), ordered by pair.
    pub fn aggregated_edges(&self) -> Vec<AggregatedEdge> {
        let mut edge_map: BTreeMap<(usize, usize), AggregatedEdge> = BTreeMap::new();
        for t in self.store.transactions() {
            let key = (self.index[t.sender.as_str()], self.index[t.receiver.as_str()]);
            let entry = edge_map.entry(key).or_insert_with(|| AggregatedEdge {
                source: key.0,
                target: key.1,
                transfer_count: 0,
                total_amount: BigDecimal::zero(),
                first_seen: t.timestamp,
                last_seen: t.timestamp,
            });
            entry.transfer_count += 1;
            entry.total_amount += &t.amount;
            if t.timestamp < entry.first_seen {
                entry.first_seen = t.timestamp;
            }
            if t.timestamp > entry.last_seen {
                entry.last_seen = t.timestamp;
            }
        }
        edge_map.into_values().collect()
    }
}
