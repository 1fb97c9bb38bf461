use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Disjoint sets over group indices. Every set is a tree rooted at its
/// representative; `size` is only meaningful at roots.
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(count: usize) -> Self {
        Self {
            parent: (0..count).collect(),
            size: vec![1; count],
        }
    }

    /// Representative of `group`. Each visited node is relinked to its
    /// grandparent on the way up.
    fn find(&mut self, mut group: usize) -> usize {
        while self.parent[group] != group {
            let grandparent = self.parent[self.parent[group]];
            self.parent[group] = grandparent;
            group = grandparent;
        }
        group
    }

    /// Join the sets holding `a` and `b`; the smaller tree hangs off the larger.
    fn union(&mut self, a: usize, b: usize) {
        let (mut big, mut small) = (self.find(a), self.find(b));
        if big == small {
            return;
        }
        if self.size[big] < self.size[small] {
            std::mem::swap(&mut big, &mut small);
        }
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}

/// Group member sets that share at least two members.
///
/// Two sets share two members exactly when they share an unordered member
/// pair, so each set is keyed by its pairs and unioned with the first set that
/// claimed the same pair. Grouping is transitive.
///
/// Returns clusters of indices into `groups`. Each cluster is ascending and
/// clusters are ordered by their first index.
pub fn merge_overlapping(groups: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(groups.len());
    let mut pair_owner: HashMap<(usize, usize), usize> = HashMap::new();

    for (g, members) in groups.iter().enumerate() {
        let mut sorted = members.clone();
        sorted.sort_unstable();
        sorted.dedup();
        for i in 0..sorted.len() {
            for j in (i + 1)..sorted.len() {
                match pair_owner.entry((sorted[i], sorted[j])) {
                    Entry::Occupied(owner) => uf.union(*owner.get(), g),
                    Entry::Vacant(slot) => {
                        slot.insert(g);
                    }
                }
            }
        }
    }

    let mut root_to_cluster: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for g in 0..groups.len() {
        let root = uf.find(g);
        let pos = *root_to_cluster.entry(root).or_insert_with(|| {
            clusters.push(Vec::new());
            clusters.len() - 1
        });
        clusters[pos].push(g);
    }

    tracing::trace!(
        groups = groups.len(),
        clusters = clusters.len(),
        "Merged overlapping groups"
    );

    clusters
}
