// cluster.rs - Single-linkage transmission clusters from a distance matrix

use crate::core::matrix::DistanceMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Disjoint sets over `0..n` with path compression and union by rank
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets holding `i` and `j`; false if already joined
    pub fn union(&mut self, i: usize, j: usize) -> bool {
        let (pi, pj) = (self.find(i), self.find(j));
        if pi == pj {
            return false;
        }
        match self.rank[pi].cmp(&self.rank[pj]) {
            std::cmp::Ordering::Less => self.parent[pi] = pj,
            std::cmp::Ordering::Greater => self.parent[pj] = pi,
            std::cmp::Ordering::Equal => {
                self.parent[pj] = pi;
                self.rank[pi] += 1;
            }
        }
        true
    }
}

/// Sample id -> cluster id for one threshold.
///
/// Cluster ids start at 1 and follow the lexicographically smallest member
/// of each cluster, so identical input always yields identical ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    threshold: f64,
    samples: Vec<String>,
    /// Cluster id per sample, aligned with `samples`
    cluster_ids: Vec<usize>,
    /// Member indices per cluster, index 0 is cluster 1
    members: Vec<Vec<usize>>,
    /// False when only candidate pairs were compared
    exhaustive: bool,
}

impl ClusterAssignment {
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Whether every pair was compared. When not, a singleton may only mean
    /// its pairs were never computed.
    pub fn is_exhaustive(&self) -> bool {
        self.exhaustive
    }

    pub fn n_clusters(&self) -> usize {
        self.members.len()
    }

    pub fn cluster_of(&self, sample: &str) -> Option<usize> {
        let i = self.samples.binary_search_by(|s| s.as_str().cmp(sample)).ok()?;
        Some(self.cluster_ids[i])
    }

    /// Members of a cluster in sample order
    pub fn members(&self, cluster_id: usize) -> Option<Vec<&str>> {
        let members = self.members.get(cluster_id.checked_sub(1)?)?;
        Some(members.iter().map(|&i| self.samples[i].as_str()).collect())
    }

    /// (cluster id, members) in cluster id order
    pub fn clusters(&self) -> impl Iterator<Item = (usize, Vec<&str>)> {
        self.members.iter().enumerate().map(move |(k, members)| {
            (k + 1, members.iter().map(|&i| self.samples[i].as_str()).collect())
        })
    }

    /// (sample, cluster id) in sample order
    pub fn assignments(&self) -> impl Iterator<Item = (&str, usize)> {
        self.samples
            .iter()
            .zip(&self.cluster_ids)
            .map(|(s, &c)| (s.as_str(), c))
    }

    pub fn singletons(&self) -> usize {
        self.members.iter().filter(|m| m.len() == 1).count()
    }
}

/// Group samples whose valid distance is within `threshold` (inclusive),
/// transitively. Samples with no qualifying link are singletons.
pub fn cluster(matrix: &DistanceMatrix, threshold: f64) -> ClusterAssignment {
    let n = matrix.len();
    let mut sets = UnionFind::new(n);

    let mut links = 0usize;
    for (i, j, record) in matrix.records() {
        if record.links_at(threshold) {
            sets.union(i, j);
            links += 1;
        }
    }

    // samples are sorted, so the first index seen for a root is its smallest member
    let mut root_to_cluster: HashMap<usize, usize> = HashMap::new();
    let mut cluster_ids = Vec::with_capacity(n);
    let mut members: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = sets.find(i);
        let id = *root_to_cluster.entry(root).or_insert_with(|| {
            members.push(Vec::new());
            members.len()
        });
        members[id - 1].push(i);
        cluster_ids.push(id);
    }

    let assignment = ClusterAssignment {
        threshold,
        samples: matrix.samples().to_vec(),
        cluster_ids,
        members,
        exhaustive: matrix.is_exhaustive(),
    };

    info!(
        "🔗 Clustering at threshold {}: {} links, {} clusters ({} singletons)",
        threshold,
        links,
        assignment.n_clusters(),
        assignment.singletons()
    );
    assignment
}
