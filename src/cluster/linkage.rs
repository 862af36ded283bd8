use crate::cluster::distance::CondensedDistances;
use crate::error::{Result, TermClusterError};
use tracing::debug;

/// Linkage criterion for agglomerative clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Linkage {
    Single,
    Complete,
    #[default]
    Average,
}

/// One merge of two existing nodes.
///
/// Leaves are nodes `0..n`; the node created by merge `k` has id `n + k`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Merge {
    /// Smaller id of the two merged nodes.
    pub left: usize,
    /// Larger id of the two merged nodes.
    pub right: usize,
    pub distance: f64,
    /// Number of leaves under the new node.
    pub size: usize,
}

/// Ordered merge history of an agglomerative clustering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterTree {
    n_leaves: usize,
    merges: Vec<Merge>,
}

impl ClusterTree {
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    pub fn len(&self) -> usize {
        self.merges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merges.is_empty()
    }

    /// Id of the root node, once all leaves are merged.
    pub fn root(&self) -> Option<usize> {
        if self.n_leaves == 0 {
            return None;
        }
        Some(self.n_leaves + self.merges.len() - 1)
    }

    /// The two children of an internal node.
    pub fn children(&self, node: usize) -> Option<(usize, usize)> {
        node.checked_sub(self.n_leaves)
            .and_then(|k| self.merges.get(k))
            .map(|m| (m.left, m.right))
    }

    /// Leaves in dendrogram order, left subtree first.
    pub fn leaf_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.n_leaves);
        let Some(root) = self.root() else {
            return order;
        };
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match self.children(node) {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => order.push(node),
            }
        }
        order
    }
}

/// Agglomerative clustering over a condensed distance set.
///
/// Each step merges the closest pair of active clusters. Ties go to the pair with
/// the lexicographically smallest `(left, right)` node ids, so identical inputs
/// always produce identical trees.
pub fn linkage(distances: &CondensedDistances, method: Linkage) -> Result<ClusterTree> {
    let n = distances.n();
    if n < 2 {
        return Err(TermClusterError::DegenerateInput(format!(
            "clustering needs at least 2 elements, got {}",
            n
        )));
    }

    // Slot-indexed working matrix; slot s holds node `node_of[s]`.
    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = distances.get(i, j);
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }
    let mut node_of: Vec<usize> = (0..n).collect();
    let mut size_of = vec![1usize; n];
    // Active slots, kept sorted by node id.
    let mut active: Vec<usize> = (0..n).collect();
    let mut merges = Vec::with_capacity(n - 1);

    while active.len() > 1 {
        let mut best_dist = f64::INFINITY;
        let mut best = (active[0], active[1]);
        for (ai, &a) in active.iter().enumerate() {
            for &b in &active[ai + 1..] {
                if dist[a][b] < best_dist {
                    best_dist = dist[a][b];
                    best = (a, b);
                }
            }
        }
        let (a, b) = best;
        let size_a = size_of[a] as f64;
        let size_b = size_of[b] as f64;

        for &c in &active {
            if c == a || c == b {
                continue;
            }
            let d_ac = dist[a][c];
            let d_bc = dist[b][c];
            let new_d = match method {
                Linkage::Single => d_ac.min(d_bc),
                Linkage::Complete => d_ac.max(d_bc),
                Linkage::Average => (d_ac * size_a + d_bc * size_b) / (size_a + size_b),
            };
            dist[a][c] = new_d;
            dist[c][a] = new_d;
        }

        let merged = Merge {
            left: node_of[a].min(node_of[b]),
            right: node_of[a].max(node_of[b]),
            distance: best_dist,
            size: size_of[a] + size_of[b],
        };
        debug!(
            left = merged.left,
            right = merged.right,
            distance = merged.distance,
            size = merged.size,
            "merged clusters"
        );

        // The new node has the largest id so far and moves to the end of `active`.
        node_of[a] = n + merges.len();
        size_of[a] = merged.size;
        merges.push(merged);
        active.retain(|&s| s != a && s != b);
        active.push(a);
    }

    Ok(ClusterTree { n_leaves: n, merges })
}
