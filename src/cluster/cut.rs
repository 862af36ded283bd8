use crate::cluster::linkage::ClusterTree;
use crate::error::{Result, TermClusterError};
use std::collections::HashMap;

/// How a [`ClusterTree`] is cut into flat clusters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CutCriterion {
    /// Keep every subtree whose merges all happen at or below the threshold.
    Distance(f64),
    /// Apply merges in order until this many clusters remain.
    MaxClusters(usize),
}

/// Flat cluster ids per leaf, 1-based, numbered in order of first appearance.
pub fn cut_tree(tree: &ClusterTree, criterion: CutCriterion) -> Result<Vec<usize>> {
    let n = tree.n_leaves();
    let total_nodes = n + tree.len();
    // accepted[node]: the node forms (part of) one flat cluster.
    let mut accepted = vec![false; total_nodes];
    accepted[..n].fill(true);
    let mut parent: Vec<usize> = (0..total_nodes).collect();

    match criterion {
        CutCriterion::Distance(threshold) => {
            if !(threshold.is_finite() && threshold >= 0.0) {
                return Err(TermClusterError::Configuration(format!(
                    "distance threshold must be finite and non-negative, got {}",
                    threshold
                )));
            }
            for (k, merge) in tree.merges().iter().enumerate() {
                let node = n + k;
                if merge.distance <= threshold && accepted[merge.left] && accepted[merge.right] {
                    accepted[node] = true;
                    parent[merge.left] = node;
                    parent[merge.right] = node;
                }
            }
        }
        CutCriterion::MaxClusters(k) => {
            if k == 0 {
                return Err(TermClusterError::Configuration(
                    "max_clusters must be at least 1".into(),
                ));
            }
            for (i, merge) in tree.merges().iter().take(n.saturating_sub(k)).enumerate() {
                let node = n + i;
                accepted[node] = true;
                parent[merge.left] = node;
                parent[merge.right] = node;
            }
        }
    }

    let mut ids: HashMap<usize, usize> = HashMap::new();
    let labels = (0..n)
        .map(|leaf| {
            let mut root = leaf;
            while parent[root] != root {
                root = parent[root];
            }
            let next = ids.len() + 1;
            *ids.entry(root).or_insert(next)
        })
        .collect();
    Ok(labels)
}

/// Term -> flat cluster id, aligned with the clustered matrix's row order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterAssignment {
    terms: Vec<String>,
    ids: Vec<usize>,
}

impl ClusterAssignment {
    pub fn new(terms: Vec<String>, ids: Vec<usize>) -> Result<Self> {
        if terms.len() != ids.len() {
            return Err(TermClusterError::Shape(format!(
                "{} terms for {} cluster ids",
                terms.len(),
                ids.len()
            )));
        }
        if ids.contains(&0) {
            return Err(TermClusterError::Shape("cluster ids must be positive".into()));
        }
        Ok(ClusterAssignment { terms, ids })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Cluster id of `term`.
    pub fn get(&self, term: &str) -> Option<usize> {
        self.terms
            .iter()
            .position(|t| t == term)
            .map(|i| self.ids[i])
    }

    pub fn n_clusters(&self) -> usize {
        let mut distinct = self.ids.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct.len()
    }

    /// Terms carrying cluster id `id`, in row order.
    pub fn members(&self, id: usize) -> Vec<&str> {
        self.terms
            .iter()
            .zip(&self.ids)
            .filter(|&(_, &i)| i == id)
            .map(|(t, _)| t.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.terms.iter().map(String::as_str).zip(self.ids.iter().copied())
    }
}
