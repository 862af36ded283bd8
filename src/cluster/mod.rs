//! Hierarchical clustering of terms by their significance profiles.
//!
//! Terms are compared by the Euclidean distance between their score rows,
//! merged bottom-up into a [`ClusterTree`], and the tree is cut at a maximum
//! merge distance into a flat [`ClusterAssignment`].
//!
//! The tree is an arena: nodes are plain integer ids, leaves first, and every
//! merge appends one node.

use crate::error::{Result, TermClusterError};
use crate::significance::SignificanceMatrix;
use tracing::debug;

mod cut;
mod distance;
mod linkage;

pub use cut::{ClusterAssignment, CutCriterion, cut_tree};
pub use distance::{CondensedDistances, pairwise_distance};
pub use linkage::{ClusterTree, Linkage, Merge, linkage};

/// Distance computation, linkage and flat cut in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterEngine {
    linkage: Linkage,
}

impl ClusterEngine {
    pub fn new(linkage: Linkage) -> Self {
        ClusterEngine { linkage }
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Cluster the rows of `matrix` and cut the tree at `max_distance`.
    ///
    /// Terms in one flat cluster were never merged above `max_distance`.
    pub fn cluster(
        &self,
        matrix: &SignificanceMatrix,
        max_distance: f64,
    ) -> Result<(ClusterTree, ClusterAssignment)> {
        if matrix.n_terms() < 2 {
            return Err(TermClusterError::DegenerateInput(format!(
                "clustering needs at least 2 terms, got {}",
                matrix.n_terms()
            )));
        }
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(TermClusterError::Configuration(format!(
                "max_distance must be a positive number, got {}",
                max_distance
            )));
        }

        let distances = pairwise_distance(matrix.scores().view())?;
        let tree = linkage(&distances, self.linkage)?;
        let ids = cut_tree(&tree, CutCriterion::Distance(max_distance))?;
        let assignment = ClusterAssignment::new(matrix.terms().to_vec(), ids)?;

        debug!(
            terms = matrix.n_terms(),
            clusters = assignment.n_clusters(),
            max_distance,
            "cut cluster tree"
        );
        Ok((tree, assignment))
    }
}

/// Average-linkage clustering of `matrix` cut at `max_distance`.
pub fn cluster(matrix: &SignificanceMatrix, max_distance: f64) -> Result<(ClusterTree, ClusterAssignment)> {
    ClusterEngine::default().cluster(matrix, max_distance)
}
