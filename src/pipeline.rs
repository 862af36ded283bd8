//! End-to-end term clustering: build, aggregate by time, score, cluster.

use crate::aggregation::{AggregationMatrix, Aggregator, Direction};
use crate::cluster::{ClusterAssignment, ClusterEngine, ClusterTree, Linkage};
use crate::error::TermClusterError;
use crate::matrix::builder::DEFAULT_TERM_COLUMN;
use crate::matrix::{AnnotationSource, GroupTermMatrix, GroupTermMatrixBuilder, GroupingSource};
use crate::significance::{DEFAULT_ROUND_DECIMAL, SignificanceMatrix, SignificanceTransformer};
use anyhow::Context;
use single_utilities::traits::FloatOpsTS;
use tracing::info;

/// Parameters of a clustering run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Annotation column supplying the term text.
    pub term_column: String,
    /// Groups with fewer member genes are excluded.
    pub min_size: usize,
    /// Regulation direction aggregated per time point.
    pub direction: Direction,
    /// Largest merge distance allowed inside one flat cluster.
    pub max_distance: f64,
    /// Decimal digits of the significance scores; `None` keeps full precision.
    pub round_decimal: Option<u32>,
    pub linkage: Linkage,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            term_column: DEFAULT_TERM_COLUMN.to_string(),
            min_size: 1,
            direction: Direction::Up,
            max_distance: 0.1,
            round_decimal: Some(DEFAULT_ROUND_DECIMAL),
            linkage: Linkage::Average,
        }
    }
}

impl PipelineConfig {
    pub fn with_term_column(mut self, term_column: impl Into<String>) -> Self {
        self.term_column = term_column.into();
        self
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn with_round_decimal(mut self, round_decimal: Option<u32>) -> Self {
        self.round_decimal = round_decimal;
        self
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn validate(&self) -> Result<(), TermClusterError> {
        if self.term_column.trim().is_empty() {
            return Err(TermClusterError::Configuration("term_column must not be empty".into()));
        }
        if self.min_size == 0 {
            return Err(TermClusterError::Configuration(
                "min_size must be a positive integer".into(),
            ));
        }
        if !(self.max_distance.is_finite() && self.max_distance > 0.0) {
            return Err(TermClusterError::Configuration(format!(
                "max_distance must be a positive number, got {}",
                self.max_distance
            )));
        }
        Ok(())
    }
}

/// Every intermediate and final output of a clustering run.
#[derive(Debug, Clone)]
pub struct ClusterReport<T> {
    pub aggregation: AggregationMatrix<T>,
    pub significance: SignificanceMatrix,
    pub tree: ClusterTree,
    pub assignment: ClusterAssignment,
}

/// Aggregate `matrix` per time point, score the surviving terms and cluster them.
pub fn calc_clusters<T>(matrix: &GroupTermMatrix<T>, config: &PipelineConfig) -> anyhow::Result<ClusterReport<T>>
where
    T: FloatOpsTS,
{
    config.validate()?;

    let aggregation = Aggregator::by_time(config.direction)
        .aggregate(matrix)
        .context("aggregating term counts by time")?;
    let significance = SignificanceTransformer::new(config.round_decimal)
        .transform(&aggregation)
        .context("scoring term significance")?;
    let (tree, assignment) = ClusterEngine::new(config.linkage)
        .cluster(&significance, config.max_distance)
        .context("clustering significance profiles")?;

    info!(
        direction = %config.direction,
        groups = matrix.n_groups(),
        terms = significance.n_terms(),
        clusters = assignment.n_clusters(),
        "clustered terms"
    );

    Ok(ClusterReport {
        aggregation,
        significance,
        tree,
        assignment,
    })
}

/// Build the group-term matrix from external sources, then run [`calc_clusters`].
pub fn run<T, G, A>(grouping: &G, annotations: &A, config: &PipelineConfig) -> anyhow::Result<ClusterReport<T>>
where
    T: FloatOpsTS,
    G: GroupingSource + ?Sized,
    A: AnnotationSource + ?Sized,
{
    config.validate()?;

    let matrix: GroupTermMatrix<T> = GroupTermMatrixBuilder::new()
        .with_term_column(config.term_column.as_str())
        .with_min_size(config.min_size)
        .build(grouping, annotations)
        .context("building group-term matrix")?;
    if matrix.is_empty() {
        return Err(TermClusterError::EmptyInput(
            "no group shares a gene with the annotation source".into(),
        ))
        .context("building group-term matrix");
    }

    calc_clusters(&matrix, config)
}
