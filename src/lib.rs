//! # term-clusters
//!
//! Characterises groups of co-expressed genes over a time course by their functional-annotation
//! terms, and clusters those terms by when they are significantly up- or down-regulated.
//!
//! Each gene group carries a trinary vector (down / unchanged / up at every time point). The
//! pipeline attributes annotation terms to groups, sums term intensities over partitions of the
//! groups, converts the sums into `-log10` significance levels and clusters the terms
//! hierarchically by their significance profile over time.
//!
//! ## Core Features
//!
//! - **Group-term matrices**: inner join of gene groupings with gene annotations into a sparse
//!   `CsrMatrix` of term intensities
//! - **Aggregation**: per-time regulation direction or arbitrary group predicates, one code path
//! - **Significance scoring**: zero-variance filtering and two-sided normal tail levels
//! - **Hierarchical clustering**: average/single/complete linkage with distance or cluster-count cuts
//!
//! ## Quick Start
//!
//! Build a [`GroupTermMatrix`](matrix::GroupTermMatrix), then call
//! [`pipeline::calc_clusters`] with a [`PipelineConfig`](pipeline::PipelineConfig), or drive
//! the stages individually through [`Aggregator`](aggregation::Aggregator),
//! [`SignificanceTransformer`](significance::SignificanceTransformer) and
//! [`ClusterEngine`](cluster::ClusterEngine).
//!
//! ## Module Organization
//!
//! - **[`matrix`]**: Groups, trinary states, the group-term matrix and its builder
//! - **[`aggregation`]**: Predicates, partitionings and aggregation matrices
//! - **[`significance`]**: Zero-variance filtering and significance scores
//! - **[`cluster`]**: Pairwise distances, linkage trees and flat cuts
//! - **[`pipeline`]**: Configuration and the end-to-end run

pub mod aggregation;
pub mod cluster;
pub mod error;
pub mod matrix;
pub mod pipeline;
pub mod significance;

pub use error::{Result, TermClusterError};
