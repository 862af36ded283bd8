//! Aggregation of group rows into partition rows.
//!
//! Every partition sums the intensities of all groups its predicate accepts. The
//! partitions are either a caller-supplied predicate list or one partition per time
//! point for a chosen regulation direction; both go through the same code path.

use crate::error::{Result, TermClusterError};
use crate::matrix::GroupTermMatrix;
use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;
use single_utilities::traits::FloatOpsTS;
use tracing::debug;

mod predicate;

pub use predicate::{Direction, PartitionKey, Partitioning, Predicate};

/// Which axis of an [`AggregationMatrix`] holds the partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Rows are partitions, columns are terms.
    PartitionMajor,
    /// Rows are terms, columns are partitions.
    TermMajor,
}

/// Partition × term table of summed intensities.
///
/// The data layout follows [`Orientation`]; the labels do not move when the
/// table is transposed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationMatrix<T> {
    partitions: Vec<PartitionKey>,
    terms: Vec<String>,
    data: Array2<T>,
    orientation: Orientation,
}

impl<T> AggregationMatrix<T>
where
    T: FloatOpsTS,
{
    pub fn new(
        partitions: Vec<PartitionKey>,
        terms: Vec<String>,
        data: Array2<T>,
        orientation: Orientation,
    ) -> Result<Self> {
        let expected = match orientation {
            Orientation::PartitionMajor => (partitions.len(), terms.len()),
            Orientation::TermMajor => (terms.len(), partitions.len()),
        };
        if data.dim() != expected {
            return Err(TermClusterError::Shape(format!(
                "{:?} data has shape {:?}, labels require {:?}",
                orientation,
                data.dim(),
                expected
            )));
        }
        Ok(AggregationMatrix {
            partitions,
            terms,
            data,
            orientation,
        })
    }

    pub fn partitions(&self) -> &[PartitionKey] {
        &self.partitions
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn n_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    fn term_axis(&self) -> Axis {
        match self.orientation {
            Orientation::PartitionMajor => Axis(1),
            Orientation::TermMajor => Axis(0),
        }
    }

    /// Value of `term` (by index) in `partition` (by index), independent of orientation.
    pub fn value(&self, partition: usize, term: usize) -> T {
        match self.orientation {
            Orientation::PartitionMajor => self.data[[partition, term]],
            Orientation::TermMajor => self.data[[term, partition]],
        }
    }

    /// Values of one term across all partitions.
    pub fn term_profile(&self, term: usize) -> ArrayView1<'_, T> {
        self.data.index_axis(self.term_axis(), term)
    }

    /// Swap the data axes and flip the orientation flag.
    pub fn transpose(self) -> Self {
        let orientation = match self.orientation {
            Orientation::PartitionMajor => Orientation::TermMajor,
            Orientation::TermMajor => Orientation::PartitionMajor,
        };
        AggregationMatrix {
            partitions: self.partitions,
            terms: self.terms,
            data: self.data.reversed_axes().as_standard_layout().to_owned(),
            orientation,
        }
    }

    pub fn into_term_major(self) -> Self {
        match self.orientation {
            Orientation::TermMajor => self,
            Orientation::PartitionMajor => self.transpose(),
        }
    }

    pub fn into_partition_major(self) -> Self {
        match self.orientation {
            Orientation::PartitionMajor => self,
            Orientation::TermMajor => self.transpose(),
        }
    }

    /// Keep only the terms at `indices`, in the given order.
    pub fn select_terms(&self, indices: &[usize]) -> Self {
        AggregationMatrix {
            partitions: self.partitions.clone(),
            terms: indices.iter().map(|&i| self.terms[i].clone()).collect(),
            data: self.data.select(self.term_axis(), indices),
            orientation: self.orientation,
        }
    }

    /// Zero every cell below `min_value`, then drop terms left without any non-zero cell.
    pub fn prune(&self, min_value: T) -> Self {
        let clipped = self
            .data
            .mapv(|v| if v < min_value { T::zero() } else { v });
        let axis = self.term_axis();
        let keep: Vec<usize> = clipped
            .axis_iter(axis)
            .enumerate()
            .filter(|(_, profile)| profile.iter().any(|&v| v != T::zero()))
            .map(|(i, _)| i)
            .collect();

        AggregationMatrix {
            partitions: self.partitions.clone(),
            terms: keep.iter().map(|&i| self.terms[i].clone()).collect(),
            data: clipped.select(axis, &keep),
            orientation: self.orientation,
        }
    }

    /// Sum over all partitions, per term.
    pub fn term_totals(&self) -> Vec<T> {
        (0..self.n_terms())
            .map(|t| {
                let mut total = T::zero();
                for &v in self.term_profile(t).iter() {
                    total += v;
                }
                total
            })
            .collect()
    }
}

/// Reduces a [`GroupTermMatrix`] to one row per partition.
#[derive(Debug, Clone)]
pub struct Aggregator {
    partitioning: Partitioning,
}

impl Aggregator {
    pub fn new(partitioning: Partitioning) -> Self {
        Aggregator { partitioning }
    }

    pub fn by_predicates(predicates: Vec<Predicate>) -> Self {
        Self::new(Partitioning::Predicates(predicates))
    }

    pub fn by_time(direction: Direction) -> Self {
        Self::new(Partitioning::TimeDirection(direction))
    }

    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    /// Sum the rows of all groups accepted by each partition.
    ///
    /// Row order follows partition order. Partitions matching no group yield a row
    /// of zeros and the term columns are never dropped.
    pub fn aggregate<T>(&self, matrix: &GroupTermMatrix<T>) -> Result<AggregationMatrix<T>>
    where
        T: FloatOpsTS,
    {
        let partitions = self.partitioning.partitions(matrix.num_times());
        let n_terms = matrix.n_terms();

        let rows: Vec<(Vec<T>, usize)> = partitions
            .par_iter()
            .map(|(_, predicate)| {
                let mut accumulator = vec![T::zero(); n_terms];
                let mut matched = 0;
                for (row, group) in matrix.groups().iter().enumerate() {
                    if !predicate.evaluate(group) {
                        continue;
                    }
                    matched += 1;
                    for (col, value) in matrix.row_entries(row) {
                        accumulator[col] += value;
                    }
                }
                (accumulator, matched)
            })
            .collect();

        for ((key, _), (_, matched)) in partitions.iter().zip(&rows) {
            debug!(partition = %key, groups = matched, "aggregated partition");
        }

        let n_partitions = rows.len();
        let flat: Vec<T> = rows.into_iter().flat_map(|(row, _)| row).collect();
        let data = Array2::from_shape_vec((n_partitions, n_terms), flat)
            .map_err(|e| TermClusterError::Shape(e.to_string()))?;

        AggregationMatrix::new(
            partitions.into_iter().map(|(key, _)| key).collect(),
            matrix.terms().to_vec(),
            data,
            Orientation::PartitionMajor,
        )
    }
}

/// Aggregate `matrix` over `partitioning`.
pub fn aggregate<T>(matrix: &GroupTermMatrix<T>, partitioning: Partitioning) -> Result<AggregationMatrix<T>>
where
    T: FloatOpsTS,
{
    Aggregator::new(partitioning).aggregate(matrix)
}
