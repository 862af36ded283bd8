//! Group-by-term intensity matrices.
//!
//! A [`Group`] is a cluster of correlated genes, identified by its trinary expression
//! direction at every time point. The [`GroupTermMatrix`] attributes annotation terms
//! to groups: rows are groups, columns are terms and every cell is a non-negative
//! intensity. The matrix is stored in CSR form because most groups carry only a small
//! slice of the term vocabulary.

use crate::error::{Result, TermClusterError};
use nalgebra_sparse::CsrMatrix;
use num_traits::Float;
use single_utilities::traits::FloatOpsTS;
use std::collections::HashSet;
use std::fmt;

pub mod builder;
pub mod text;

pub use builder::{AnnotationSource, AnnotationTable, GeneGrouping, GroupTermMatrixBuilder, GroupingSource};
pub use text::{TermCountConverter, TermMatrixConverter};

/// Expression direction of a group at one time point, relative to baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrinaryState {
    Down,
    Unchanged,
    Up,
}

impl TrinaryState {
    /// Numeric encoding: -1, 0 or +1.
    pub fn value(self) -> i8 {
        match self {
            TrinaryState::Down => -1,
            TrinaryState::Unchanged => 0,
            TrinaryState::Up => 1,
        }
    }
}

impl TryFrom<i8> for TrinaryState {
    type Error = TermClusterError;

    fn try_from(value: i8) -> Result<Self> {
        match value {
            -1 => Ok(TrinaryState::Down),
            0 => Ok(TrinaryState::Unchanged),
            1 => Ok(TrinaryState::Up),
            other => Err(TermClusterError::Shape(format!(
                "trinary value must be -1, 0 or 1, got {}",
                other
            ))),
        }
    }
}

/// A group of correlated genes, keyed by its trinary vector over time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    states: Vec<TrinaryState>,
}

impl Group {
    pub fn new(states: Vec<TrinaryState>) -> Self {
        Group { states }
    }

    /// Build a group from its -1/0/+1 encoding.
    pub fn from_values(values: &[i8]) -> Result<Self> {
        let states = values
            .iter()
            .map(|&v| TrinaryState::try_from(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Group { states })
    }

    pub fn states(&self) -> &[TrinaryState] {
        &self.states
    }

    /// State at `time`, or `None` past the end of the vector.
    pub fn state_at(&self, time: usize) -> Option<TrinaryState> {
        self.states.get(time).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, state) in self.states.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", state.value())?;
        }
        write!(f, ")")
    }
}

/// Group × term intensity matrix.
///
/// Invariants checked on construction: one row per distinct group, one column per
/// distinct term, every group vector has `num_times` entries and every stored value is
/// finite and non-negative.
#[derive(Debug, Clone)]
pub struct GroupTermMatrix<T> {
    groups: Vec<Group>,
    terms: Vec<String>,
    num_times: usize,
    data: CsrMatrix<T>,
}

impl<T> GroupTermMatrix<T>
where
    T: FloatOpsTS,
{
    /// Wrap an existing CSR matrix with its row and column labels.
    pub fn from_csr(
        groups: Vec<Group>,
        terms: Vec<String>,
        num_times: usize,
        data: CsrMatrix<T>,
    ) -> Result<Self> {
        if groups.len() != data.nrows() {
            return Err(TermClusterError::Shape(format!(
                "{} group labels for {} matrix rows",
                groups.len(),
                data.nrows()
            )));
        }
        if terms.len() != data.ncols() {
            return Err(TermClusterError::Shape(format!(
                "{} term labels for {} matrix columns",
                terms.len(),
                data.ncols()
            )));
        }

        let mut seen_groups = HashSet::with_capacity(groups.len());
        for group in &groups {
            if group.len() != num_times {
                return Err(TermClusterError::Shape(format!(
                    "group {} has {} time points, expected {}",
                    group,
                    group.len(),
                    num_times
                )));
            }
            if !seen_groups.insert(group) {
                return Err(TermClusterError::Shape(format!("duplicate group {}", group)));
            }
        }

        let mut seen_terms = HashSet::with_capacity(terms.len());
        for term in &terms {
            if !seen_terms.insert(term.as_str()) {
                return Err(TermClusterError::Shape(format!("duplicate term '{}'", term)));
            }
        }

        for &value in data.values() {
            if !Float::is_finite(value) || value < T::zero() {
                return Err(TermClusterError::Shape(format!(
                    "intensities must be finite and non-negative, got {:?}",
                    value.to_f64()
                )));
            }
        }

        Ok(GroupTermMatrix {
            groups,
            terms,
            num_times,
            data,
        })
    }

    /// Build from dense rows, storing only the non-zero cells.
    pub fn from_dense_rows(
        groups: Vec<Group>,
        terms: Vec<String>,
        num_times: usize,
        rows: Vec<Vec<T>>,
    ) -> Result<Self> {
        if rows.len() != groups.len() {
            return Err(TermClusterError::Shape(format!(
                "{} rows for {} groups",
                rows.len(),
                groups.len()
            )));
        }

        let ncols = terms.len();
        let mut row_offsets = Vec::with_capacity(rows.len() + 1);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0);

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(TermClusterError::Shape(format!(
                    "row {} has {} values, expected {}",
                    row_idx,
                    row.len(),
                    ncols
                )));
            }
            for (col, &value) in row.iter().enumerate() {
                if value != T::zero() {
                    col_indices.push(col);
                    values.push(value);
                }
            }
            row_offsets.push(col_indices.len());
        }

        let data = CsrMatrix::try_from_csr_data(rows.len(), ncols, row_offsets, col_indices, values)
            .map_err(|e| TermClusterError::Shape(e.to_string()))?;
        Self::from_csr(groups, terms, num_times, data)
    }

    /// A matrix with no groups over the given vocabulary.
    pub fn empty(terms: Vec<String>, num_times: usize) -> Result<Self> {
        Self::from_dense_rows(Vec::new(), terms, num_times, Vec::new())
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Length of every group's trinary vector.
    pub fn num_times(&self) -> usize {
        self.num_times
    }

    pub fn data(&self) -> &CsrMatrix<T> {
        &self.data
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Non-zero `(term index, intensity)` pairs of one group row.
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let row = self.data.row(row);
        row.col_indices()
            .iter()
            .copied()
            .zip(row.values().iter().copied())
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Intensity of `term` in `group`; zero for absent cells or unknown labels.
    pub fn get(&self, group: &Group, term: &str) -> T {
        let row = self.groups.iter().position(|g| g == group);
        let col = self.terms.iter().position(|t| t == term);
        match (row, col) {
            (Some(row), Some(col)) => self
                .row_entries(row)
                .find(|&(c, _)| c == col)
                .map_or(T::zero(), |(_, v)| v),
            _ => T::zero(),
        }
    }

    /// Sum of every term column over all groups.
    pub fn column_sums(&self) -> Vec<T> {
        let mut sums = vec![T::zero(); self.n_terms()];
        for (_, col, &value) in self.data.triplet_iter() {
            sums[col] += value;
        }
        sums
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(values: &[i8]) -> Group {
        Group::from_values(values).unwrap()
    }

    fn terms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_trinary_round_trip() {
        for v in [-1i8, 0, 1] {
            assert_eq!(TrinaryState::try_from(v).unwrap().value(), v);
        }
        assert!(TrinaryState::try_from(2).is_err());
        assert!(Group::from_values(&[1, -2]).is_err());
    }

    #[test]
    fn test_group_display() {
        assert_eq!(g(&[1, 0, -1]).to_string(), "(1,0,-1)");
        assert_eq!(g(&[]).to_string(), "()");
    }

    #[test]
    fn test_from_dense_rows_keeps_nonzero_cells() {
        let matrix = GroupTermMatrix::from_dense_rows(
            vec![g(&[1, 0]), g(&[0, -1])],
            terms(&["A", "B"]),
            2,
            vec![vec![2.0f64, 0.0], vec![0.5, 1.5]],
        )
        .unwrap();

        assert_eq!(matrix.data().nnz(), 3);
        assert_eq!(matrix.get(&g(&[1, 0]), "A"), 2.0);
        assert_eq!(matrix.get(&g(&[1, 0]), "B"), 0.0);
        assert_eq!(matrix.get(&g(&[0, -1]), "B"), 1.5);
        assert_eq!(matrix.get(&g(&[1, 1]), "A"), 0.0);
        assert_eq!(matrix.column_sums(), vec![2.5, 1.5]);
    }

    #[test]
    fn test_rejects_duplicates_and_bad_values() {
        let dup_group = GroupTermMatrix::from_dense_rows(
            vec![g(&[1]), g(&[1])],
            terms(&["A"]),
            1,
            vec![vec![1.0f64], vec![1.0]],
        );
        assert!(matches!(dup_group, Err(TermClusterError::Shape(_))));

        let dup_term = GroupTermMatrix::from_dense_rows(
            vec![g(&[1])],
            terms(&["A", "A"]),
            1,
            vec![vec![1.0f64, 1.0]],
        );
        assert!(matches!(dup_term, Err(TermClusterError::Shape(_))));

        let negative = GroupTermMatrix::from_dense_rows(
            vec![g(&[1])],
            terms(&["A"]),
            1,
            vec![vec![-1.0f64]],
        );
        assert!(matches!(negative, Err(TermClusterError::Shape(_))));

        let wrong_length = GroupTermMatrix::from_dense_rows(
            vec![g(&[1, 0])],
            terms(&["A"]),
            3,
            vec![vec![1.0f64]],
        );
        assert!(matches!(wrong_length, Err(TermClusterError::Shape(_))));
    }

    #[test]
    fn test_empty_matrix_keeps_vocabulary() {
        let matrix = GroupTermMatrix::<f64>::empty(terms(&["A", "B"]), 3).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.n_terms(), 2);
        assert_eq!(matrix.column_sums(), vec![0.0, 0.0]);
    }
}
