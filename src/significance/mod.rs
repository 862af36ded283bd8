//! Conversion of aggregated term counts into significance scores.
//!
//! Scoring runs term-major: every term's profile across partitions is standardised
//! against its own mean and sample standard deviation, and each cell becomes
//! `-log10` of the two-sided standard-normal tail probability of its z-score.
//! Terms whose profile is constant carry no signal and are filtered out first.

use crate::aggregation::{AggregationMatrix, Orientation, PartitionKey};
use crate::error::{Result, TermClusterError};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use single_utilities::traits::FloatOpsTS;
use statrs::distribution::Normal;
use tracing::debug;

mod tail;

/// Decimal digits significance scores are rounded to unless configured otherwise.
pub const DEFAULT_ROUND_DECIMAL: u32 = 3;

/// Term × partition table of `-log10` significance levels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignificanceMatrix {
    terms: Vec<String>,
    partitions: Vec<PartitionKey>,
    scores: Array2<f64>,
}

impl SignificanceMatrix {
    pub fn new(terms: Vec<String>, partitions: Vec<PartitionKey>, scores: Array2<f64>) -> Result<Self> {
        if scores.dim() != (terms.len(), partitions.len()) {
            return Err(TermClusterError::Shape(format!(
                "scores have shape {:?}, labels require ({}, {})",
                scores.dim(),
                terms.len(),
                partitions.len()
            )));
        }
        Ok(SignificanceMatrix {
            terms,
            partitions,
            scores,
        })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn partitions(&self) -> &[PartitionKey] {
        &self.partitions
    }

    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    /// Always [`Orientation::TermMajor`].
    pub fn orientation(&self) -> Orientation {
        Orientation::TermMajor
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Score profile of the term at `index`.
    pub fn profile(&self, index: usize) -> ArrayView1<'_, f64> {
        self.scores.row(index)
    }

    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.terms.iter().position(|t| t == term)
    }
}

/// True when the profile holds at least two distinct values.
fn has_variance<T: FloatOpsTS>(profile: ArrayView1<'_, T>) -> bool {
    let mut values = profile.iter();
    match values.next() {
        Some(&first) => values.any(|&v| v != first),
        None => false,
    }
}

/// Drop every term whose values are identical across all partitions.
///
/// The result is term-major regardless of the input orientation; surviving terms
/// keep their relative order.
pub fn filter_zero_variance<T>(matrix: &AggregationMatrix<T>) -> AggregationMatrix<T>
where
    T: FloatOpsTS,
{
    let term_major = matrix.clone().into_term_major();
    let keep: Vec<usize> = (0..term_major.n_terms())
        .filter(|&t| has_variance(term_major.term_profile(t)))
        .collect();

    debug!(
        terms = term_major.n_terms(),
        kept = keep.len(),
        "filtered zero-variance terms"
    );
    term_major.select_terms(&keep)
}

/// Round half to even at `decimals` digits.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

fn score_profile(
    normal: &Normal,
    term: &str,
    profile: ArrayView1<'_, f64>,
    round_decimal: Option<u32>,
) -> Result<Vec<f64>> {
    let n = profile.len();
    if n < 2 {
        return Err(TermClusterError::DegenerateInput(format!(
            "term '{}' has {} partition values, at least 2 are required",
            term, n
        )));
    }

    let mean = profile.sum() / n as f64;
    let variance = profile.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();
    if !(std_dev.is_finite() && std_dev > 0.0) {
        return Err(TermClusterError::Numerical(format!(
            "term '{}' has standard deviation {}",
            term, std_dev
        )));
    }

    profile
        .iter()
        .map(|&v| {
            let z = (v - mean) / std_dev;
            // + 0.0 turns -0.0 into 0.0
            let score = -tail::log10_two_sided(normal, z) + 0.0;
            if !score.is_finite() {
                return Err(TermClusterError::Numerical(format!(
                    "term '{}' produced non-finite score for value {}",
                    term, v
                )));
            }
            Ok(match round_decimal {
                Some(d) => round_to(score, d),
                None => score,
            })
        })
        .collect()
}

/// Replace every value of a term-major matrix with its significance score.
///
/// `round_decimal` of `None` keeps full precision.
pub fn significance_score<T>(matrix: &AggregationMatrix<T>, round_decimal: Option<u32>) -> Result<SignificanceMatrix>
where
    T: FloatOpsTS,
{
    if matrix.orientation() != Orientation::TermMajor {
        return Err(TermClusterError::Shape(
            "significance scoring expects a term-major matrix".into(),
        ));
    }

    let values = matrix
        .data()
        .iter()
        .map(|v| {
            v.to_f64()
                .ok_or_else(|| TermClusterError::Numerical("value not representable as f64".into()))
        })
        .collect::<Result<Vec<f64>>>()?;
    let values = Array2::from_shape_vec(matrix.data().dim(), values)
        .map_err(|e| TermClusterError::Shape(e.to_string()))?;

    let normal = Normal::new(0.0, 1.0).map_err(|e| TermClusterError::Numerical(e.to_string()))?;
    let rows: Vec<Vec<f64>> = (0..matrix.n_terms())
        .into_par_iter()
        .map(|t| score_profile(&normal, &matrix.terms()[t], values.row(t), round_decimal))
        .collect::<Result<Vec<_>>>()?;

    let n_partitions = matrix.n_partitions();
    let scores = Array2::from_shape_vec(
        (rows.len(), n_partitions),
        rows.into_iter().flatten().collect(),
    )
    .map_err(|e| TermClusterError::Shape(e.to_string()))?;

    SignificanceMatrix::new(matrix.terms().to_vec(), matrix.partitions().to_vec(), scores)
}

/// Zero-variance filtering followed by significance scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignificanceTransformer {
    round_decimal: Option<u32>,
}

impl Default for SignificanceTransformer {
    fn default() -> Self {
        SignificanceTransformer {
            round_decimal: Some(DEFAULT_ROUND_DECIMAL),
        }
    }
}

impl SignificanceTransformer {
    pub fn new(round_decimal: Option<u32>) -> Self {
        SignificanceTransformer { round_decimal }
    }

    pub fn round_decimal(&self) -> Option<u32> {
        self.round_decimal
    }

    pub fn transform<T>(&self, matrix: &AggregationMatrix<T>) -> Result<SignificanceMatrix>
    where
        T: FloatOpsTS,
    {
        let filtered = filter_zero_variance(matrix);
        if filtered.n_terms() == 0 {
            return Err(TermClusterError::EmptyInput(format!(
                "all {} terms have zero variance across {} partitions",
                matrix.n_terms(),
                matrix.n_partitions()
            )));
        }
        significance_score(&filtered, self.round_decimal)
    }
}
