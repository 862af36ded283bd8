use crate::error::{Result, TermClusterError};
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;

/// Symmetric pairwise distances stored as the upper triangle, row by row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CondensedDistances {
    n: usize,
    values: Vec<f64>,
}

impl CondensedDistances {
    /// Wrap condensed values for `n` points; `values` must hold `n * (n - 1) / 2` entries.
    pub fn new(n: usize, values: Vec<f64>) -> Result<Self> {
        let expected = n * n.saturating_sub(1) / 2;
        if values.len() != expected {
            return Err(TermClusterError::Shape(format!(
                "{} condensed distances for {} points, expected {}",
                values.len(),
                n,
                expected
            )));
        }
        if let Some(bad) = values.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(TermClusterError::Numerical(format!("invalid distance {}", bad)));
        }
        Ok(CondensedDistances { n, values })
    }

    /// Number of points.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Distance between points `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.values[self.n * i - i * (i + 1) / 2 + (j - i - 1)]
    }
}

fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Euclidean distance between every pair of rows.
pub fn pairwise_distance(rows: ArrayView2<'_, f64>) -> Result<CondensedDistances> {
    let n = rows.nrows();
    let values: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            ((i + 1)..n)
                .map(|j| euclidean(rows.row(i), rows.row(j)))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    CondensedDistances::new(n, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_pairwise_euclidean() {
        let rows = array![[0.0, 0.0], [3.0, 4.0], [0.0, 1.0]];
        let d = pairwise_distance(rows.view()).unwrap();

        assert_eq!(d.n(), 3);
        assert_eq!(d.values().len(), 3);
        assert_relative_eq!(d.get(0, 1), 5.0, epsilon = 1e-12);
        assert_relative_eq!(d.get(0, 2), 1.0, epsilon = 1e-12);
        assert_relative_eq!(d.get(2, 1), 18.0f64.sqrt(), epsilon = 1e-12);
        assert_eq!(d.get(1, 1), 0.0);
    }

    #[test]
    fn test_condensed_validation() {
        assert!(CondensedDistances::new(3, vec![1.0, 2.0]).is_err());
        assert!(matches!(
            CondensedDistances::new(2, vec![f64::NAN]),
            Err(TermClusterError::Numerical(_))
        ));
        assert!(CondensedDistances::new(1, vec![]).is_ok());
        assert!(CondensedDistances::new(0, vec![]).is_ok());
    }
}
