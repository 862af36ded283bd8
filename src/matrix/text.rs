//! Conversion of free-text annotations into term intensity rows.

use crate::error::{Result, TermClusterError};
use crate::matrix::{Group, GroupTermMatrix};
use single_utilities::traits::FloatOpsTS;
use std::collections::{BTreeMap, BTreeSet};

/// Turns the annotation text collected for each group into a [`GroupTermMatrix`].
pub trait TermMatrixConverter {
    /// `texts` holds one entry per group with every text fragment attached to it.
    /// Groups are unique and share the vector length `num_times`.
    fn build<T>(&self, texts: &[(Group, Vec<String>)], num_times: usize) -> Result<GroupTermMatrix<T>>
    where
        T: FloatOpsTS;
}

/// Bag-of-terms converter: splits fragments on delimiters and counts each term.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermCountConverter {
    delimiters: Vec<char>,
}

impl Default for TermCountConverter {
    fn default() -> Self {
        TermCountConverter {
            delimiters: vec![';', ',', '|', '\n'],
        }
    }
}

impl TermCountConverter {
    pub fn new(delimiters: Vec<char>) -> Self {
        TermCountConverter { delimiters }
    }

    /// Trimmed, non-empty terms of one fragment.
    pub fn tokenize<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        text.split(move |c: char| self.delimiters.contains(&c))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl TermMatrixConverter for TermCountConverter {
    fn build<T>(&self, texts: &[(Group, Vec<String>)], num_times: usize) -> Result<GroupTermMatrix<T>>
    where
        T: FloatOpsTS,
    {
        let vocabulary: BTreeSet<&str> = texts
            .iter()
            .flat_map(|(_, fragments)| fragments.iter())
            .flat_map(|fragment| self.tokenize(fragment))
            .collect();
        let column_of: BTreeMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, &term)| (term, i))
            .collect();

        let mut rows = Vec::with_capacity(texts.len());
        for (_, fragments) in texts {
            let mut row = vec![T::zero(); column_of.len()];
            for fragment in fragments {
                for term in self.tokenize(fragment) {
                    if let Some(&col) = column_of.get(term) {
                        row[col] += T::one();
                    }
                }
            }
            rows.push(row);
        }

        let groups = texts.iter().map(|(group, _)| group.clone()).collect();
        let terms = vocabulary.iter().map(|t| t.to_string()).collect();
        GroupTermMatrix::from_dense_rows(groups, terms, num_times, rows).map_err(|e| match e {
            TermClusterError::Shape(msg) => TermClusterError::Shape(format!("term conversion: {}", msg)),
            other => other,
        })
    }
}
