//! Joins gene groupings with gene annotations to build the group-term matrix.

use crate::error::{Result, TermClusterError};
use crate::matrix::{Group, GroupTermMatrix, TermCountConverter, TermMatrixConverter};
use single_utilities::traits::FloatOpsTS;
use std::collections::HashMap;
use tracing::debug;

/// Default annotation column holding the term text.
pub const DEFAULT_TERM_COLUMN: &str = "term";

/// Source of gene-to-group memberships.
pub trait GroupingSource {
    /// Length of every group's trinary vector.
    fn num_times(&self) -> usize;

    /// `(gene, group)` pairs for every group with at least `min_size` member genes.
    fn memberships(&self, min_size: usize) -> Vec<(String, Group)>;
}

/// Source of text annotations per gene, organised in named columns.
pub trait AnnotationSource {
    fn has_column(&self, column: &str) -> bool;

    /// Text entries of `column` attached to `gene`; empty when the gene is unannotated.
    fn annotations(&self, column: &str, gene: &str) -> &[String];
}

/// In-memory gene grouping.
#[derive(Debug, Clone, Default)]
pub struct GeneGrouping {
    num_times: usize,
    genes: Vec<(String, Group)>,
}

impl GeneGrouping {
    pub fn new(num_times: usize) -> Self {
        GeneGrouping {
            num_times,
            genes: Vec::new(),
        }
    }

    /// Assign `gene` to `group`. A gene belongs to exactly one group.
    pub fn insert(&mut self, gene: impl Into<String>, group: Group) -> Result<()> {
        let gene = gene.into();
        if group.len() != self.num_times {
            return Err(TermClusterError::Shape(format!(
                "gene '{}' has {} time points, expected {}",
                gene,
                group.len(),
                self.num_times
            )));
        }
        if self.genes.iter().any(|(g, _)| *g == gene) {
            return Err(TermClusterError::Shape(format!("gene '{}' is already grouped", gene)));
        }
        self.genes.push((gene, group));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Number of member genes of every group.
    pub fn group_sizes(&self) -> HashMap<&Group, usize> {
        let mut sizes = HashMap::new();
        for (_, group) in &self.genes {
            *sizes.entry(group).or_insert(0) += 1;
        }
        sizes
    }
}

impl GroupingSource for GeneGrouping {
    fn num_times(&self) -> usize {
        self.num_times
    }

    fn memberships(&self, min_size: usize) -> Vec<(String, Group)> {
        let sizes = self.group_sizes();
        self.genes
            .iter()
            .filter(|(_, group)| sizes.get(group).copied().unwrap_or(0) >= min_size)
            .cloned()
            .collect()
    }
}

/// In-memory annotation table: column name -> gene -> text entries.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    columns: HashMap<String, HashMap<String, Vec<String>>>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a column so that it exists even before any gene is annotated.
    pub fn add_column(&mut self, column: impl Into<String>) {
        self.columns.entry(column.into()).or_default();
    }

    /// Attach one text entry to `gene` in `column`, creating the column if needed.
    pub fn insert(&mut self, column: impl Into<String>, gene: impl Into<String>, text: impl Into<String>) {
        self.columns
            .entry(column.into())
            .or_default()
            .entry(gene.into())
            .or_default()
            .push(text.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

impl AnnotationSource for AnnotationTable {
    fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    fn annotations(&self, column: &str, gene: &str) -> &[String] {
        self.columns
            .get(column)
            .and_then(|genes| genes.get(gene))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Builds a [`GroupTermMatrix`] from a grouping and an annotation source.
#[derive(Debug, Clone)]
pub struct GroupTermMatrixBuilder<C = TermCountConverter> {
    term_column: String,
    min_size: usize,
    converter: C,
}

impl Default for GroupTermMatrixBuilder<TermCountConverter> {
    fn default() -> Self {
        GroupTermMatrixBuilder {
            term_column: DEFAULT_TERM_COLUMN.to_string(),
            min_size: 1,
            converter: TermCountConverter::default(),
        }
    }
}

impl GroupTermMatrixBuilder<TermCountConverter> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C> GroupTermMatrixBuilder<C>
where
    C: TermMatrixConverter,
{
    pub fn with_term_column(mut self, term_column: impl Into<String>) -> Self {
        self.term_column = term_column.into();
        self
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_converter<D: TermMatrixConverter>(self, converter: D) -> GroupTermMatrixBuilder<D> {
        GroupTermMatrixBuilder {
            term_column: self.term_column,
            min_size: self.min_size,
            converter,
        }
    }

    pub fn term_column(&self) -> &str {
        &self.term_column
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Inner-join memberships with annotations on gene identity and convert the
    /// collected text of each surviving group into a term row.
    ///
    /// Groups without annotated genes and annotations of ungrouped genes are dropped.
    /// A join with no overlap yields an empty matrix rather than an error.
    pub fn build<T, G, A>(&self, grouping: &G, annotations: &A) -> Result<GroupTermMatrix<T>>
    where
        T: FloatOpsTS,
        G: GroupingSource + ?Sized,
        A: AnnotationSource + ?Sized,
    {
        if self.min_size == 0 {
            return Err(TermClusterError::Configuration(
                "min_size must be a positive integer".into(),
            ));
        }
        if !annotations.has_column(&self.term_column) {
            return Err(TermClusterError::Configuration(format!(
                "annotation column '{}' does not exist",
                self.term_column
            )));
        }

        let memberships = grouping.memberships(self.min_size);
        if memberships.is_empty() {
            return Err(TermClusterError::Configuration(format!(
                "no groups with at least {} members",
                self.min_size
            )));
        }

        let mut texts: Vec<(Group, Vec<String>)> = Vec::new();
        let mut position: HashMap<Group, usize> = HashMap::new();
        for (gene, group) in &memberships {
            let entries = annotations.annotations(&self.term_column, gene);
            if entries.is_empty() {
                continue;
            }
            let idx = *position.entry(group.clone()).or_insert_with(|| {
                texts.push((group.clone(), Vec::new()));
                texts.len() - 1
            });
            texts[idx].1.extend(entries.iter().cloned());
        }

        debug!(
            genes = memberships.len(),
            groups = texts.len(),
            column = %self.term_column,
            "joined groupings with annotations"
        );

        self.converter.build(&texts, grouping.num_times())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(values: &[i8]) -> Group {
        Group::from_values(values).unwrap()
    }

    fn fixture() -> (GeneGrouping, AnnotationTable) {
        let mut grouping = GeneGrouping::new(2);
        grouping.insert("g1", g(&[1, 0])).unwrap();
        grouping.insert("g2", g(&[1, 0])).unwrap();
        grouping.insert("g3", g(&[0, -1])).unwrap();
        grouping.insert("g4", g(&[-1, -1])).unwrap();

        let mut annotations = AnnotationTable::new();
        annotations.insert("term", "g1", "nucleus; kinase");
        annotations.insert("term", "g2", "nucleus");
        annotations.insert("term", "g3", "ribosome");
        annotations.insert("term", "g99", "orphan");
        annotations.insert("pathway", "g1", "glycolysis");
        (grouping, annotations)
    }

    #[test]
    fn test_inner_join_drops_unmatched() {
        let (grouping, annotations) = fixture();
        let matrix: GroupTermMatrix<f64> = GroupTermMatrixBuilder::new()
            .build(&grouping, &annotations)
            .unwrap();

        // g4's group has no annotation, g99 has no group
        assert_eq!(matrix.groups(), &[g(&[1, 0]), g(&[0, -1])]);
        assert_eq!(matrix.terms(), &["kinase", "nucleus", "ribosome"]);
        assert_eq!(matrix.get(&g(&[1, 0]), "nucleus"), 2.0);
        assert!(!matrix.terms().iter().any(|t| t == "orphan"));
    }

    #[test]
    fn test_min_size_filters_small_groups() {
        let (grouping, annotations) = fixture();
        let matrix: GroupTermMatrix<f64> = GroupTermMatrixBuilder::new()
            .with_min_size(2)
            .build(&grouping, &annotations)
            .unwrap();
        assert_eq!(matrix.groups(), &[g(&[1, 0])]);
    }

    #[test]
    fn test_selects_term_column() {
        let (grouping, annotations) = fixture();
        let matrix: GroupTermMatrix<f64> = GroupTermMatrixBuilder::new()
            .with_term_column("pathway")
            .build(&grouping, &annotations)
            .unwrap();
        assert_eq!(matrix.terms(), &["glycolysis"]);
    }

    #[test]
    fn test_configuration_errors() {
        let (grouping, annotations) = fixture();

        let missing = GroupTermMatrixBuilder::new()
            .with_term_column("GO_Term")
            .build::<f64, _, _>(&grouping, &annotations);
        assert!(matches!(missing, Err(TermClusterError::Configuration(_))));

        let zero = GroupTermMatrixBuilder::new()
            .with_min_size(0)
            .build::<f64, _, _>(&grouping, &annotations);
        assert!(matches!(zero, Err(TermClusterError::Configuration(_))));

        let too_large = GroupTermMatrixBuilder::new()
            .with_min_size(10)
            .build::<f64, _, _>(&grouping, &annotations);
        assert!(matches!(too_large, Err(TermClusterError::Configuration(_))));
    }

    #[test]
    fn test_no_overlap_gives_empty_matrix() {
        let (grouping, _) = fixture();
        let mut annotations = AnnotationTable::new();
        annotations.insert("term", "unrelated", "nucleus");

        let matrix: GroupTermMatrix<f64> = GroupTermMatrixBuilder::new()
            .build(&grouping, &annotations)
            .unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.num_times(), 2);
    }

    #[test]
    fn test_grouping_rejects_bad_inserts() {
        let mut grouping = GeneGrouping::new(2);
        assert!(grouping.insert("g1", g(&[1])).is_err());
        grouping.insert("g1", g(&[1, 1])).unwrap();
        assert!(grouping.insert("g1", g(&[0, 0])).is_err());
        assert_eq!(grouping.len(), 1);
    }
}
