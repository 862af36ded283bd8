use ndarray::Array2;
use proptest::prelude::*;
use std::collections::BTreeSet;
use term_clusters::aggregation::{
    AggregationMatrix, Aggregator, Direction, Orientation, PartitionKey, Partitioning, Predicate, aggregate,
};
use term_clusters::cluster::{CutCriterion, Linkage, cluster, cut_tree, linkage, pairwise_distance};
use term_clusters::matrix::{Group, GroupTermMatrix, TrinaryState};
use term_clusters::significance::{SignificanceMatrix, SignificanceTransformer, filter_zero_variance};

fn group_matrix() -> impl Strategy<Value = GroupTermMatrix<f64>> {
    (1usize..5, 1usize..6).prop_flat_map(|(num_times, n_terms)| {
        prop::collection::vec(
            (
                prop::collection::vec(-1i8..=1, num_times),
                prop::collection::vec(0u32..10, n_terms),
            ),
            0..10,
        )
        .prop_map(move |rows| {
            let mut seen = BTreeSet::new();
            let mut groups = Vec::new();
            let mut values = Vec::new();
            for (states, row) in rows {
                if seen.insert(states.clone()) {
                    groups.push(Group::from_values(&states).unwrap());
                    values.push(row.into_iter().map(f64::from).collect());
                }
            }
            let terms = (0..n_terms).map(|i| format!("term{}", i)).collect();
            GroupTermMatrix::from_dense_rows(groups, terms, num_times, values).unwrap()
        })
    })
}

fn count_matrix() -> impl Strategy<Value = AggregationMatrix<f64>> {
    (2usize..6, 1usize..8).prop_flat_map(|(n_partitions, n_terms)| {
        prop::collection::vec(0u32..4, n_partitions * n_terms).prop_map(move |cells| {
            let data = Array2::from_shape_vec(
                (n_partitions, n_terms),
                cells.into_iter().map(f64::from).collect(),
            )
            .unwrap();
            AggregationMatrix::new(
                (0..n_partitions).map(PartitionKey::Time).collect(),
                (0..n_terms).map(|i| format!("term{}", i)).collect(),
                data,
                Orientation::PartitionMajor,
            )
            .unwrap()
        })
    })
}

fn score_matrix() -> impl Strategy<Value = SignificanceMatrix> {
    (2usize..12, 1usize..5).prop_flat_map(|(n_terms, n_partitions)| {
        prop::collection::vec(0.0f64..3.0, n_terms * n_partitions).prop_map(move |cells| {
            SignificanceMatrix::new(
                (0..n_terms).map(|i| format!("term{}", i)).collect(),
                (0..n_partitions).map(PartitionKey::Time).collect(),
                Array2::from_shape_vec((n_terms, n_partitions), cells).unwrap(),
            )
            .unwrap()
        })
    })
}

proptest! {
    #[test]
    fn aggregation_conserves_totals_over_true_partition(matrix in group_matrix(), time in 0usize..5) {
        let time = time % matrix.num_times();
        let predicates = [TrinaryState::Down, TrinaryState::Unchanged, TrinaryState::Up]
            .into_iter()
            .map(|state| Predicate::custom("state", move |group: &Group| group.state_at(time) == Some(state)))
            .collect();

        let agg = aggregate(&matrix, Partitioning::Predicates(predicates)).unwrap();
        prop_assert_eq!(agg.term_totals(), matrix.column_sums());
    }

    #[test]
    fn aggregation_preserves_columns(matrix in group_matrix(), up in any::<bool>()) {
        let direction = if up { Direction::Up } else { Direction::Down };
        let agg = Aggregator::by_time(direction).aggregate(&matrix).unwrap();

        prop_assert_eq!(agg.terms(), matrix.terms());
        prop_assert_eq!(agg.n_partitions(), matrix.num_times());
        prop_assert_eq!(agg.data().dim(), (matrix.num_times(), matrix.n_terms()));
    }

    #[test]
    fn zero_variance_filter_keeps_exactly_varying_terms(agg in count_matrix()) {
        let filtered = filter_zero_variance(&agg);

        for t in 0..agg.n_terms() {
            let profile = agg.term_profile(t);
            let varying = profile.iter().any(|&v| v != profile[0]);
            let kept = filtered.terms().contains(&agg.terms()[t]);
            prop_assert_eq!(varying, kept);
        }
    }

    #[test]
    fn significance_is_monotonic_in_deviation(agg in count_matrix()) {
        let Ok(sig) = SignificanceTransformer::new(None).transform(&agg) else {
            return Ok(());
        };
        let counts = agg.clone().into_term_major();

        for (row, term) in sig.terms().iter().enumerate() {
            let t = counts.terms().iter().position(|x| x == term).unwrap();
            let values: Vec<f64> = counts.term_profile(t).to_vec();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let profile = sig.profile(row);
            for i in 0..values.len() {
                for j in 0..values.len() {
                    if (values[i] - mean).abs() > (values[j] - mean).abs() + 1e-9 {
                        prop_assert!(profile[i] >= profile[j]);
                    }
                }
            }
        }
    }

    #[test]
    fn clustering_is_stable(sig in score_matrix(), max_distance in 0.01f64..3.0) {
        let first = cluster(&sig, max_distance).unwrap();
        let second = cluster(&sig, max_distance).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn larger_cut_never_adds_clusters(sig in score_matrix(), a in 0.0f64..4.0, b in 0.0f64..4.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let tree = linkage(&pairwise_distance(sig.scores().view()).unwrap(), Linkage::Average).unwrap();

        let count = |threshold: f64| {
            let ids = cut_tree(&tree, CutCriterion::Distance(threshold)).unwrap();
            ids.into_iter().collect::<BTreeSet<_>>().len()
        };
        prop_assert!(count(high) <= count(low));
    }

    #[test]
    fn average_linkage_merges_are_monotone(sig in score_matrix()) {
        let tree = linkage(&pairwise_distance(sig.scores().view()).unwrap(), Linkage::Average).unwrap();
        prop_assert_eq!(tree.len(), sig.n_terms() - 1);
        for pair in tree.merges().windows(2) {
            prop_assert!(pair[1].distance >= pair[0].distance - 1e-12);
        }
    }
}
