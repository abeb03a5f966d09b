use petgraph::graph::NodeIndex;

use splitbrain_core::Component;
use splitbrain_graph::FilterGraph;

/// Load-balanced greedy assignment: repeatedly place the heaviest remaining
/// node on the currently lightest component. Ties are broken by insertion
/// order (stable sort) and by lowest component index. Ignores communication.
pub fn balanced_partition(graph: &FilterGraph, n_components: usize) -> Vec<Component> {
    let n = graph.node_count();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(graph.node_weight(NodeIndex::new(i))));

    let mut load = vec![0u64; n_components];
    let mut assignment = vec![0; n];
    for i in order {
        let lightest = (0..n_components)
            .min_by_key(|&c| load[c])
            .unwrap_or_default();
        assignment[i] = lightest;
        load[lightest] += graph.node_weight(NodeIndex::new(i));
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_graph::filter_graph;

    #[test]
    fn balances_uneven_weights() {
        // 30 alone roughly balances 20 + 10 + 5.
        let graph = filter_graph(&[30, 20, 10, 5], &[]);
        let assignment = balanced_partition(&graph, 2);

        let mut load = [0u64; 2];
        for (i, &c) in assignment.iter().enumerate() {
            load[c] += graph.node_weight(NodeIndex::new(i));
        }
        assert_eq!(load.iter().sum::<u64>(), 65);
        assert!(load[0].abs_diff(load[1]) <= 5, "{load:?}");
    }

    #[test]
    fn equal_weights_spread_round_robin() {
        let graph = filter_graph(&[10, 10, 10, 10, 10, 10], &[]);
        let assignment = balanced_partition(&graph, 3);
        for c in 0..3 {
            assert_eq!(assignment.iter().filter(|&&a| a == c).count(), 2);
        }
    }
}
