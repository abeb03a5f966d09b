use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use splitbrain_core::{CellId, CompileError, OpId, Operator, Result};

/// Directed dependency graph over operators.
///
/// For every cell identity, within one step: operators that set the cell run
/// before operators that inc it, incs before reads, reads before updates (an
/// update lands for the *next* step, so nothing in the current step depends
/// on it). An edge A -> B means B consumes an effect produced by A.
pub struct DependencyGraph {
    graph: DiGraph<OpId, ()>,
}

#[derive(Default)]
struct CellUsage {
    setters: Vec<NodeIndex>,
    incers: Vec<NodeIndex>,
    readers: Vec<NodeIndex>,
    updaters: Vec<NodeIndex>,
}

impl DependencyGraph {
    /// Build the dependency graph for a slice of operators. Node indices
    /// match operator indices.
    pub fn build(ops: &[Operator]) -> Self {
        let mut graph = DiGraph::with_capacity(ops.len(), ops.len());
        for i in 0..ops.len() {
            graph.add_node(OpId(i as u32));
        }

        let mut usage: IndexMap<CellId, CellUsage> = IndexMap::new();
        for (i, op) in ops.iter().enumerate() {
            let node = NodeIndex::new(i);
            for cell in op.sets() {
                usage.entry(cell.key).or_default().setters.push(node);
            }
            for cell in op.incs() {
                usage.entry(cell.key).or_default().incers.push(node);
            }
            for cell in op.reads() {
                usage.entry(cell.key).or_default().readers.push(node);
            }
            for cell in op.updates() {
                usage.entry(cell.key).or_default().updaters.push(node);
            }
        }

        for cell_usage in usage.values() {
            let CellUsage {
                setters,
                incers,
                readers,
                updaters,
            } = cell_usage;

            for &set in setters {
                for &later in incers.iter().chain(readers).chain(updaters) {
                    if set != later {
                        graph.update_edge(set, later, ());
                    }
                }
            }
            for &inc in incers {
                for &later in readers.iter().chain(updaters) {
                    if inc != later {
                        graph.update_edge(inc, later, ());
                    }
                }
            }
            for &read in readers {
                for &update in updaters {
                    if read != update {
                        graph.update_edge(read, update, ());
                    }
                }
            }
        }

        Self { graph }
    }

    /// The single global topological order over every operator, computed once,
    /// ignoring component boundaries. Fails on a dependency cycle.
    pub fn global_order(&self, ops: &[Operator]) -> Result<Vec<OpId>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|cycle| {
                let id = self.graph[cycle.node_id()];
                CompileError::DependencyCycle(format!("{} ({})", id, ops[id.index()].kind()))
            })
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitbrain_core::cell::{CellArena, Shape};

    /// Reset sets `acc`, DotInc incs it, the synapse reads it and updates
    /// `out` — declaration order reversed so the sort has to work.
    #[test]
    fn order_respects_set_inc_read_update() {
        let mut arena = CellArena::new();
        let acc_id = arena.register("acc", Shape::vector(2));
        let w_id = arena.register("w", Shape::matrix(2, 2));
        let x_id = arena.register("x", Shape::vector(2));
        let out_id = arena.register("out", Shape::vector(2));
        let acc = arena.full_ref(acc_id);
        let w = arena.full_ref(w_id);
        let x = arena.full_ref(x_id);
        let out = arena.full_ref(out_id);

        let ops = vec![
            Operator::SimpleSynapse {
                input: acc,
                output: out,
                a: -0.5,
                b: 0.5,
            },
            Operator::DotInc { a: w, x, y: acc },
            Operator::Reset {
                dst: acc,
                value: 0.0,
            },
        ];

        let dg = DependencyGraph::build(&ops);
        let order = dg.global_order(&ops).unwrap();
        let pos: Vec<usize> = (0..ops.len())
            .map(|i| order.iter().position(|id| id.index() == i).unwrap())
            .collect();

        // reset (2) before inc (1) before read/update (0)
        assert!(pos[2] < pos[1]);
        assert!(pos[1] < pos[0]);
    }

    #[test]
    fn cycle_is_an_error() {
        let mut arena = CellArena::new();
        let a_id = arena.register("a", Shape::vector(1));
        let b_id = arena.register("b", Shape::vector(1));
        let a = arena.full_ref(a_id);
        let b = arena.full_ref(b_id);

        // a sets b's source and reads b; b sets a's source and reads a.
        let ops = vec![
            Operator::Copy { dst: a, src: b },
            Operator::Copy { dst: b, src: a },
        ];

        let dg = DependencyGraph::build(&ops);
        let err = dg.global_order(&ops).unwrap_err();
        assert!(matches!(err, CompileError::DependencyCycle(_)));
    }
}
