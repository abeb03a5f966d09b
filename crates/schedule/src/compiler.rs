use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use splitbrain_core::cell::CellRef;
use splitbrain_core::{CellId, CompileError, Component, OpId, Operator, Result};
use splitbrain_graph::{DependencyGraph, ModelGraph, OpOwner};
use splitbrain_partition::FinalAssignment;

use crate::split::split_group;

/// Position of an operator in a component's local order.
///
/// `slot` is the operator's index in the global topological order; `nudge`
/// is the sub-slot used by placeholders so they sort around the real
/// operator at that slot: Wait < Recv < the operator itself < Send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderKey {
    slot: usize,
    nudge: i8,
}

impl OrderKey {
    /// A real operator at its global-order position.
    pub fn real(slot: usize) -> Self {
        Self { slot, nudge: 0 }
    }

    /// Immediately after the operator at `slot` (Send).
    pub fn after(slot: usize) -> Self {
        Self { slot, nudge: 1 }
    }

    /// Immediately before the operator at `slot` (Recv).
    pub fn before(slot: usize) -> Self {
        Self { slot, nudge: -1 }
    }

    /// Before anything else keyed at `slot`, including a Recv (Wait).
    pub fn settle(slot: usize) -> Self {
        Self { slot, nudge: -2 }
    }
}

/// One component's compiled schedule: its operators in final local order and
/// the cells they touch, in first-use order.
#[derive(Debug, Clone)]
pub struct ComponentSchedule {
    pub ops: Vec<OpId>,
    pub cells: Vec<CellId>,
}

/// The compiled per-component schedules. `ops` extends the model's operator
/// arena with the placeholders created during compilation; model operator
/// ids stay valid.
#[derive(Debug)]
pub struct Schedules {
    pub n_components: usize,
    pub ops: Vec<Operator>,
    pub components: Vec<ComponentSchedule>,
    /// The global topological order over the real operators.
    pub global_order: Vec<OpId>,
}

impl Schedules {
    pub fn op(&self, id: OpId) -> &Operator {
        &self.ops[id.index()]
    }
}

/// Compiles the global execution order into per-component local orders,
/// splitting crossing connections and inserting Send/Recv/Wait placeholders.
///
/// Owns the message tag counter: tags increase monotonically, one per
/// crossing edge, and are never reused.
pub struct ScheduleCompiler {
    next_tag: u32,
}

impl Default for ScheduleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleCompiler {
    pub fn new() -> Self {
        Self { next_tag: 0 }
    }

    fn allocate_tag(&mut self) -> u32 {
        let tag = self.next_tag;
        self.next_tag += 1;
        tag
    }

    pub fn compile(
        &mut self,
        model: &ModelGraph,
        assignment: &FinalAssignment,
        n_components: usize,
    ) -> Result<Schedules> {
        let mut ops: Vec<Operator> = model.ops().to_vec();
        let n_real = ops.len();

        let mut real_ops: Vec<Vec<OpId>> = vec![Vec::new(); n_components];
        let mut sends: Vec<Vec<(CellRef, u32, Component)>> = vec![Vec::new(); n_components];
        let mut recvs: Vec<Vec<(CellRef, u32, Component)>> = vec![Vec::new(); n_components];

        // Route each owner group to its component, splitting crossing edges.
        let mut groups: IndexMap<OpOwner, Vec<OpId>> = IndexMap::new();
        for i in 0..n_real {
            let id = OpId(i as u32);
            groups.entry(model.owner(id)).or_default().push(id);
        }

        for (owner, group) in &groups {
            match *owner {
                OpOwner::Object(object) => {
                    real_ops[assignment.object(object)].extend(group.iter().copied());
                }
                OpOwner::Edge(idx) => {
                    let edge = &model.edges[idx];
                    let source = assignment.object(edge.source);
                    let target = assignment.object(edge.target);

                    if source == target {
                        real_ops[source].extend(group.iter().copied());
                        continue;
                    }

                    let label = model.edge_label(idx);
                    if !edge.filtered {
                        return Err(CompileError::StraddlingEdge {
                            edge: label,
                            src: source,
                            target,
                        });
                    }
                    if edge.learning_rule {
                        return Err(CompileError::LearningRuleCrossing(label));
                    }
                    let cell = edge
                        .transfer_cell
                        .ok_or_else(|| CompileError::UnsplittableCrossing(label.clone()))?;

                    let tag = self.allocate_tag();
                    let cell_ref = model.cells.full_ref(cell);
                    sends[source].push((cell_ref, tag, target));
                    recvs[target].push((cell_ref, tag, source));

                    let (pre, post) = split_group(&ops, group, cell, &label)?;
                    debug!(
                        edge = %label,
                        tag,
                        pre = pre.len(),
                        post = post.len(),
                        "split crossing connection"
                    );
                    real_ops[source].extend(pre);
                    real_ops[target].extend(post);
                }
            }
        }

        // One global order over every real operator, ignoring boundaries.
        let graph = DependencyGraph::build(&ops[..n_real]);
        let global_order = graph.global_order(&ops[..n_real])?;
        let mut slot = vec![0usize; n_real];
        for (position, id) in global_order.iter().enumerate() {
            slot[id.index()] = position;
        }

        let mut components = Vec::with_capacity(n_components);
        for component in 0..n_components {
            let mut keyed: Vec<(OrderKey, OpId)> = real_ops[component]
                .iter()
                .map(|&id| (OrderKey::real(slot[id.index()]), id))
                .collect();

            for &(cell_ref, tag, dst) in &sends[component] {
                let updater_slot =
                    unique_updater_slot(&ops, &real_ops[component], &slot, cell_ref.key, component)?;

                let send_id = OpId(ops.len() as u32);
                ops.push(Operator::Send {
                    dst,
                    tag,
                    cell: cell_ref,
                });
                keyed.push((OrderKey::after(updater_slot), send_id));

                // A local read of the sent cell must not be treated as settled
                // before the send has been issued.
                if let Some(read_slot) =
                    first_reader_slot(&ops, &real_ops[component], &slot, cell_ref.key)
                {
                    let wait_id = OpId(ops.len() as u32);
                    ops.push(Operator::Wait { cell: cell_ref });
                    keyed.push((OrderKey::settle(read_slot), wait_id));
                }
            }

            for &(cell_ref, tag, src) in &recvs[component] {
                let read_slot = first_reader_slot(&ops, &real_ops[component], &slot, cell_ref.key)
                    .ok_or(CompileError::NoCrossingReader {
                        component,
                        cell: cell_ref.key.key(),
                    })?;

                let recv_id = OpId(ops.len() as u32);
                ops.push(Operator::Recv {
                    src,
                    tag,
                    cell: cell_ref,
                });
                keyed.push((OrderKey::before(read_slot), recv_id));
            }

            keyed.sort_by_key(|&(key, _)| key);

            let mut cells: IndexSet<CellId> = IndexSet::new();
            for &(_, id) in &keyed {
                for cell in ops[id.index()].all_cells() {
                    cells.insert(cell.key);
                }
            }

            components.push(ComponentSchedule {
                ops: keyed.into_iter().map(|(_, id)| id).collect(),
                cells: cells.into_iter().collect(),
            });
        }

        Ok(Schedules {
            n_components,
            ops,
            components,
            global_order,
        })
    }
}

/// Slot of the single local operator updating `cell`. Zero or more than one
/// is a structural error: an updates footprint is unique per crossing cell
/// by construction of the original graph.
fn unique_updater_slot(
    ops: &[Operator],
    local: &[OpId],
    slot: &[usize],
    cell: CellId,
    component: Component,
) -> Result<usize> {
    let updaters: Vec<OpId> = local
        .iter()
        .filter(|id| ops[id.index()].updates().iter().any(|r| r.key == cell))
        .copied()
        .collect();

    if updaters.len() != 1 {
        return Err(CompileError::SplitUpdateCount {
            location: format!("component {component}"),
            cell: cell.key(),
            found: updaters.len(),
        });
    }
    Ok(slot[updaters[0].index()])
}

/// Slot of the earliest local operator reading `cell`, if any.
fn first_reader_slot(
    ops: &[Operator],
    local: &[OpId],
    slot: &[usize],
    cell: CellId,
) -> Option<usize> {
    local
        .iter()
        .filter(|id| ops[id.index()].reads().iter().any(|r| r.key == cell))
        .map(|id| slot[id.index()])
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitbrain_core::cell::Shape;
    use splitbrain_graph::{LeafObject, LinkEdge, Transform};

    fn leaf(label: &str, weight: u64) -> LeafObject {
        LeafObject {
            label: label.into(),
            compute_weight: weight,
            externally_driven: false,
            exact_mode: false,
            parent: None,
        }
    }

    struct TwoPopulations {
        model: ModelGraph,
        transfer: CellId,
        updater: OpId,
        post_reader: OpId,
    }

    /// `a -> filtered edge -> b`. The edge group is a decode DotInc feeding a
    /// synapse update, plus the post-side DotInc into b's input.
    fn two_populations() -> TwoPopulations {
        let mut model = ModelGraph::new();

        let a_in = model.cells.register("a.in", Shape::vector(2));
        let a_out = model.cells.register("a.out", Shape::vector(2));
        let a_volt = model.cells.register("a.voltage", Shape::vector(2));
        let a_ref = model.cells.register("a.ref_time", Shape::vector(2));
        let dec_w = model.cells.register("edge.decoders", Shape::matrix(1, 2));
        let decoded = model.cells.register("edge.decoded", Shape::vector(1));
        let syn_out = model.cells.register("edge.synapse_out", Shape::vector(1));
        let out_w = model.cells.register("edge.transform", Shape::matrix(2, 1));
        let b_in = model.cells.register("b.in", Shape::vector(2));
        let b_out = model.cells.register("b.out", Shape::vector(2));
        let b_volt = model.cells.register("b.voltage", Shape::vector(2));
        let b_ref = model.cells.register("b.ref_time", Shape::vector(2));

        let full = |model: &ModelGraph, id: CellId| model.cells.full_ref(id);

        let a = model.add_object(leaf("a", 2));
        let b = model.add_object(leaf("b", 2));
        let edge = model.add_edge(LinkEdge {
            source: a,
            target: b,
            weight: 1.0,
            filtered: true,
            transform: Transform::Linear,
            transfer_cell: Some(syn_out),
            learning_rule: false,
        });

        let (a_in_r, a_out_r) = (full(&model, a_in), full(&model, a_out));
        model.add_op(
            OpOwner::Object(a),
            Operator::Lif {
                n_units: 2,
                tau_rc: 0.02,
                tau_ref: 0.002,
                min_voltage: 0.0,
                j: a_in_r,
                output: a_out_r,
                voltage: full(&model, a_volt),
                ref_time: full(&model, a_ref),
            },
        );

        let decoded_r = full(&model, decoded);
        model.add_op(
            OpOwner::Edge(edge),
            Operator::Reset {
                dst: decoded_r,
                value: 0.0,
            },
        );
        let dec_w_r = full(&model, dec_w);
        model.add_op(
            OpOwner::Edge(edge),
            Operator::DotInc {
                a: dec_w_r,
                x: a_out_r,
                y: decoded_r,
            },
        );
        let syn_out_r = full(&model, syn_out);
        let updater = model.add_op(
            OpOwner::Edge(edge),
            Operator::SimpleSynapse {
                input: decoded_r,
                output: syn_out_r,
                a: -0.9,
                b: 0.1,
            },
        );
        let (out_w_r, b_in_r) = (full(&model, out_w), full(&model, b_in));
        let post_reader = model.add_op(
            OpOwner::Edge(edge),
            Operator::DotInc {
                a: out_w_r,
                x: syn_out_r,
                y: b_in_r,
            },
        );

        model.add_op(
            OpOwner::Object(b),
            Operator::Reset {
                dst: b_in_r,
                value: 0.0,
            },
        );
        model.add_op(
            OpOwner::Object(b),
            Operator::Lif {
                n_units: 2,
                tau_rc: 0.02,
                tau_ref: 0.002,
                min_voltage: 0.0,
                j: b_in_r,
                output: full(&model, b_out),
                voltage: full(&model, b_volt),
                ref_time: full(&model, b_ref),
            },
        );

        TwoPopulations {
            model,
            transfer: syn_out,
            updater,
            post_reader,
        }
    }

    fn assignment(objects: Vec<usize>) -> FinalAssignment {
        FinalAssignment {
            objects,
            probes: Vec::new(),
        }
    }

    #[test]
    fn crossing_edge_emits_one_send_and_one_recv() {
        let fixture = two_populations();
        let mut compiler = ScheduleCompiler::new();
        let schedules = compiler
            .compile(&fixture.model, &assignment(vec![0, 1]), 2)
            .unwrap();

        let side = |c: usize| -> Vec<&Operator> {
            schedules.components[c]
                .ops
                .iter()
                .map(|&id| schedules.op(id))
                .collect()
        };

        let sends: Vec<_> = side(0)
            .iter()
            .filter(|op| matches!(op, Operator::Send { .. }))
            .cloned()
            .collect();
        let recvs: Vec<_> = side(1)
            .iter()
            .filter(|op| matches!(op, Operator::Recv { .. }))
            .cloned()
            .collect();
        assert_eq!(sends.len(), 1);
        assert_eq!(recvs.len(), 1);
        assert!(!side(0).iter().any(|op| matches!(op, Operator::Recv { .. })));
        assert!(!side(1).iter().any(|op| matches!(op, Operator::Send { .. })));

        // one shared tag, routed between the right peers
        match (sends[0], recvs[0]) {
            (
                Operator::Send { dst, tag: t1, cell },
                Operator::Recv { src, tag: t2, .. },
            ) => {
                assert_eq!(*dst, 1);
                assert_eq!(*src, 0);
                assert_eq!(t1, t2);
                assert_eq!(cell.key, fixture.transfer);
            }
            other => panic!("unexpected placeholder pair: {other:?}"),
        }
    }

    #[test]
    fn send_sits_immediately_after_the_updater() {
        let fixture = two_populations();
        let mut compiler = ScheduleCompiler::new();
        let schedules = compiler
            .compile(&fixture.model, &assignment(vec![0, 1]), 2)
            .unwrap();

        let ops0 = &schedules.components[0].ops;
        let updater_at = ops0
            .iter()
            .position(|&id| id == fixture.updater)
            .expect("updater on source side");
        assert!(matches!(
            schedules.op(ops0[updater_at + 1]),
            Operator::Send { .. }
        ));
    }

    #[test]
    fn recv_sits_immediately_before_the_first_reader() {
        let fixture = two_populations();
        let mut compiler = ScheduleCompiler::new();
        let schedules = compiler
            .compile(&fixture.model, &assignment(vec![0, 1]), 2)
            .unwrap();

        let ops1 = &schedules.components[1].ops;
        let reader_at = ops1
            .iter()
            .position(|&id| id == fixture.post_reader)
            .expect("post reader on target side");
        assert!(reader_at > 0);
        assert!(matches!(
            schedules.op(ops1[reader_at - 1]),
            Operator::Recv { .. }
        ));
    }

    #[test]
    fn local_orders_are_subsequences_of_the_global_order() {
        let fixture = two_populations();
        let mut compiler = ScheduleCompiler::new();
        let schedules = compiler
            .compile(&fixture.model, &assignment(vec![0, 1]), 2)
            .unwrap();

        let mut position = vec![0usize; schedules.global_order.len()];
        for (i, id) in schedules.global_order.iter().enumerate() {
            position[id.index()] = i;
        }

        for component in &schedules.components {
            let real: Vec<usize> = component
                .ops
                .iter()
                .filter(|id| !schedules.op(**id).is_placeholder())
                .map(|id| position[id.index()])
                .collect();
            assert!(real.windows(2).all(|w| w[0] < w[1]), "{real:?}");
        }
    }

    #[test]
    fn same_component_schedules_have_no_placeholders() {
        let fixture = two_populations();
        let mut compiler = ScheduleCompiler::new();
        let schedules = compiler
            .compile(&fixture.model, &assignment(vec![0, 0]), 1)
            .unwrap();

        assert_eq!(schedules.components.len(), 1);
        assert!(schedules.components[0]
            .ops
            .iter()
            .all(|&id| !schedules.op(id).is_placeholder()));
        // all real ops scheduled exactly once
        assert_eq!(
            schedules.components[0].ops.len(),
            fixture.model.ops().len()
        );
    }

    #[test]
    fn local_read_of_sent_cell_gets_a_wait() {
        let mut fixture = two_populations();
        // a reads the transferred cell on its own side as feedback
        let syn_out_r = fixture.model.cells.full_ref(fixture.transfer);
        let fb = fixture.model.cells.register("a.feedback", Shape::vector(2));
        let fb_r = fixture.model.cells.full_ref(fb);
        let fb_w = fixture
            .model
            .cells
            .register("a.feedback_w", Shape::matrix(2, 1));
        let fb_w_r = fixture.model.cells.full_ref(fb_w);
        let feedback_reader = fixture.model.add_op(
            OpOwner::Object(splitbrain_core::ObjectId(0)),
            Operator::DotInc {
                a: fb_w_r,
                x: syn_out_r,
                y: fb_r,
            },
        );

        let mut compiler = ScheduleCompiler::new();
        let schedules = compiler
            .compile(&fixture.model, &assignment(vec![0, 1]), 2)
            .unwrap();

        let ops0 = &schedules.components[0].ops;
        let waits: Vec<usize> = ops0
            .iter()
            .enumerate()
            .filter(|(_, &id)| matches!(schedules.op(id), Operator::Wait { .. }))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(waits.len(), 1);

        let reader_at = ops0
            .iter()
            .position(|&id| id == feedback_reader)
            .expect("feedback reader on source side");
        assert!(waits[0] < reader_at);
    }

    #[test]
    fn tags_are_unique_and_monotonic() {
        // a feeds both b and c across boundaries
        let mut fixture = two_populations();
        let c = fixture.model.add_object(leaf("c", 2));
        let c_in = fixture.model.cells.register("c.in", Shape::vector(2));
        let c_in_r = fixture.model.cells.full_ref(c_in);
        let syn2 = fixture.model.cells.register("edge2.synapse_out", Shape::vector(1));
        let syn2_r = fixture.model.cells.full_ref(syn2);
        let a_out_r = fixture.model.cells.full_ref(CellId(1));
        let edge2 = fixture.model.add_edge(LinkEdge {
            source: splitbrain_core::ObjectId(0),
            target: c,
            weight: 1.0,
            filtered: true,
            transform: Transform::Linear,
            transfer_cell: Some(syn2),
            learning_rule: false,
        });
        fixture.model.add_op(
            OpOwner::Edge(edge2),
            Operator::NoDenSynapse {
                input: a_out_r,
                output: syn2_r,
                b: 1.0,
            },
        );
        fixture.model.add_op(
            OpOwner::Edge(edge2),
            Operator::Copy {
                dst: c_in_r,
                src: syn2_r,
            },
        );

        let mut compiler = ScheduleCompiler::new();
        let schedules = compiler
            .compile(&fixture.model, &assignment(vec![0, 1, 2]), 3)
            .unwrap();

        let mut tags = Vec::new();
        for component in &schedules.components {
            for &id in &component.ops {
                if let Operator::Send { tag, .. } = schedules.op(id) {
                    tags.push(*tag);
                }
            }
        }
        tags.sort_unstable();
        assert_eq!(tags, vec![0, 1]);
    }

    #[test]
    fn crossing_without_update_is_structural() {
        let mut model = ModelGraph::new();
        let a = model.add_object(leaf("a", 1));
        let b = model.add_object(leaf("b", 1));
        let cell = model.cells.register("x", Shape::vector(1));
        let x = model.cells.full_ref(cell);
        let edge = model.add_edge(LinkEdge {
            source: a,
            target: b,
            weight: 1.0,
            filtered: true,
            transform: Transform::Identity,
            transfer_cell: None,
            learning_rule: false,
        });
        model.add_op(OpOwner::Edge(edge), Operator::Reset { dst: x, value: 0.0 });

        let mut compiler = ScheduleCompiler::new();
        let err = compiler
            .compile(&model, &assignment(vec![0, 1]), 2)
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsplittableCrossing(_)));
    }

    #[test]
    fn learning_rule_crossing_is_rejected() {
        let mut fixture = two_populations();
        fixture.model.edges[0].learning_rule = true;

        let mut compiler = ScheduleCompiler::new();
        let err = compiler
            .compile(&fixture.model, &assignment(vec![0, 1]), 2)
            .unwrap_err();
        assert!(matches!(err, CompileError::LearningRuleCrossing(_)));
    }
}
