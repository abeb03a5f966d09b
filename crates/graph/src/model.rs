use serde::{Deserialize, Serialize};

use splitbrain_core::cell::CellRef;
use splitbrain_core::{AggregateId, CellArena, CellId, ObjectId, OpId, Operator, ProbeId};

/// What a filtered edge does to the value it carries.
///
/// `Function` marks an opaque transformation the coarse model cannot safely
/// relocate; the edge's source is then pinned to component 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transform {
    Identity,
    Linear,
    Function,
}

/// A leaf object of the consumed graph: the unit being placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafObject {
    pub label: String,
    /// Compute weight (unit count). Zero-weight objects are pure relays.
    pub compute_weight: u64,
    /// Output is produced by an opaque, externally driven computation.
    /// Such objects must run on component 0.
    pub externally_driven: bool,
    /// Direct (non-discretized, exact) computation mode. Must run on
    /// component 0.
    pub exact_mode: bool,
    /// Containment parent, if any.
    pub parent: Option<AggregateId>,
}

/// A containment group of leaf objects. Assignments propagate from aggregates
/// down to unassigned children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    pub label: String,
    pub parent: Option<AggregateId>,
}

/// A directed connection between two leaf objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEdge {
    pub source: ObjectId,
    pub target: ObjectId,
    /// Communication weight: the size of the carried footprint.
    pub weight: f64,
    /// Whether the edge's effect is mediated by a persisted update. Only
    /// filtered edges may cross a component boundary.
    pub filtered: bool,
    pub transform: Transform,
    /// The cell written by the edge's update, present iff `filtered`.
    pub transfer_cell: Option<CellId>,
    /// Edges with learning rules can never cross a boundary.
    #[serde(default)]
    pub learning_rule: bool,
}

/// An observation point: samples a cell of a leaf object at a fixed period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    pub target_object: ObjectId,
    pub target: CellRef,
    /// Sampling interval in seconds; None samples every step.
    pub sample_interval: Option<f64>,
    pub label: String,
}

/// Which part of the model an operator was built for. Operator groups owned
/// by an edge are exactly what the schedule compiler may split across a
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpOwner {
    Object(ObjectId),
    Edge(usize),
}

/// The full object graph handed over by the modeling framework: leaf objects
/// with placement flags, containment aggregates, link edges, probes, and the
/// operator arena with per-owner groups. The compiler consumes this as data;
/// it never executes anything in it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelGraph {
    pub cells: CellArena,
    pub objects: Vec<LeafObject>,
    pub aggregates: Vec<Aggregate>,
    pub edges: Vec<LinkEdge>,
    pub probes: Vec<Probe>,
    ops: Vec<Operator>,
    owners: Vec<OpOwner>,
}

impl ModelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_aggregate(&mut self, label: impl Into<String>, parent: Option<AggregateId>) -> AggregateId {
        let id = AggregateId(self.aggregates.len() as u32);
        self.aggregates.push(Aggregate {
            label: label.into(),
            parent,
        });
        id
    }

    pub fn add_object(&mut self, object: LeafObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    /// Add a link edge; returns its index.
    pub fn add_edge(&mut self, edge: LinkEdge) -> usize {
        self.edges.push(edge);
        self.edges.len() - 1
    }

    pub fn add_probe(&mut self, probe: Probe) -> ProbeId {
        let id = ProbeId(self.probes.len() as u32);
        self.probes.push(probe);
        id
    }

    /// Record an operator built as part of `owner`.
    pub fn add_op(&mut self, owner: OpOwner, op: Operator) -> OpId {
        let id = OpId(self.ops.len() as u32);
        self.ops.push(op);
        self.owners.push(owner);
        id
    }

    pub fn object(&self, id: ObjectId) -> &LeafObject {
        &self.objects[id.0 as usize]
    }

    pub fn aggregate(&self, id: AggregateId) -> &Aggregate {
        &self.aggregates[id.0 as usize]
    }

    pub fn op(&self, id: OpId) -> &Operator {
        &self.ops[id.index()]
    }

    pub fn ops(&self) -> &[Operator] {
        &self.ops
    }

    pub fn owner(&self, id: OpId) -> OpOwner {
        self.owners[id.index()]
    }

    /// Operator ids grouped by owner, in insertion order.
    pub fn ops_owned_by(&self, owner: OpOwner) -> Vec<OpId> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, o)| **o == owner)
            .map(|(i, _)| OpId(i as u32))
            .collect()
    }

    /// Human-readable edge name for error messages and logs.
    pub fn edge_label(&self, idx: usize) -> String {
        let edge = &self.edges[idx];
        format!(
            "{} -> {}",
            self.object(edge.source).label,
            self.object(edge.target).label
        )
    }

    /// All outgoing edge indices of an object.
    pub fn outgoing(&self, id: ObjectId) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.source == id)
            .map(|(i, _)| i)
    }
}
