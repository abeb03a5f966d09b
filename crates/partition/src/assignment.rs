use splitbrain_core::{Component, ObjectId, ProbeId};
use splitbrain_graph::ModelGraph;

/// A partial object-to-component assignment, as produced by a partition
/// strategy (or supplied by hand). Propagation turns it into a
/// [`FinalAssignment`].
#[derive(Debug, Clone)]
pub struct Assignment {
    pub objects: Vec<Option<Component>>,
    pub aggregates: Vec<Option<Component>>,
    pub probes: Vec<Option<Component>>,
}

impl Assignment {
    /// An assignment with nothing placed yet, sized for `model`.
    pub fn empty(model: &ModelGraph) -> Self {
        Self {
            objects: vec![None; model.objects.len()],
            aggregates: vec![None; model.aggregates.len()],
            probes: vec![None; model.probes.len()],
        }
    }

    pub fn set_object(&mut self, id: ObjectId, component: Component) {
        self.objects[id.0 as usize] = Some(component);
    }

    pub fn object(&self, id: ObjectId) -> Option<Component> {
        self.objects[id.0 as usize]
    }
}

/// The validated total assignment: every leaf object and every probe mapped
/// to exactly one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalAssignment {
    pub objects: Vec<Component>,
    pub probes: Vec<Component>,
}

impl FinalAssignment {
    pub fn object(&self, id: ObjectId) -> Component {
        self.objects[id.0 as usize]
    }

    pub fn probe(&self, id: ProbeId) -> Component {
        self.probes[id.0 as usize]
    }
}
