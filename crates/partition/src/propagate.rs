use tracing::warn;

use splitbrain_core::{CompileError, Component, ObjectId, Result};
use splitbrain_graph::{ModelGraph, Transform};

use crate::assignment::{Assignment, FinalAssignment};

/// Push a partial assignment down to every leaf object and probe, enforcing
/// the hard placement rules, and validate the result.
///
/// The hard rules are re-derived here without trusting the caller's partial
/// input:
/// 1. externally driven leaves go to component 0;
/// 2. exact-mode leaves go to component 0;
/// 3. a leaf sourcing a filtered edge with a `Function` transform goes to
///    component 0.
/// A conflicting prior assignment is logged and overridden, never fatal.
/// Unpinned, unassigned leaves inherit their parent aggregate's component
/// (the root defaults to 0); probes inherit their observed leaf's component.
///
/// Validation fails if any non-filtered edge's endpoints end up on different
/// components, or if anything remains unassigned.
pub fn propagate(model: &ModelGraph, mut assignment: Assignment) -> Result<FinalAssignment> {
    for (i, object) in model.objects.iter().enumerate() {
        let id = ObjectId(i as u32);

        let pinned = if object.externally_driven {
            Some("externally driven")
        } else if object.exact_mode {
            Some("exact-mode")
        } else if sources_function_edge(model, id) {
            Some("function-transform source")
        } else {
            None
        };

        if let Some(reason) = pinned {
            if let Some(previous) = assignment.objects[i] {
                if previous != 0 {
                    warn!(
                        object = %object.label,
                        component = previous,
                        "{} object was assigned to a component other than 0; \
                         overriding previous assignment",
                        reason
                    );
                }
            }
            assignment.objects[i] = Some(0);
        } else if assignment.objects[i].is_none() {
            let inherited = match object.parent {
                Some(parent) => aggregate_component(model, &mut assignment, parent.0 as usize),
                None => 0,
            };
            assignment.objects[i] = Some(inherited);
        }
    }

    for (i, probe) in model.probes.iter().enumerate() {
        assignment.probes[i] = assignment.objects[probe.target_object.0 as usize];
    }

    validate(model, &assignment)?;

    let objects = assignment
        .objects
        .iter()
        .map(|c| c.unwrap_or_default())
        .collect();
    let probes = assignment
        .probes
        .iter()
        .map(|c| c.unwrap_or_default())
        .collect();
    Ok(FinalAssignment { objects, probes })
}

fn sources_function_edge(model: &ModelGraph, object: ObjectId) -> bool {
    model.outgoing(object).any(|idx| {
        let edge = &model.edges[idx];
        edge.filtered && edge.transform == Transform::Function
    })
}

/// Resolve an aggregate's component, walking up the containment tree.
/// Unassigned roots default to component 0.
fn aggregate_component(
    model: &ModelGraph,
    assignment: &mut Assignment,
    index: usize,
) -> Component {
    if let Some(component) = assignment.aggregates[index] {
        return component;
    }
    let component = match model.aggregates[index].parent {
        Some(parent) => aggregate_component(model, assignment, parent.0 as usize),
        None => 0,
    };
    assignment.aggregates[index] = Some(component);
    component
}

fn validate(model: &ModelGraph, assignment: &Assignment) -> Result<()> {
    for (idx, edge) in model.edges.iter().enumerate() {
        if edge.filtered {
            continue;
        }
        let source = assignment.objects[edge.source.0 as usize];
        let target = assignment.objects[edge.target.0 as usize];
        if let (Some(source), Some(target)) = (source, target) {
            if source != target {
                return Err(CompileError::StraddlingEdge {
                    edge: model.edge_label(idx),
                    src: source,
                    target,
                });
            }
        }
    }

    for (i, component) in assignment.objects.iter().enumerate() {
        if component.is_none() {
            return Err(CompileError::UnassignedObject(
                model.objects[i].label.clone(),
            ));
        }
    }
    for (i, component) in assignment.probes.iter().enumerate() {
        if component.is_none() {
            return Err(CompileError::UnassignedProbe(model.probes[i].label.clone()));
        }
    }
    Ok(())
}
