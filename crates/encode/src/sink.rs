use crate::plan::{ComponentBlock, Plan};

/// Destination for encoded plan records.
///
/// The encoder drives a sink uniformly, so the file container and an
/// attached in-process backend receive behaviorally identical per-component
/// schedules: same signals, same operator records, same order.
pub trait PlanSink {
    fn add_signal(&mut self, component: usize, key: u64, shape: [u16; 2], label: &str, data: &[f64]);
    fn add_operator(&mut self, component: usize, record: String);
    fn add_probe(&mut self, component: usize, record: String);
}

/// Accumulates records into an in-memory [`Plan`] container.
pub struct PlanBuilder {
    plan: Plan,
}

impl PlanBuilder {
    pub fn new(dt: f64, n_components: usize) -> Self {
        Self {
            plan: Plan {
                dt,
                n_components,
                components: vec![ComponentBlock::default(); n_components],
                probe_info: Vec::new(),
            },
        }
    }

    pub fn finish(self) -> Plan {
        self.plan
    }
}

impl PlanSink for PlanBuilder {
    fn add_signal(
        &mut self,
        component: usize,
        key: u64,
        shape: [u16; 2],
        label: &str,
        data: &[f64],
    ) {
        let block = &mut self.plan.components[component];
        block.signals.extend_from_slice(data);
        block.signal_keys.push(key);
        block.signal_shapes.push(shape);
        block.signal_labels.push(label.to_string());
    }

    fn add_operator(&mut self, component: usize, record: String) {
        self.plan.components[component].operators.push(record);
    }

    fn add_probe(&mut self, component: usize, record: String) {
        self.plan.components[component].probes.push(record.clone());
        self.plan.probe_info.push(record);
    }
}
