use tracing::debug;

use splitbrain_core::{CompilerConfig, Result};
use splitbrain_graph::ModelGraph;
use splitbrain_partition::{FinalAssignment, Partitioner};
use splitbrain_schedule::{ScheduleCompiler, Schedules};

use crate::plan::Plan;
use crate::record::{encode_operator, encode_probe, sanitize_label};
use crate::sink::{PlanBuilder, PlanSink};

/// Run the whole compilation: coarsen, partition, propagate and validate,
/// compile schedules, encode. Any stage error aborts the compilation before
/// a plan exists; there is no partially built output.
pub fn compile(model: &ModelGraph, config: &CompilerConfig) -> Result<Plan> {
    let partitioner = Partitioner::from_config(config)?;
    let (n_components, assignment) = partitioner.partition(model)?;

    let mut compiler = ScheduleCompiler::new();
    let schedules = compiler.compile(model, &assignment, n_components)?;

    let mut builder = PlanBuilder::new(config.dt, n_components);
    encode_schedules(&mut builder, model, &schedules, &assignment, config.dt);
    Ok(builder.finish())
}

/// Push the compiled schedules into a sink: per component, every needed cell
/// (a cross-component cell is pushed independently on each side), then the
/// operator records in final local order, then the probe records.
pub fn encode_schedules(
    sink: &mut dyn PlanSink,
    model: &ModelGraph,
    schedules: &Schedules,
    assignment: &FinalAssignment,
    dt: f64,
) {
    for (component, schedule) in schedules.components.iter().enumerate() {
        for &cell_id in &schedule.cells {
            let cell = model.cells.get(cell_id);
            sink.add_signal(
                component,
                cell_id.key(),
                [cell.shape.rows as u16, cell.shape.cols as u16],
                &sanitize_label(&cell.label),
                &cell.data,
            );
        }
        for &op_id in &schedule.ops {
            sink.add_operator(component, encode_operator(schedules.op(op_id)));
        }
        debug!(
            component,
            signals = schedule.cells.len(),
            operators = schedule.ops.len(),
            "encoded component"
        );
    }

    for (index, probe) in model.probes.iter().enumerate() {
        let component = assignment.probes[index];
        let period = probe
            .sample_interval
            .map(|interval| (interval / dt).round() as u64)
            .unwrap_or(1);
        let record = encode_probe(component, index as u64, &probe.target, period, &probe.label);
        sink.add_probe(component, record);
    }
}
