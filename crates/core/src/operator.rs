use serde::{Deserialize, Serialize};

use crate::cell::CellRef;
use crate::id::Component;

/// A typed unit of computation over state cells.
///
/// The set of kinds is closed: encoding matches exhaustively, so adding a
/// kind is a compile-time exhaustiveness failure rather than a runtime
/// "unknown operator" path.
///
/// Every operator exposes four disjoint footprint sets over cells, derived
/// from its variant: `sets` (overwrites), `incs` (accumulates into), `reads`
/// (pure reads) and `updates` (writes a value consumed on the next step —
/// the only footprint kind eligible to be split across a component boundary).
///
/// `Send`, `Recv` and `Wait` are synthetic placeholders created only by the
/// schedule compiler. They have no executable behavior of their own; they
/// occupy a slot in a component's local order and carry routing metadata
/// (peer component, message tag, transferred cell).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    /// `dst <- value`
    Reset { dst: CellRef, value: f64 },
    /// `dst <- src`
    Copy { dst: CellRef, src: CellRef },
    /// `y += a . x`
    DotInc { a: CellRef, x: CellRef, y: CellRef },
    /// `y += a * x` elementwise
    ElementwiseInc { a: CellRef, x: CellRef, y: CellRef },

    /// Leaky integrate-and-fire population step.
    Lif {
        n_units: usize,
        tau_rc: f64,
        tau_ref: f64,
        min_voltage: f64,
        j: CellRef,
        output: CellRef,
        voltage: CellRef,
        ref_time: CellRef,
    },
    /// Rate-mode LIF population step.
    LifRate {
        n_units: usize,
        tau_rc: f64,
        tau_ref: f64,
        j: CellRef,
        output: CellRef,
    },
    /// Adaptive LIF population step.
    AdaptiveLif {
        n_units: usize,
        tau_n: f64,
        inc_n: f64,
        tau_rc: f64,
        tau_ref: f64,
        min_voltage: f64,
        j: CellRef,
        output: CellRef,
        voltage: CellRef,
        ref_time: CellRef,
        adaptation: CellRef,
    },
    /// Adaptive rate-mode LIF population step.
    AdaptiveLifRate {
        n_units: usize,
        tau_n: f64,
        inc_n: f64,
        tau_rc: f64,
        tau_ref: f64,
        j: CellRef,
        output: CellRef,
        adaptation: CellRef,
    },
    /// Rectified-linear population step.
    RectifiedLinear {
        n_units: usize,
        j: CellRef,
        output: CellRef,
    },
    /// Sigmoid population step.
    Sigmoid {
        n_units: usize,
        tau_ref: f64,
        j: CellRef,
        output: CellRef,
    },
    /// Izhikevich population step.
    Izhikevich {
        n_units: usize,
        tau_recovery: f64,
        coupling: f64,
        reset_voltage: f64,
        reset_recovery: f64,
        j: CellRef,
        output: CellRef,
        voltage: CellRef,
        recovery: CellRef,
    },

    /// Denominator-free discretized filter: `output <- b * input`.
    NoDenSynapse {
        input: CellRef,
        output: CellRef,
        b: f64,
    },
    /// First-order discretized filter: `output <- -a * output + b * input`.
    SimpleSynapse {
        input: CellRef,
        output: CellRef,
        a: f64,
        b: f64,
    },
    /// General discretized linear filter with numerator/denominator taps.
    Synapse {
        input: CellRef,
        output: CellRef,
        num: Vec<f64>,
        den: Vec<f64>,
    },

    /// Placeholder: transmit `cell` to component `dst` under `tag`.
    Send {
        dst: Component,
        tag: u32,
        cell: CellRef,
    },
    /// Placeholder: receive `cell` from component `src` under `tag`.
    Recv {
        src: Component,
        tag: u32,
        cell: CellRef,
    },
    /// Placeholder: block until `cell` is settled on this side. Sets the cell
    /// so the dependency ordering treats it as written here.
    Wait { cell: CellRef },
}

impl Operator {
    /// Cells this operator overwrites.
    pub fn sets(&self) -> Vec<CellRef> {
        match self {
            Operator::Reset { dst, .. } => vec![*dst],
            Operator::Copy { dst, .. } => vec![*dst],
            Operator::Wait { cell } => vec![*cell],
            _ => vec![],
        }
    }

    /// Cells this operator accumulates into.
    pub fn incs(&self) -> Vec<CellRef> {
        match self {
            Operator::DotInc { y, .. } | Operator::ElementwiseInc { y, .. } => vec![*y],
            _ => vec![],
        }
    }

    /// Cells this operator only reads.
    pub fn reads(&self) -> Vec<CellRef> {
        match self {
            Operator::Reset { .. } => vec![],
            Operator::Copy { src, .. } => vec![*src],
            Operator::DotInc { a, x, .. } | Operator::ElementwiseInc { a, x, .. } => {
                vec![*a, *x]
            }
            Operator::Lif { j, .. }
            | Operator::LifRate { j, .. }
            | Operator::AdaptiveLif { j, .. }
            | Operator::AdaptiveLifRate { j, .. }
            | Operator::RectifiedLinear { j, .. }
            | Operator::Sigmoid { j, .. }
            | Operator::Izhikevich { j, .. } => vec![*j],
            Operator::NoDenSynapse { input, .. }
            | Operator::SimpleSynapse { input, .. }
            | Operator::Synapse { input, .. } => vec![*input],
            Operator::Send { .. } | Operator::Recv { .. } | Operator::Wait { .. } => vec![],
        }
    }

    /// Cells this operator writes for consumption on the next step.
    pub fn updates(&self) -> Vec<CellRef> {
        match self {
            Operator::Lif {
                output,
                voltage,
                ref_time,
                ..
            } => vec![*output, *voltage, *ref_time],
            Operator::LifRate { output, .. } => vec![*output],
            Operator::AdaptiveLif {
                output,
                voltage,
                ref_time,
                adaptation,
                ..
            } => vec![*output, *voltage, *ref_time, *adaptation],
            Operator::AdaptiveLifRate {
                output, adaptation, ..
            } => vec![*output, *adaptation],
            Operator::RectifiedLinear { output, .. } | Operator::Sigmoid { output, .. } => {
                vec![*output]
            }
            Operator::Izhikevich {
                output,
                voltage,
                recovery,
                ..
            } => vec![*output, *voltage, *recovery],
            Operator::NoDenSynapse { output, .. }
            | Operator::SimpleSynapse { output, .. }
            | Operator::Synapse { output, .. } => vec![*output],
            _ => vec![],
        }
    }

    /// Every cell referenced by this operator, footprints and routing
    /// metadata alike. Used to collect the cells a component needs.
    pub fn all_cells(&self) -> Vec<CellRef> {
        match self {
            Operator::Send { cell, .. } | Operator::Recv { cell, .. } => vec![*cell],
            _ => {
                let mut cells = self.sets();
                cells.extend(self.incs());
                cells.extend(self.reads());
                cells.extend(self.updates());
                cells
            }
        }
    }

    /// True for the synthetic Send/Recv/Wait placeholders.
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            Operator::Send { .. } | Operator::Recv { .. } | Operator::Wait { .. }
        )
    }

    /// Short kind name, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Operator::Reset { .. } => "Reset",
            Operator::Copy { .. } => "Copy",
            Operator::DotInc { .. } => "DotInc",
            Operator::ElementwiseInc { .. } => "ElementwiseInc",
            Operator::Lif { .. } => "Lif",
            Operator::LifRate { .. } => "LifRate",
            Operator::AdaptiveLif { .. } => "AdaptiveLif",
            Operator::AdaptiveLifRate { .. } => "AdaptiveLifRate",
            Operator::RectifiedLinear { .. } => "RectifiedLinear",
            Operator::Sigmoid { .. } => "Sigmoid",
            Operator::Izhikevich { .. } => "Izhikevich",
            Operator::NoDenSynapse { .. } => "NoDenSynapse",
            Operator::SimpleSynapse { .. } => "SimpleSynapse",
            Operator::Synapse { .. } => "Synapse",
            Operator::Send { .. } => "Send",
            Operator::Recv { .. } => "Recv",
            Operator::Wait { .. } => "Wait",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellArena, Shape};

    fn reg(arena: &mut CellArena, label: &str, n: usize) -> CellRef {
        let id = arena.register(label, Shape::vector(n));
        arena.full_ref(id)
    }

    #[test]
    fn footprints_are_disjoint() {
        let mut arena = CellArena::new();
        let input = reg(&mut arena, "in", 3);
        let output = reg(&mut arena, "out", 3);

        let op = Operator::SimpleSynapse {
            input,
            output,
            a: -0.5,
            b: 0.5,
        };

        let reads = op.reads();
        let updates = op.updates();
        assert_eq!(reads.len(), 1);
        assert_eq!(updates.len(), 1);
        assert!(op.sets().is_empty());
        assert!(op.incs().is_empty());
        assert_ne!(reads[0].key, updates[0].key);
    }

    #[test]
    fn wait_sets_its_cell() {
        let mut arena = CellArena::new();
        let cell = reg(&mut arena, "c", 2);

        let op = Operator::Wait { cell };
        assert_eq!(op.sets(), vec![cell]);
        assert!(op.updates().is_empty());
        assert!(op.is_placeholder());
    }

    #[test]
    fn placeholders_carry_routing_cells() {
        let mut arena = CellArena::new();
        let cell = reg(&mut arena, "c", 2);

        let send = Operator::Send {
            dst: 1,
            tag: 7,
            cell,
        };
        assert!(send.sets().is_empty() && send.updates().is_empty());
        assert_eq!(send.all_cells(), vec![cell]);
    }
}
