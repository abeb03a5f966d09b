pub mod pipeline;
pub mod plan;
pub mod record;
pub mod sink;

pub use pipeline::{compile, encode_schedules};
pub use plan::{ComponentBlock, Plan};
pub use record::{
    decode_cell_ref, decode_operator, encode_cell_ref, encode_operator, encode_probe,
    sanitize_label,
};
pub use sink::{PlanBuilder, PlanSink};
