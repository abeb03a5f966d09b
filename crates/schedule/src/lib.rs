pub mod compiler;
pub mod split;

pub use compiler::{ComponentSchedule, OrderKey, ScheduleCompiler, Schedules};
pub use split::split_group;
