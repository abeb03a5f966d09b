pub mod assignment;
pub mod partitioner;
pub mod propagate;
pub mod strategy;

pub use assignment::{Assignment, FinalAssignment};
pub use partitioner::Partitioner;
pub use propagate::propagate;
pub use strategy::Strategy;
