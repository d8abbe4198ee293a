//! Pending-task queues.

pub mod memory;

pub use memory::PriorityQueue;
