//! In-process storage for pending tasks and their results.

pub mod queue;
pub mod store;

pub use queue::PriorityQueue;
pub use store::ResultStore;
