//! Configuration models for the task manager and its pools.

pub mod manager;
pub mod pool;

pub use manager::ManagerConfig;
pub use pool::ThreadPoolConfig;
