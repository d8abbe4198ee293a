//! Result stores.

pub mod memory;

pub use memory::ResultStore;
