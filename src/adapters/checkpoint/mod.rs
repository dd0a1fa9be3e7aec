//! Checkpoint storage backends

pub mod file;
pub mod memory;

pub use file::FileCheckpointStorage;
pub use memory::MemoryCheckpointStorage;
