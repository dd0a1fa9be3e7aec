// Checkpoint state and run window selection

pub mod checkpoint;
pub mod manager;

pub use checkpoint::Checkpoint;
pub use manager::{Cutoff, StateManager};
