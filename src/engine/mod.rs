// Engine — the per-item cache state machine and the pieces it owns.

pub mod handle;
pub mod orchestrator;
pub mod progress;
pub mod reachability;
pub mod size;
pub mod state;
