//! Worker tasks that back the runtime orchestration.
//!
//! The simulation worker owns the authoritative action world and executes
//! every command; the ticker only drives its clock.

mod simulation;
mod ticker;

pub use simulation::{Command, HandlerTarget, SimulationWorker};
pub use ticker::spawn_ticker;
