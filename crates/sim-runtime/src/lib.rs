#![deny(warnings)]

//! Turn-based runtime for the simulation: instance lifecycle, turn execution
//! and the driver that owns budget and accumulator state across a run.

pub mod driver;
pub mod executor;
pub mod lifecycle;

pub use driver::{run_scenario, RunSummary, Simulation};
pub use executor::{execute_turn, EngineState, TurnReport};
pub use lifecycle::{DutyState, InstanceSet, PurchaseError, ResourceInstance};
