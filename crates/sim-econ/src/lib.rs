#![deny(warnings)]

//! Economic models for Grid Tycoon.
//!
//! This crate provides the pure per-turn economics:
//! - Aggregation of active special effects into multipliers
//! - Resolution of a turn's effective demand band and unit profit
//! - Accumulator (battery) settlement and turn profit
//!
//! Everything here is a function of its inputs; ownership of budget, instances
//! and accumulator state lives in `sim-runtime`.

pub mod accumulator;
pub mod effects;
pub mod resolver;

pub use accumulator::{Accumulator, Settlement};
pub use effects::{
    accumulator_contribution, aggregate_effects, effective_lifetime, lifetime_percent,
    EffectSummary, GreenBalance,
};
pub use resolver::{effective_production, resolve_turn, scale_floor, turn_profit, EffectiveTurn};
