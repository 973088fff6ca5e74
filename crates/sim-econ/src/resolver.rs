//! Turn parameter resolution and profit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::TurnSpec;

use crate::effects::EffectSummary;

/// Turn parameters after effects are applied. Never written back to the
/// base [`TurnSpec`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveTurn {
    pub min_demand: i64,
    pub max_capacity: i64,
    pub unit_profit: i64,
}

/// `floor(base * multiplier)`, clamped to a minimum of zero.
///
/// Saturates at `i64::MAX` instead of overflowing.
pub fn scale_floor(base: i64, multiplier: Decimal) -> i64 {
    match Decimal::from(base).checked_mul(multiplier) {
        Some(v) => v.floor().to_i64().unwrap_or(i64::MAX).max(0),
        None if (base < 0) != (multiplier < Decimal::ZERO) => 0,
        None => i64::MAX,
    }
}

/// Apply the demand-band and profit multipliers to the base turn.
pub fn resolve_turn(base: &TurnSpec, effects: &EffectSummary) -> EffectiveTurn {
    EffectiveTurn {
        min_demand: scale_floor(base.min_demand, effects.demand_band),
        max_capacity: scale_floor(base.max_capacity, effects.demand_band),
        unit_profit: scale_floor(base.unit_profit, effects.profit),
    }
}

/// Production of one active resource under the current production multiplier.
pub fn effective_production(base_units: u32, effects: &EffectSummary) -> i64 {
    scale_floor(i64::from(base_units), effects.production)
}

/// Profit for the turn: zero below minimum demand, otherwise production
/// capped at maximum capacity times unit profit.
///
/// `min_demand <= max_capacity` is not assumed.
pub fn turn_profit(production: i64, turn: &EffectiveTurn) -> i64 {
    if production < turn.min_demand {
        return 0;
    }
    production
        .min(turn.max_capacity)
        .saturating_mul(turn.unit_profit)
}
