//! Single-turn execution.
//!
//! The step order is fixed:
//! 1. apply purchases
//! 2. recompute accumulator capacity
//! 3. aggregate effects
//! 4. resolve turn parameters and production
//! 5. settle the accumulator
//! 6. compute profit
//! 7. charge maintenance on every held instance
//! 8. credit profit
//! 9. age instances

use serde::Serialize;
use sim_core::{Catalog, ResourceId, SimConfig, TurnSpec};
use sim_econ::{
    accumulator_contribution, aggregate_effects, resolve_turn, turn_profit, Accumulator,
    EffectiveTurn, Settlement,
};
use tracing::{debug, warn};

use crate::lifecycle::{InstanceSet, PurchaseError};

/// Mutable state carried from one turn to the next.
#[derive(Clone, Debug, Default)]
pub struct EngineState {
    pub budget: i64,
    pub instances: InstanceSet,
    pub accumulator: Accumulator,
}

impl EngineState {
    pub fn new(budget: i64) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }
}

/// Everything observable about one executed turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub turn: usize,
    /// Ids bought this turn, in purchase order.
    pub purchased: Vec<ResourceId>,
    /// Purchases that were skipped.
    pub rejected: Vec<PurchaseError>,
    pub effective: EffectiveTurn,
    /// Production of active instances before accumulator settlement.
    pub raw_production: i64,
    /// Production after settlement; profit is computed from this.
    pub production: i64,
    pub settlement: Settlement,
    pub profit: i64,
    pub maintenance: i64,
    /// Budget at the end of the turn.
    pub budget: i64,
    pub accumulator: Accumulator,
    /// Instances held when aging started.
    pub held: usize,
    /// Template ids of instances that expired this turn.
    pub destroyed: Vec<ResourceId>,
}

/// Run one turn against `state`.
pub fn execute_turn(
    state: &mut EngineState,
    catalog: &Catalog,
    config: &SimConfig,
    turn: usize,
    spec: &TurnSpec,
    decision: &[ResourceId],
) -> TurnReport {
    // 1. purchases
    let mut purchased = Vec::with_capacity(decision.len());
    let mut rejected = Vec::new();
    for &id in decision {
        match state.instances.purchase(
            catalog,
            id,
            &mut state.budget,
            config.lifetime_effects,
        ) {
            Ok(_) => purchased.push(id),
            Err(e) => {
                warn!(turn, error = %e, "purchase skipped");
                rejected.push(e);
            }
        }
    }

    // 2. accumulator capacity from active accumulators
    let (present, capacity) = accumulator_contribution(state.instances.active_effects(catalog));
    let shed = state.accumulator.recompute_capacity(capacity);

    // 3-4. effects, effective parameters and production
    let effects = aggregate_effects(state.instances.active_effects(catalog));
    let effective = resolve_turn(spec, &effects);
    let raw_production = state.instances.production(catalog, &effects);

    // 5. battery
    let settlement = state
        .accumulator
        .settle(raw_production, &effective, present, shed);
    let production = settlement.production;

    // 6-8. profit, maintenance, budget
    let profit = turn_profit(production, &effective);
    let maintenance = state.instances.maintenance_cost(catalog);
    state.budget = state.budget.saturating_sub(maintenance).saturating_add(profit);

    // 9. aging
    let held = state.instances.len();
    let destroyed = state.instances.age(catalog);

    debug!(
        turn,
        budget = state.budget,
        production,
        profit,
        maintenance,
        stored = state.accumulator.stored(),
        "turn complete"
    );

    TurnReport {
        turn,
        purchased,
        rejected,
        effective,
        raw_production,
        production,
        settlement,
        profit,
        maintenance,
        budget: state.budget,
        accumulator: state.accumulator,
        held,
        destroyed,
    }
}
