//! Resource instance lifecycle: purchase, duty cycle and expiry.

use serde::Serialize;
use sim_core::{Catalog, Effect, LifetimeEffectPolicy, ResourceId, ResourceTemplate, TemplateIndex};
use sim_econ::{effective_lifetime, effective_production, lifetime_percent, EffectSummary};
use thiserror::Error;
use tracing::debug;

/// Duty-cycle state of a held instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DutyState {
    Active,
    Downtime,
}

/// One purchased copy of a template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceInstance {
    /// Catalog position of the originating template.
    pub template: TemplateIndex,
    /// Turns aged since purchase.
    pub elapsed: u32,
    /// Turns left before the duty state toggles.
    pub remaining_in_state: u32,
    pub state: DutyState,
    /// Lifetime fixed at purchase, after any lifetime effect.
    pub effective_lifetime: u32,
}

impl ResourceInstance {
    fn new(template: TemplateIndex, def: &ResourceTemplate, effective_lifetime: u32) -> Self {
        Self {
            template,
            elapsed: 0,
            remaining_in_state: def.active_turns,
            state: DutyState::Active,
            effective_lifetime,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == DutyState::Active
    }
}

/// Reasons a single purchase is skipped. Neither is fatal to the run.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum PurchaseError {
    #[error("unknown resource id {0}")]
    UnknownResource(ResourceId),
    #[error("resource {id} costs {cost}, budget is {budget}")]
    InsufficientBudget {
        id: ResourceId,
        cost: i64,
        budget: i64,
    },
}

/// All instances currently held, in purchase order.
#[derive(Clone, Debug, Default)]
pub struct InstanceSet {
    instances: Vec<ResourceInstance>,
}

impl InstanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceInstance> {
        self.instances.iter()
    }

    /// Effects of the instances in the active state, in purchase order.
    pub fn active_effects<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = &'a Effect> + 'a {
        self.instances
            .iter()
            .filter(|i| i.is_active())
            .map(move |i| &catalog.get(i.template).effect)
    }

    /// Buy one copy of `id`, debiting `budget`.
    ///
    /// On error nothing is mutated. The new instance's lifetime is scaled by
    /// the lifetime effects active at this moment, combined per `policy`.
    pub fn purchase(
        &mut self,
        catalog: &Catalog,
        id: ResourceId,
        budget: &mut i64,
        policy: LifetimeEffectPolicy,
    ) -> Result<TemplateIndex, PurchaseError> {
        let idx = catalog.lookup(id).ok_or(PurchaseError::UnknownResource(id))?;
        let def = catalog.get(idx);
        if *budget < def.activation_cost {
            return Err(PurchaseError::InsufficientBudget {
                id,
                cost: def.activation_cost,
                budget: *budget,
            });
        }
        let pct = lifetime_percent(self.active_effects(catalog), policy);
        let lifetime = effective_lifetime(def.lifetime, pct);
        *budget -= def.activation_cost;
        self.instances.push(ResourceInstance::new(idx, def, lifetime));
        debug!(%id, cost = def.activation_cost, lifetime, "purchased");
        Ok(idx)
    }

    /// Total production of active instances under the turn's effects.
    pub fn production(&self, catalog: &Catalog, effects: &EffectSummary) -> i64 {
        self.instances
            .iter()
            .filter(|i| i.is_active())
            .map(|i| effective_production(catalog.get(i.template).production_units, effects))
            .fold(0i64, i64::saturating_add)
    }

    /// Maintenance owed for every held instance, active or in downtime.
    pub fn maintenance_cost(&self, catalog: &Catalog) -> i64 {
        self.instances
            .iter()
            .map(|i| catalog.get(i.template).maintenance_cost)
            .fold(0i64, i64::saturating_add)
    }

    /// Advance every instance by one turn and drop the expired ones.
    ///
    /// Expiry is checked before the duty toggle and takes priority. Returns
    /// the template ids of destroyed instances.
    pub fn age(&mut self, catalog: &Catalog) -> Vec<ResourceId> {
        let mut destroyed = Vec::new();
        self.instances.retain_mut(|inst| {
            let def = catalog.get(inst.template);
            inst.elapsed += 1;
            if inst.elapsed >= inst.effective_lifetime {
                destroyed.push(def.id);
                return false;
            }
            inst.remaining_in_state = inst.remaining_in_state.saturating_sub(1);
            if inst.remaining_in_state == 0 {
                let (state, turns) = match inst.state {
                    DutyState::Active => (DutyState::Downtime, def.downtime_turns),
                    DutyState::Downtime => (DutyState::Active, def.active_turns),
                };
                inst.state = state;
                inst.remaining_in_state = turns;
            }
            true
        });
        if !destroyed.is_empty() {
            debug!(count = destroyed.len(), "instances expired");
        }
        destroyed
    }
}
