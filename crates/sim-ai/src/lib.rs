#![deny(warnings)]

//! Purchase decision policies.
//!
//! The engine never decides what to buy; it asks a [`PurchasePolicy`] once per
//! turn and only validates affordability. The policies here are simple,
//! deterministic collaborators for the CLI and tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use sim_core::{Catalog, ResourceId, TurnSpec};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Read-only snapshot handed to a policy at the start of a turn.
#[derive(Clone, Copy, Debug)]
pub struct PolicyView<'a> {
    /// Zero-based turn index.
    pub turn: usize,
    /// Budget before this turn's purchases.
    pub budget: i64,
    /// Purchasable templates.
    pub catalog: &'a Catalog,
    /// Base parameters of the turn about to run.
    pub turn_spec: &'a TurnSpec,
}

/// Supplies the ids to buy for one turn, in purchase order.
pub trait PurchasePolicy {
    fn decide(&mut self, view: &PolicyView<'_>) -> Vec<ResourceId>;
}

/// Never buys anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Idle;

impl PurchasePolicy for Idle {
    fn decide(&mut self, _view: &PolicyView<'_>) -> Vec<ResourceId> {
        Vec::new()
    }
}

/// Buys one copy of the template with the lowest activation cost whenever
/// the budget covers it. Ties go to the earliest template in the catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheapestAffordable;

impl PurchasePolicy for CheapestAffordable {
    fn decide(&mut self, view: &PolicyView<'_>) -> Vec<ResourceId> {
        let cheapest = view
            .catalog
            .iter()
            .map(|(_, t)| t)
            .min_by_key(|t| t.activation_cost);
        match cheapest {
            Some(t) if view.budget >= t.activation_cost => vec![t.id],
            _ => Vec::new(),
        }
    }
}

/// Picks one affordable template per turn uniformly at random.
///
/// Seeded for reproducibility.
#[derive(Debug, Clone)]
pub struct RandomAffordable {
    rng: ChaCha8Rng,
}

impl RandomAffordable {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl PurchasePolicy for RandomAffordable {
    fn decide(&mut self, view: &PolicyView<'_>) -> Vec<ResourceId> {
        let affordable: Vec<ResourceId> = view
            .catalog
            .iter()
            .filter(|(_, t)| t.activation_cost <= view.budget)
            .map(|(_, t)| t.id)
            .collect();
        if affordable.is_empty() {
            return Vec::new();
        }
        let pick = affordable[self.rng.gen_range(0..affordable.len())];
        vec![pick]
    }
}

/// Errors produced while loading a purchase plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid plan: {0}")]
    Invalid(#[from] serde_yaml::Error),
}

/// Replays a fixed turn-to-ids plan. Turns absent from the plan buy nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedPlan {
    plan: BTreeMap<usize, Vec<ResourceId>>,
}

impl ScriptedPlan {
    pub fn new(plan: BTreeMap<usize, Vec<ResourceId>>) -> Self {
        Self { plan }
    }

    /// Parse a YAML mapping of turn index to template ids, e.g. `0: [5, 7]`.
    pub fn from_yaml(text: &str) -> Result<Self, PlanError> {
        #[derive(Deserialize)]
        #[serde(transparent)]
        struct PlanFile(BTreeMap<usize, Vec<u32>>);

        let PlanFile(raw) = serde_yaml::from_str(text)?;
        let plan = raw
            .into_iter()
            .map(|(turn, ids)| (turn, ids.into_iter().map(ResourceId).collect()))
            .collect();
        Ok(Self { plan })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Number of turns with at least one scheduled purchase.
    pub fn scheduled_turns(&self) -> usize {
        self.plan.values().filter(|ids| !ids.is_empty()).count()
    }
}

impl PurchasePolicy for ScriptedPlan {
    fn decide(&mut self, view: &PolicyView<'_>) -> Vec<ResourceId> {
        let ids = self.plan.get(&view.turn).cloned().unwrap_or_default();
        if !ids.is_empty() {
            debug!(turn = view.turn, count = ids.len(), "scripted purchases");
        }
        ids
    }
}
