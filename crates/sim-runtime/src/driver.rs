//! Simulation driver: owns run state and executes turns in order.

use serde::Serialize;
use sim_ai::{PolicyView, PurchasePolicy};
use sim_core::{Catalog, ResourceId, Scenario, SimConfig, TurnSpec, ValidationError};
use sim_econ::Accumulator;
use tracing::info;

use crate::executor::{execute_turn, EngineState, TurnReport};
use crate::lifecycle::InstanceSet;

/// Final state of a completed run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub initial_budget: i64,
    pub final_budget: i64,
    pub final_accumulator: Accumulator,
    pub turns: Vec<TurnReport>,
}

impl RunSummary {
    pub fn total_profit(&self) -> i64 {
        self.turns.iter().map(|t| t.profit).sum()
    }

    pub fn total_maintenance(&self) -> i64 {
        self.turns.iter().map(|t| t.maintenance).sum()
    }

    /// Every purchase made, as `(turn, ids)`, skipping turns without one.
    pub fn purchases(&self) -> impl Iterator<Item = (usize, &[ResourceId])> {
        self.turns
            .iter()
            .filter(|t| !t.purchased.is_empty())
            .map(|t| (t.turn, t.purchased.as_slice()))
    }
}

/// A single run over a validated scenario.
#[derive(Debug)]
pub struct Simulation {
    catalog: Catalog,
    turns: Vec<TurnSpec>,
    config: SimConfig,
    initial_budget: i64,
    state: EngineState,
    reports: Vec<TurnReport>,
}

impl Simulation {
    /// Validate `scenario` and prepare a run. No turn executes on error.
    pub fn new(scenario: Scenario, config: SimConfig) -> Result<Self, ValidationError> {
        let catalog = Catalog::new(scenario.resources)?;
        info!(
            budget = scenario.initial_budget,
            resources = catalog.len(),
            turns = scenario.turns.len(),
            "simulation initialized"
        );
        Ok(Self {
            catalog,
            reports: Vec::with_capacity(scenario.turns.len()),
            turns: scenario.turns,
            config,
            initial_budget: scenario.initial_budget,
            state: EngineState::new(scenario.initial_budget),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn budget(&self) -> i64 {
        self.state.budget
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.state.accumulator
    }

    pub fn instances(&self) -> &InstanceSet {
        &self.state.instances
    }

    pub fn reports(&self) -> &[TurnReport] {
        &self.reports
    }

    /// Index of the next turn to execute.
    pub fn next_turn(&self) -> usize {
        self.reports.len()
    }

    pub fn total_turns(&self) -> usize {
        self.turns.len()
    }

    pub fn is_finished(&self) -> bool {
        self.next_turn() >= self.turns.len()
    }

    /// Execute the next turn with an explicit purchase decision.
    /// Returns `None` once every turn has run.
    pub fn step(&mut self, decision: &[ResourceId]) -> Option<&TurnReport> {
        let turn = self.next_turn();
        let spec = self.turns.get(turn)?;
        let report = execute_turn(
            &mut self.state,
            &self.catalog,
            &self.config,
            turn,
            spec,
            decision,
        );
        self.reports.push(report);
        self.reports.last()
    }

    /// Execute the next turn, asking `policy` what to buy.
    pub fn step_with(&mut self, policy: &mut dyn PurchasePolicy) -> Option<&TurnReport> {
        let turn = self.next_turn();
        let spec = self.turns.get(turn)?;
        let decision = policy.decide(&PolicyView {
            turn,
            budget: self.state.budget,
            catalog: &self.catalog,
            turn_spec: spec,
        });
        self.step(&decision)
    }

    /// Run every remaining turn with `policy` and summarize.
    pub fn run(mut self, policy: &mut dyn PurchasePolicy) -> RunSummary {
        while self.step_with(policy).is_some() {}
        self.finish()
    }

    /// Summarize the run as it stands.
    pub fn finish(self) -> RunSummary {
        info!(
            turns = self.reports.len(),
            final_budget = self.state.budget,
            stored = self.state.accumulator.stored(),
            "simulation finished"
        );
        RunSummary {
            initial_budget: self.initial_budget,
            final_budget: self.state.budget,
            final_accumulator: self.state.accumulator,
            turns: self.reports,
        }
    }
}

/// Validate and run `scenario` to completion.
pub fn run_scenario(
    scenario: Scenario,
    config: SimConfig,
    policy: &mut dyn PurchasePolicy,
) -> Result<RunSummary, ValidationError> {
    Ok(Simulation::new(scenario, config)?.run(policy))
}
