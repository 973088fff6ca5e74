#![deny(warnings)]

//! Core domain models and invariants for Grid Tycoon.
//!
//! This crate defines the serializable resource catalog, turn definitions and
//! simulation configuration shared by the engine, with validation helpers that
//! reject malformed scenarios before any turn is executed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Identifier of a purchasable resource template as it appears in input files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a template inside a [`Catalog`].
///
/// Instances hold this index rather than a reference to the template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateIndex(pub usize);

/// Special effect a resource exerts while it is active.
///
/// Percentage payloads are signed: non-negative values are "green" and
/// amplify, negative values are "non-green" and dampen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "magnitude")]
pub enum Effect {
    /// Scales the production of every active resource (code `A`).
    #[serde(rename = "A")]
    ProductionMultiplier(i64),
    /// Scales the turn's minimum demand and maximum capacity (code `B`).
    #[serde(rename = "B")]
    DemandBandMultiplier(i64),
    /// Scales the lifetime of resources bought while it is active (code `C`).
    #[serde(rename = "C")]
    LifetimeMultiplier(i64),
    /// Scales the per-unit profit of the turn (code `D`).
    #[serde(rename = "D")]
    ProfitMultiplier(i64),
    /// Adds storage capacity to the accumulator (code `E`).
    #[serde(rename = "E")]
    Accumulator(i64),
    /// No special effect (code `X`).
    #[serde(rename = "X")]
    None,
}

impl Effect {
    /// Build an effect from its single-letter code and optional magnitude.
    pub fn from_code(code: char, magnitude: Option<i64>) -> Result<Self, ValidationError> {
        let needs = |m: Option<i64>| m.ok_or(ValidationError::MissingEffectMagnitude(code));
        match code {
            'A' => Ok(Effect::ProductionMultiplier(needs(magnitude)?)),
            'B' => Ok(Effect::DemandBandMultiplier(needs(magnitude)?)),
            'C' => Ok(Effect::LifetimeMultiplier(needs(magnitude)?)),
            'D' => Ok(Effect::ProfitMultiplier(needs(magnitude)?)),
            'E' => Ok(Effect::Accumulator(needs(magnitude)?)),
            'X' => match magnitude {
                None | Some(0) => Ok(Effect::None),
                Some(m) => Err(ValidationError::UnexpectedEffectMagnitude(m)),
            },
            other => Err(ValidationError::UnknownEffectCode(other)),
        }
    }

    /// Single-letter code used by the input format.
    pub fn code(&self) -> char {
        match self {
            Effect::ProductionMultiplier(_) => 'A',
            Effect::DemandBandMultiplier(_) => 'B',
            Effect::LifetimeMultiplier(_) => 'C',
            Effect::ProfitMultiplier(_) => 'D',
            Effect::Accumulator(_) => 'E',
            Effect::None => 'X',
        }
    }

    /// Signed magnitude, `None` for [`Effect::None`].
    pub fn magnitude(&self) -> Option<i64> {
        match *self {
            Effect::ProductionMultiplier(m)
            | Effect::DemandBandMultiplier(m)
            | Effect::LifetimeMultiplier(m)
            | Effect::ProfitMultiplier(m)
            | Effect::Accumulator(m) => Some(m),
            Effect::None => None,
        }
    }
}

/// Immutable definition of a purchasable resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// Template identifier (`RI`).
    pub id: ResourceId,
    /// One-time budget debit on purchase (`RA`).
    pub activation_cost: i64,
    /// Budget debit for every turn the instance is held (`RP`).
    pub maintenance_cost: i64,
    /// Length of each active period in turns (`RW`). Zero behaves like one.
    pub active_turns: u32,
    /// Length of each downtime period in turns (`RM`).
    pub downtime_turns: u32,
    /// Total turns an instance survives, active and downtime combined (`RL`).
    /// Zero means the instance expires at its first aging step.
    pub lifetime: u32,
    /// Buildings powered per active turn (`RU`).
    pub production_units: u32,
    /// Special effect while active (`RT` and `RE`).
    pub effect: Effect,
}

/// Base demand and profit parameters for a single turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSpec {
    /// Minimum buildings that must be powered to earn anything (`TM`).
    pub min_demand: i64,
    /// Maximum buildings that can be paid for (`TX`).
    pub max_capacity: i64,
    /// Profit per powered building (`TR`).
    pub unit_profit: i64,
}

/// Everything a run needs: starting budget, catalog and turn sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Starting budget (`D`).
    pub initial_budget: i64,
    /// Purchasable templates in input order.
    pub resources: Vec<ResourceTemplate>,
    /// One entry per turn, in turn order.
    pub turns: Vec<TurnSpec>,
}

/// How concurrently active lifetime effects combine at purchase time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifetimeEffectPolicy {
    /// Only the first active lifetime effect, in purchase order, applies.
    #[default]
    FirstActiveWins,
    /// All active lifetime percentages are summed.
    Stack,
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Combination rule for lifetime effects.
    #[serde(default)]
    pub lifetime_effects: LifetimeEffectPolicy,
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Effect code requires a magnitude that was not supplied.
    #[error("effect {0} requires a magnitude")]
    MissingEffectMagnitude(char),
    /// Effect `X` was given a non-zero magnitude.
    #[error("effect X takes no magnitude, got {0}")]
    UnexpectedEffectMagnitude(i64),
    /// Effect code outside {A, B, C, D, E, X}.
    #[error("unknown effect code '{0}'")]
    UnknownEffectCode(char),
    /// Two templates share one identifier.
    #[error("duplicate resource id {0}")]
    DuplicateResource(ResourceId),
}

/// Validate a whole scenario. Durations are unsigned and effects carry their
/// magnitude by construction, so what remains is identifier uniqueness.
pub fn validate_scenario(s: &Scenario) -> Result<(), ValidationError> {
    Catalog::new(s.resources.clone()).map(|_| ())
}

/// Immutable, validated set of resource templates indexed by id.
#[derive(Clone, Debug)]
pub struct Catalog {
    templates: Vec<ResourceTemplate>,
    by_id: BTreeMap<ResourceId, TemplateIndex>,
}

impl Catalog {
    /// Index `templates` by id; input order is preserved.
    pub fn new(templates: Vec<ResourceTemplate>) -> Result<Self, ValidationError> {
        let mut by_id = BTreeMap::new();
        for (i, t) in templates.iter().enumerate() {
            if by_id.insert(t.id, TemplateIndex(i)).is_some() {
                return Err(ValidationError::DuplicateResource(t.id));
            }
        }
        Ok(Self { templates, by_id })
    }

    /// Resolve an identifier to its catalog index.
    pub fn lookup(&self, id: ResourceId) -> Option<TemplateIndex> {
        self.by_id.get(&id).copied()
    }

    /// Template at `idx`. Indices only come from [`Catalog::lookup`] or
    /// [`Catalog::iter`], so they are always in range.
    pub fn get(&self, idx: TemplateIndex) -> &ResourceTemplate {
        &self.templates[idx.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateIndex, &ResourceTemplate)> {
        self.templates
            .iter()
            .enumerate()
            .map(|(i, t)| (TemplateIndex(i), t))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn template(id: u32, effect: Effect) -> ResourceTemplate {
        ResourceTemplate {
            id: ResourceId(id),
            activation_cost: 100,
            maintenance_cost: 10,
            active_turns: 2,
            downtime_turns: 1,
            lifetime: 5,
            production_units: 3,
            effect,
        }
    }

    #[test]
    fn effect_codes_roundtrip() {
        for code in ['A', 'B', 'C', 'D', 'E'] {
            let e = Effect::from_code(code, Some(-15)).unwrap();
            assert_eq!(e.code(), code);
            assert_eq!(e.magnitude(), Some(-15));
        }
        assert_eq!(Effect::from_code('X', None).unwrap(), Effect::None);
        assert_eq!(Effect::None.magnitude(), None);
    }

    #[test]
    fn effect_requires_magnitude_unless_none() {
        assert_eq!(
            Effect::from_code('B', None),
            Err(ValidationError::MissingEffectMagnitude('B'))
        );
        assert_eq!(
            Effect::from_code('X', Some(5)),
            Err(ValidationError::UnexpectedEffectMagnitude(5))
        );
        assert_eq!(
            Effect::from_code('Q', Some(5)),
            Err(ValidationError::UnknownEffectCode('Q'))
        );
    }

    #[test]
    fn serde_effect_is_tagged_by_code() {
        let s = serde_json::to_string(&Effect::Accumulator(20)).unwrap();
        assert_eq!(s, r#"{"kind":"E","magnitude":20}"#);
        let back: Effect = serde_json::from_str(r#"{"kind":"X"}"#).unwrap();
        assert_eq!(back, Effect::None);
    }

    #[test]
    fn catalog_rejects_duplicates() {
        let err = Catalog::new(vec![template(1, Effect::None), template(1, Effect::None)])
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateResource(ResourceId(1)));
    }

    #[test]
    fn catalog_lookup_preserves_input_order() {
        let cat = Catalog::new(vec![template(9, Effect::None), template(4, Effect::None)]).unwrap();
        assert_eq!(cat.lookup(ResourceId(4)), Some(TemplateIndex(1)));
        assert_eq!(cat.lookup(ResourceId(7)), None);
        assert_eq!(cat.get(TemplateIndex(0)).id, ResourceId(9));
        assert_eq!(cat.len(), 2);
    }

    #[test]
    fn zero_durations_and_negative_costs_are_accepted() {
        let mut t = template(3, Effect::None);
        t.lifetime = 0;
        t.active_turns = 0;
        t.activation_cost = -50;
        t.maintenance_cost = -5;
        let cat = Catalog::new(vec![t]).unwrap();
        assert_eq!(cat.lookup(ResourceId(3)), Some(TemplateIndex(0)));
    }

    #[test]
    fn scenario_snapshot_roundtrip() {
        let scenario = Scenario {
            initial_budget: 1000,
            resources: vec![template(1, Effect::LifetimeMultiplier(-20))],
            turns: vec![TurnSpec {
                min_demand: 1,
                max_capacity: 5,
                unit_profit: 10,
            }],
        };
        validate_scenario(&scenario).unwrap();
        let s = serde_json::to_string_pretty(&scenario).unwrap();
        let back: Scenario = serde_json::from_str(&s).unwrap();
        assert_eq!(back, scenario);
    }

    #[test]
    fn default_config_is_first_active_wins() {
        let cfg: SimConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.lifetime_effects, LifetimeEffectPolicy::FirstActiveWins);
    }

    proptest! {
        #[test]
        fn distinct_ids_always_index(ids in proptest::collection::btree_set(0u32..1000, 0..20),
                                     ra in -1000i64..1000, rw in 0u32..50, rl in 0u32..200) {
            let templates: Vec<_> = ids
                .iter()
                .map(|&id| ResourceTemplate {
                    activation_cost: ra,
                    active_turns: rw,
                    lifetime: rl,
                    ..template(id, Effect::None)
                })
                .collect();
            let cat = Catalog::new(templates).unwrap();
            prop_assert_eq!(cat.len(), ids.len());
            for (i, &id) in ids.iter().enumerate() {
                prop_assert_eq!(cat.lookup(ResourceId(id)), Some(TemplateIndex(i)));
            }
        }
    }
}
