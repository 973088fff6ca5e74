//! Effect aggregation over the set of active resources.

use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{Effect, LifetimeEffectPolicy};

/// Converts signed percentage points into an exact decimal fraction.
fn percent(points: i64) -> Decimal {
    Decimal::new(points, 2)
}

/// Green and non-green contributions of one effect kind, kept apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GreenBalance {
    pub green: Decimal,
    pub non_green: Decimal,
}

impl GreenBalance {
    /// Record one effect magnitude in percentage points.
    pub fn add(&mut self, points: i64) {
        if points >= 0 {
            self.green += percent(points);
        } else {
            self.non_green += percent(points).abs();
        }
    }

    /// `1 + green - non_green`, floored at zero.
    pub fn multiplier(&self) -> Decimal {
        (Decimal::ONE + self.green - self.non_green).max(Decimal::ZERO)
    }
}

/// Per-turn effect adjustments derived from the active set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EffectSummary {
    /// Applied to every active resource's base production (kind A).
    pub production: Decimal,
    /// Applied to minimum demand and maximum capacity (kind B).
    pub demand_band: Decimal,
    /// Applied to per-unit profit (kind D).
    pub profit: Decimal,
    /// Whether any accumulator resource is active (kind E).
    pub accumulator_present: bool,
    /// Capacity contributed by active accumulators, floored at zero.
    pub accumulator_capacity: i64,
}

impl Default for EffectSummary {
    fn default() -> Self {
        Self {
            production: Decimal::ONE,
            demand_band: Decimal::ONE,
            profit: Decimal::ONE,
            accumulator_present: false,
            accumulator_capacity: 0,
        }
    }
}

/// Aggregate the effects of the currently active resources.
///
/// Lifetime effects are ignored here; they only apply at purchase time
/// through [`lifetime_percent`].
pub fn aggregate_effects<'a, I>(active: I) -> EffectSummary
where
    I: IntoIterator<Item = &'a Effect>,
{
    let mut production = GreenBalance::default();
    let mut band = GreenBalance::default();
    let mut profit = GreenBalance::default();
    let mut accumulator_present = false;
    let mut capacity: i64 = 0;

    for effect in active {
        match *effect {
            Effect::ProductionMultiplier(m) => production.add(m),
            Effect::DemandBandMultiplier(m) => band.add(m),
            Effect::ProfitMultiplier(m) => profit.add(m),
            Effect::Accumulator(m) => {
                accumulator_present = true;
                capacity = capacity.saturating_add(m);
            }
            Effect::LifetimeMultiplier(_) | Effect::None => {}
        }
    }

    EffectSummary {
        production: production.multiplier(),
        demand_band: band.multiplier(),
        profit: profit.multiplier(),
        accumulator_present,
        accumulator_capacity: capacity.max(0),
    }
}

/// Accumulator presence and capacity from the active effects.
pub fn accumulator_contribution<'a, I>(active: I) -> (bool, i64)
where
    I: IntoIterator<Item = &'a Effect>,
{
    let mut present = false;
    let mut capacity: i64 = 0;
    for effect in active {
        if let Effect::Accumulator(m) = *effect {
            present = true;
            capacity = capacity.saturating_add(m);
        }
    }
    (present, capacity.max(0))
}

/// Lifetime adjustment, in percentage points, for a purchase made while
/// `active` effects are in force. `None` when no lifetime effect is active.
pub fn lifetime_percent<'a, I>(active: I, policy: LifetimeEffectPolicy) -> Option<i64>
where
    I: IntoIterator<Item = &'a Effect>,
{
    let mut lifetime = active.into_iter().filter_map(|e| match *e {
        Effect::LifetimeMultiplier(m) => Some(m),
        _ => None,
    });
    match policy {
        LifetimeEffectPolicy::FirstActiveWins => lifetime.next(),
        LifetimeEffectPolicy::Stack => {
            let first = lifetime.next()?;
            Some(lifetime.fold(first, i64::saturating_add))
        }
    }
}

/// Lifetime of a new instance: `max(1, floor(base * (1 + pct/100)))`.
pub fn effective_lifetime(base: u32, pct: Option<i64>) -> u32 {
    let Some(pct) = pct else {
        return base;
    };
    let multiplier = Decimal::ONE + percent(pct);
    let scaled = crate::resolver::scale_floor(i64::from(base), multiplier);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_effects_is_identity() {
        let s = aggregate_effects(&[Effect::None, Effect::None]);
        assert_eq!(s, EffectSummary::default());
    }

    #[test]
    fn non_green_band_alone_halves() {
        let s = aggregate_effects(&[Effect::DemandBandMultiplier(-50)]);
        assert_eq!(s.demand_band, Decimal::new(5, 1));
    }

    #[test]
    fn green_and_non_green_band_combine() {
        let s = aggregate_effects(&[
            Effect::DemandBandMultiplier(-50),
            Effect::DemandBandMultiplier(20),
        ]);
        assert_eq!(s.demand_band, Decimal::new(70, 2));
        assert_eq!(s.production, Decimal::ONE);
        assert_eq!(s.profit, Decimal::ONE);
    }

    #[test]
    fn multiplier_never_negative() {
        let s = aggregate_effects(&[
            Effect::ProfitMultiplier(-80),
            Effect::ProfitMultiplier(-70),
            Effect::ProductionMultiplier(-150),
        ]);
        assert_eq!(s.profit, Decimal::ZERO);
        assert_eq!(s.production, Decimal::ZERO);
    }

    #[test]
    fn accumulators_sum_capacity() {
        let effects = [Effect::Accumulator(20), Effect::Accumulator(15), Effect::None];
        let s = aggregate_effects(&effects);
        assert!(s.accumulator_present);
        assert_eq!(s.accumulator_capacity, 35);
        assert_eq!(accumulator_contribution(&effects), (true, 35));
        assert_eq!(accumulator_contribution(&[Effect::None]), (false, 0));
    }

    #[test]
    fn negative_accumulator_capacity_floors_at_zero() {
        assert_eq!(accumulator_contribution(&[Effect::Accumulator(-5)]), (true, 0));
    }

    #[test]
    fn lifetime_ignored_by_aggregation() {
        let s = aggregate_effects(&[Effect::LifetimeMultiplier(50)]);
        assert_eq!(s, EffectSummary::default());
    }

    #[test]
    fn first_active_lifetime_effect_wins() {
        let effects = [
            Effect::None,
            Effect::LifetimeMultiplier(-20),
            Effect::LifetimeMultiplier(50),
        ];
        assert_eq!(
            lifetime_percent(&effects, LifetimeEffectPolicy::FirstActiveWins),
            Some(-20)
        );
        assert_eq!(lifetime_percent(&effects, LifetimeEffectPolicy::Stack), Some(30));
        assert_eq!(
            lifetime_percent(&[Effect::None], LifetimeEffectPolicy::Stack),
            None
        );
    }

    #[test]
    fn effective_lifetime_scales_and_floors() {
        assert_eq!(effective_lifetime(5, None), 5);
        assert_eq!(effective_lifetime(5, Some(50)), 7);
        assert_eq!(effective_lifetime(5, Some(-50)), 2);
        assert_eq!(effective_lifetime(5, Some(-100)), 1);
        assert_eq!(effective_lifetime(5, Some(-400)), 1);
    }

    proptest! {
        #[test]
        fn aggregation_is_idempotent(mags in proptest::collection::vec(-200i64..200, 0..12)) {
            let effects: Vec<Effect> = mags
                .iter()
                .enumerate()
                .map(|(i, &m)| match i % 4 {
                    0 => Effect::ProductionMultiplier(m),
                    1 => Effect::DemandBandMultiplier(m),
                    2 => Effect::ProfitMultiplier(m),
                    _ => Effect::Accumulator(m),
                })
                .collect();
            let a = aggregate_effects(&effects);
            let b = aggregate_effects(&effects);
            prop_assert_eq!(a, b);
            prop_assert!(a.production >= Decimal::ZERO);
            prop_assert!(a.demand_band >= Decimal::ZERO);
            prop_assert!(a.profit >= Decimal::ZERO);
            prop_assert!(a.accumulator_capacity >= 0);
        }
    }
}
