//! Accumulator (battery) economics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resolver::EffectiveTurn;

/// Stored surplus production bounded by a capacity that is recomputed each
/// turn. Invariant: `0 <= stored <= capacity`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    stored: i64,
    capacity: i64,
}

/// Outcome of settling one turn's production against the accumulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Production after any withdrawal.
    pub production: i64,
    /// Surplus moved into storage.
    pub deposited: i64,
    /// Surplus taken out to reach minimum demand.
    pub withdrawn: i64,
    /// Surplus lost this turn, to a shrunken capacity or because no
    /// accumulator was active.
    pub discharged: i64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> i64 {
        self.stored
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Replace the capacity ceiling, shrinking stored surplus to fit.
    ///
    /// Returns the surplus removed by the shrink.
    pub fn recompute_capacity(&mut self, capacity: i64) -> i64 {
        self.capacity = capacity.max(0);
        let before = self.stored;
        self.stored = self.stored.clamp(0, self.capacity);
        before - self.stored
    }

    /// Settle `production` against the effective demand band.
    ///
    /// Surplus above maximum capacity is stored; a shortfall below minimum
    /// demand is covered only when storage holds the full shortfall. Without
    /// an active accumulator the stored surplus is discharged. `shed` is the
    /// surplus already removed by [`Accumulator::recompute_capacity`] this
    /// turn and is counted as discharged.
    pub fn settle(
        &mut self,
        production: i64,
        turn: &EffectiveTurn,
        present: bool,
        shed: i64,
    ) -> Settlement {
        let mut out = Settlement {
            production,
            discharged: shed,
            ..Settlement::default()
        };
        if !present {
            out.discharged += self.stored;
            self.stored = 0;
            return out;
        }
        if production > turn.max_capacity {
            let room = self.capacity - self.stored;
            out.deposited = (production - turn.max_capacity).min(room);
            self.stored += out.deposited;
        }
        if production < turn.min_demand {
            let shortfall = turn.min_demand - production;
            if self.stored >= shortfall {
                self.stored -= shortfall;
                out.withdrawn = shortfall;
                out.production = turn.min_demand;
            } else {
                debug!(shortfall, stored = self.stored, "shortfall not covered");
            }
        }
        out
    }
}
