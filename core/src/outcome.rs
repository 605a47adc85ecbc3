//! Weighted outcome rolls.
//!
//! The engine is a pure decision function: it reads a tier and a draw source
//! and returns a [`RollResult`]. Applying the decision is the caller's job.

#[cfg(test)]
use std::collections::VecDeque;

use thiserror::Error;

use reforge_types::{Outcome, OutcomeKind, RollResult, Tier};

/// Allowed drift of a row sum away from 1.0.
const SUM_TOLERANCE: f64 = 1e-9;

/// Source of uniform draws in `[0, 1)`.
pub trait Dice {
    fn draw(&mut self) -> f64;
}

/// Thread-local RNG draws for production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDice;

impl Dice for ThreadDice {
    fn draw(&mut self) -> f64 {
        rand::random::<f64>()
    }
}

/// Replays a fixed sequence of draws. Panics when exhausted, which means a
/// roll consumed more draws than the scenario expected.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedDice {
    draws: VecDeque<f64>,
}

#[cfg(test)]
impl ScriptedDice {
    pub(crate) fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.draws.len()
    }
}

#[cfg(test)]
impl Dice for ScriptedDice {
    fn draw(&mut self) -> f64 {
        self.draws
            .pop_front()
            .expect("ScriptedDice ran out of draws")
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutcomeTableError {
    #[error("outcome table has no rows")]
    Empty,
    #[error("row {row} has probability {value} outside [0, 1]")]
    OutOfRange { row: usize, value: f64 },
    #[error("row {row} sums to {sum}, expected 1.0")]
    BadSum { row: usize, sum: f64 },
    #[error("destruction chance {0} is outside [0, 1]")]
    DestructionChance(f64),
}

/// Tier-indexed `[degrade, same, upgrade, jackpot]` probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeTable {
    rows: Vec<[f64; 4]>,
}

impl OutcomeTable {
    pub fn new(rows: Vec<[f64; 4]>) -> Result<Self, OutcomeTableError> {
        if rows.is_empty() {
            return Err(OutcomeTableError::Empty);
        }
        for (row, weights) in rows.iter().enumerate() {
            if let Some(value) = weights
                .iter()
                .copied()
                .find(|w| !(0.0..=1.0).contains(w))
            {
                return Err(OutcomeTableError::OutOfRange { row, value });
            }
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > SUM_TOLERANCE {
                return Err(OutcomeTableError::BadSum { row, sum });
            }
        }
        Ok(Self { rows })
    }

    /// Row used for `tier`; tiers past the table reuse the last row.
    #[must_use]
    pub fn row(&self, tier: Tier) -> &[f64; 4] {
        let index = tier.index().min(self.rows.len() - 1);
        &self.rows[index]
    }

    #[must_use]
    pub fn rows(&self) -> &[[f64; 4]] {
        &self.rows
    }

    /// First bucket whose cumulative bound exceeds `draw`. Draws beyond the
    /// final bound (rounding) land in the last bucket.
    #[must_use]
    pub fn select(&self, tier: Tier, draw: f64) -> OutcomeKind {
        let mut cumulative = 0.0;
        for (kind, weight) in OutcomeKind::ORDER.iter().zip(self.row(tier)) {
            cumulative += weight;
            if draw < cumulative {
                return *kind;
            }
        }
        OutcomeKind::Jackpot
    }
}

/// Outcome roll plus the independent destruction roll at the pre-cap tier.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeEngine {
    table: OutcomeTable,
    destruction_chance: f64,
}

impl OutcomeEngine {
    pub fn new(table: OutcomeTable, destruction_chance: f64) -> Result<Self, OutcomeTableError> {
        if !(0.0..=1.0).contains(&destruction_chance) {
            return Err(OutcomeTableError::DestructionChance(destruction_chance));
        }
        Ok(Self {
            table,
            destruction_chance,
        })
    }

    #[must_use]
    pub fn table(&self) -> &OutcomeTable {
        &self.table
    }

    #[must_use]
    pub fn destruction_chance(&self) -> f64 {
        self.destruction_chance
    }

    /// Roll for an item at `current`.
    ///
    /// At [`Tier::pre_cap`] the destruction draw comes first; when it hits,
    /// no outcome draw is taken.
    pub fn roll(&self, current: Tier, dice: &mut dyn Dice) -> RollResult {
        if current == Tier::pre_cap() && dice.draw() < self.destruction_chance {
            return RollResult::Destroyed { from: current };
        }
        let kind = self.table.select(current, dice.draw());
        RollResult::Transition(Outcome::new(kind, current))
    }
}
