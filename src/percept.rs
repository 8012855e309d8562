//! Percepts and their translation into knowledge base constraints.
//!
//! A [`Percept`] is consumed once: the [`PerceptInterpreter`] turns it into the
//! minimal set of constraints over hazard propositions and the raw reading is
//! dropped. Only its logical consequence survives in the knowledge base.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::KbResult;
use crate::grid::{Cell, GridBounds};
use crate::hazard::{HazardKind, HazardSet};
use crate::kb::KnowledgeBase;
use crate::logic::Formula;

/// Sensor readings at the agent's cell for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Percept {
    /// Damaged floor in an adjacent cell.
    pub creaking: bool,
    /// Live forklift in an adjacent cell.
    pub rumbling: bool,
    /// The package is here and not yet held.
    pub beacon: bool,
    /// The last forward move hit a wall.
    pub bump: bool,
    /// The last shutdown disabled the forklift.
    pub beep: bool,
}

impl Percept {
    /// A percept with every flag off.
    pub fn quiet() -> Self {
        Self::default()
    }
}

impl fmt::Display for Percept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.creaking, "creaking"),
            (self.rumbling, "rumbling"),
            (self.beacon, "beacon"),
            (self.bump, "bump"),
            (self.beep, "beep"),
        ];
        let on: Vec<&str> = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| *name)
            .collect();
        if on.is_empty() {
            f.write_str("quiet")
        } else {
            f.write_str(&on.join(" "))
        }
    }
}

/// Turns percepts into constraints. Writes to the knowledge base and nothing else.
#[derive(Debug, Clone)]
pub struct PerceptInterpreter {
    bounds: GridBounds,
}

impl PerceptInterpreter {
    pub fn new(bounds: GridBounds) -> Self {
        Self { bounds }
    }

    /// Assert what `percept`, sensed at `cell`, says about the live hazards.
    ///
    /// - The occupied cell holds no live hazard (the agent is still standing).
    /// - A quiet sensor clears every in-bounds neighbor for its hazard kind.
    /// - An active sensor asserts that at least one in-bounds neighbor holds
    ///   the hazard, without saying which.
    ///
    /// Neutralized kinds are skipped entirely: their sensors no longer carry
    /// location information. A cell off the grid is rejected here and nothing
    /// is asserted. Returns the number of new constraints.
    pub fn interpret(
        &self,
        kb: &mut KnowledgeBase,
        cell: Cell,
        percept: &Percept,
        live: &HazardSet,
    ) -> KbResult<usize> {
        if let Err(e) = self.bounds.check(cell) {
            tracing::warn!(%cell, error = %e, "percept at off-grid cell ignored");
            return Ok(0);
        }

        let neighbors = self.bounds.neighbors(cell);
        let mut added = 0;

        for kind in live.iter() {
            let here = kb.declare_variable(kind, cell)?;
            if kb.assert(Formula::not(Formula::var(here)))? {
                added += 1;
            }

            let around = neighbors
                .iter()
                .map(|&n| kb.declare_variable(kind, n).map(Formula::var))
                .collect::<KbResult<Vec<_>>>()?;

            let constraint = if kind.sensed_in(percept) {
                Formula::or(around)
            } else {
                Formula::and(around.into_iter().map(Formula::not))
            };
            if kb.assert(constraint)? {
                added += 1;
            }
        }

        tracing::debug!(%cell, %percept, added, "percept interpreted");
        Ok(added)
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }
}

/// Convenience for tests and callers that track every hazard kind.
pub fn interpret_all(
    kb: &mut KnowledgeBase,
    bounds: GridBounds,
    cell: Cell,
    percept: &Percept,
) -> KbResult<usize> {
    PerceptInterpreter::new(bounds).interpret(kb, cell, percept, &HazardSet::all())
}
