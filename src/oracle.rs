//! Safety classification by entailment.
//!
//! The oracle never writes to the knowledge base. For a fixed knowledge base
//! its answers are a pure function of the cell.

use std::fmt;

use serde::Serialize;

use crate::error::{KbError, KbResult};
use crate::grid::Cell;
use crate::hazard::{HazardKind, HazardSet};
use crate::kb::KnowledgeBase;
use crate::logic::Formula;

/// Verdict for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Safety {
    /// Entailed free of every live hazard.
    Safe,
    /// Entailed to hold some live hazard.
    Unsafe,
    /// Neither. Treated as unsafe to enter.
    Unknown,
}

impl Safety {
    pub fn is_safe(self) -> bool {
        self == Safety::Safe
    }
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Safety::Safe => f.write_str("SAFE"),
            Safety::Unsafe => f.write_str("UNSAFE"),
            Safety::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// Answers "is this cell safe?" against a knowledge base.
#[derive(Debug, Clone, Default)]
pub struct SafetyOracle {
    live: HazardSet,
}

impl SafetyOracle {
    pub fn new(live: HazardSet) -> Self {
        Self { live }
    }

    /// Hazard kinds that still count against a cell.
    pub fn live(&self) -> &HazardSet {
        &self.live
    }

    /// Stop counting `kind` as a hazard. Returns `true` if it was live.
    pub fn neutralize(&mut self, kind: HazardKind) -> bool {
        let removed = self.live.neutralize(kind);
        if removed {
            tracing::info!(%kind, "hazard neutralized");
        }
        removed
    }

    /// Classify a single cell.
    pub fn classify(&self, kb: &KnowledgeBase, cell: Cell) -> KbResult<Safety> {
        if !self.usable(kb)? {
            return Ok(Safety::Unknown);
        }
        self.classify_consistent(kb, cell)
    }

    /// Classify a batch of cells with a single consistency check.
    pub fn classify_all(&self, kb: &KnowledgeBase, cells: &[Cell]) -> KbResult<Vec<(Cell, Safety)>> {
        if !self.usable(kb)? {
            return Ok(cells.iter().map(|&c| (c, Safety::Unknown)).collect());
        }
        cells
            .iter()
            .map(|&c| Ok((c, self.classify_consistent(kb, c)?)))
            .collect()
    }

    /// Whether the knowledge base pins a live `kind` hazard exactly at `cell`.
    ///
    /// Only entailed facts count; a suspected location answers `false`.
    pub fn hazard_entailed(&self, kb: &KnowledgeBase, kind: HazardKind, cell: Cell) -> KbResult<bool> {
        if !self.live.contains(kind) {
            return Ok(false);
        }
        let Some(prop) = kb.lookup(kind, cell) else {
            return Ok(false);
        };
        degrade(kb.entails(&Formula::var(prop)), cell, false)
    }

    /// Whether classification can be trusted at all.
    ///
    /// An unsatisfiable knowledge base entails everything, so every answer
    /// drawn from it would be vacuous.
    pub fn usable(&self, kb: &KnowledgeBase) -> KbResult<bool> {
        match kb.is_consistent() {
            Ok(true) => Ok(true),
            Ok(false) => {
                tracing::error!(
                    constraints = kb.constraint_count(),
                    "knowledge base is inconsistent; classifying every cell as unknown"
                );
                Ok(false)
            }
            Err(KbError::Solver(e)) => {
                tracing::warn!(error = %e, "consistency check undecided");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn classify_consistent(&self, kb: &KnowledgeBase, cell: Cell) -> KbResult<Safety> {
        let mut clear = Vec::new();
        let mut declared = Vec::new();
        let mut complete = true;
        for kind in self.live.iter() {
            match kb.lookup(kind, cell) {
                Some(prop) => {
                    clear.push(Formula::not(Formula::var(prop)));
                    declared.push(Formula::var(prop));
                }
                // Nothing constrains it, so absence cannot be entailed.
                None => complete = false,
            }
        }

        let verdict = if complete && degrade(kb.entails(&Formula::and(clear)), cell, false)? {
            Safety::Safe
        } else if !declared.is_empty() && degrade(kb.entails(&Formula::or(declared)), cell, false)? {
            Safety::Unsafe
        } else {
            Safety::Unknown
        };
        tracing::debug!(%cell, %verdict, "classified");
        Ok(verdict)
    }
}

/// Solver failures degrade to `fallback`; anything else is a caller defect.
fn degrade(result: KbResult<bool>, cell: Cell, fallback: bool) -> KbResult<bool> {
    match result {
        Err(KbError::Solver(e)) => {
            tracing::warn!(%cell, error = %e, "entailment undecided");
            Ok(fallback)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SolverError, SolverResult};
    use crate::grid::GridBounds;
    use crate::logic::CnfProblem;
    use crate::logic::solver::{DpllSolver, SatBackend, SatOutcome};
    use crate::percept::{Percept, interpret_all};

    fn bounds() -> GridBounds {
        GridBounds::new(4, 4).unwrap()
    }

    fn oracle() -> SafetyOracle {
        SafetyOracle::default()
    }

    #[test]
    fn quiet_entrance_makes_both_neighbors_safe() {
        let mut kb = KnowledgeBase::new();
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &Percept::quiet()).unwrap();
        let o = oracle();
        assert_eq!(o.classify(&kb, Cell::new(2, 1)).unwrap(), Safety::Safe);
        assert_eq!(o.classify(&kb, Cell::new(1, 2)).unwrap(), Safety::Safe);
        assert_eq!(o.classify(&kb, Cell::new(1, 1)).unwrap(), Safety::Safe);
        // Never mentioned.
        assert_eq!(o.classify(&kb, Cell::new(4, 4)).unwrap(), Safety::Unknown);
    }

    #[test]
    fn creaking_leaves_both_candidates_unknown() {
        let mut kb = KnowledgeBase::new();
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &Percept::quiet()).unwrap();
        let creaking = Percept {
            creaking: true,
            ..Percept::quiet()
        };
        interpret_all(&mut kb, bounds(), Cell::new(2, 1), &creaking).unwrap();

        let o = oracle();
        let verdicts = o
            .classify_all(&kb, &[Cell::new(3, 1), Cell::new(2, 2)])
            .unwrap();
        assert_eq!(
            verdicts,
            vec![(Cell::new(3, 1), Safety::Unknown), (Cell::new(2, 2), Safety::Unknown)]
        );
    }

    #[test]
    fn resolved_disjunction_becomes_unsafe() {
        let mut kb = KnowledgeBase::new();
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &Percept::quiet()).unwrap();
        let creaking = Percept {
            creaking: true,
            ..Percept::quiet()
        };
        interpret_all(&mut kb, bounds(), Cell::new(2, 1), &creaking).unwrap();
        interpret_all(&mut kb, bounds(), Cell::new(1, 2), &Percept::quiet()).unwrap();

        // (1,2) quiet clears (2,2), so the creak at (2,1) must come from (3,1).
        let o = oracle();
        assert_eq!(o.classify(&kb, Cell::new(2, 2)).unwrap(), Safety::Safe);
        assert_eq!(o.classify(&kb, Cell::new(3, 1)).unwrap(), Safety::Unsafe);
        assert!(o.hazard_entailed(&kb, HazardKind::DamagedFloor, Cell::new(3, 1)).unwrap());
        assert!(!o.hazard_entailed(&kb, HazardKind::Forklift, Cell::new(3, 1)).unwrap());
    }

    #[test]
    fn classification_is_stable() {
        let mut kb = KnowledgeBase::new();
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &Percept::quiet()).unwrap();
        let o = oracle();
        let first = o.classify(&kb, Cell::new(2, 1)).unwrap();
        for _ in 0..3 {
            assert_eq!(o.classify(&kb, Cell::new(2, 1)).unwrap(), first);
        }
    }

    #[test]
    fn neutralized_kind_no_longer_counts() {
        let mut kb = KnowledgeBase::new();
        let rumbling = Percept {
            rumbling: true,
            ..Percept::quiet()
        };
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &rumbling).unwrap();
        let mut o = oracle();
        assert_eq!(o.classify(&kb, Cell::new(2, 1)).unwrap(), Safety::Unknown);

        assert!(o.neutralize(HazardKind::Forklift));
        assert!(!o.neutralize(HazardKind::Forklift));
        // Damaged floor was cleared by the quiet creak sensor.
        assert_eq!(o.classify(&kb, Cell::new(2, 1)).unwrap(), Safety::Safe);
    }

    #[test]
    fn inconsistent_kb_classifies_everything_unknown() {
        let mut kb = KnowledgeBase::new();
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &Percept::quiet()).unwrap();
        let d = kb.lookup(HazardKind::DamagedFloor, Cell::new(2, 1)).unwrap();
        kb.assert(Formula::var(d)).unwrap();

        let o = oracle();
        assert_eq!(o.classify(&kb, Cell::new(2, 1)).unwrap(), Safety::Unknown);
        assert_eq!(o.classify(&kb, Cell::new(1, 2)).unwrap(), Safety::Unknown);
        assert!(!o.usable(&kb).unwrap());
    }

    #[derive(Debug)]
    struct Exhausted;

    impl SatBackend for Exhausted {
        fn name(&self) -> &str {
            "exhausted"
        }

        fn check(&self, _: &CnfProblem<'_>) -> SolverResult<SatOutcome> {
            Err(SolverError::BudgetExhausted {
                backend: "exhausted".into(),
                decisions: 1,
                budget: 0,
            })
        }
    }

    #[test]
    fn solver_failures_degrade_to_unknown() {
        let mut kb = KnowledgeBase::with_backend(Box::new(Exhausted));
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &Percept::quiet()).unwrap();
        let o = oracle();
        assert_eq!(o.classify(&kb, Cell::new(2, 1)).unwrap(), Safety::Unknown);
        assert!(!o.hazard_entailed(&kb, HazardKind::Forklift, Cell::new(2, 1)).unwrap());
    }

    #[test]
    fn tiny_budget_still_answers_trivial_queries() {
        // Pure unit propagation needs no decisions.
        let mut kb = KnowledgeBase::with_backend(Box::new(DpllSolver::new(0)));
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &Percept::quiet()).unwrap();
        assert_eq!(oracle().classify(&kb, Cell::new(2, 1)).unwrap(), Safety::Safe);
    }
}
