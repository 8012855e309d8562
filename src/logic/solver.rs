//! Satisfiability backends.
//!
//! The knowledge base talks to its solver only through [`SatBackend`], so any
//! SAT or SMT engine can stand in for the bundled [`DpllSolver`].

use std::fmt;

use super::{Clause, CnfProblem, Lit};
use crate::error::{SolverError, SolverResult};

/// Default decision budget for [`DpllSolver`].
pub const DEFAULT_DECISION_BUDGET: u64 = 100_000;

/// A satisfying assignment, indexed by solver variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model(Vec<bool>);

impl Model {
    pub fn value(&self, var: u32) -> bool {
        self.0.get(var as usize).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Answer to a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    Satisfiable(Model),
    Unsatisfiable,
}

impl SatOutcome {
    pub fn is_sat(&self) -> bool {
        matches!(self, SatOutcome::Satisfiable(_))
    }
}

/// A satisfiability backend.
///
/// Implementations must be deterministic for a given problem and must not
/// keep state between calls: every query is independent.
pub trait SatBackend: fmt::Debug + Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Decide whether every clause in `problem` can hold at once.
    fn check(&self, problem: &CnfProblem<'_>) -> SolverResult<SatOutcome>;
}

/// DPLL with unit propagation and a decision budget.
#[derive(Debug, Clone)]
pub struct DpllSolver {
    decision_budget: u64,
}

impl DpllSolver {
    pub fn new(decision_budget: u64) -> Self {
        Self { decision_budget }
    }
}

impl Default for DpllSolver {
    fn default() -> Self {
        Self::new(DEFAULT_DECISION_BUDGET)
    }
}

impl SatBackend for DpllSolver {
    fn name(&self) -> &str {
        "dpll"
    }

    fn check(&self, problem: &CnfProblem<'_>) -> SolverResult<SatOutcome> {
        let clauses: Vec<&Clause> = problem.clauses().collect();
        let num_vars = clauses
            .iter()
            .flat_map(|c| c.iter())
            .map(|l| l.var() + 1)
            .max()
            .unwrap_or(0)
            .max(problem.num_vars);

        let mut search = Search {
            clauses,
            assignment: vec![None; num_vars as usize],
            trail: Vec::new(),
            decisions: 0,
            budget: self.decision_budget,
        };

        match search.solve() {
            Ok(true) => Ok(SatOutcome::Satisfiable(search.model())),
            Ok(false) => Ok(SatOutcome::Unsatisfiable),
            Err(decisions) => Err(SolverError::BudgetExhausted {
                backend: self.name().to_string(),
                decisions,
                budget: self.decision_budget,
            }),
        }
    }
}

struct Search<'p> {
    clauses: Vec<&'p Clause>,
    assignment: Vec<Option<bool>>,
    /// Assigned variables, in assignment order.
    trail: Vec<u32>,
    decisions: u64,
    budget: u64,
}

impl Search<'_> {
    fn value(&self, lit: Lit) -> Option<bool> {
        self.assignment
            .get(lit.var() as usize)
            .copied()
            .flatten()
            .map(|v| v != lit.is_negated())
    }

    fn assign(&mut self, lit: Lit) {
        if let Some(slot) = self.assignment.get_mut(lit.var() as usize) {
            *slot = Some(!lit.is_negated());
            self.trail.push(lit.var());
        }
    }

    fn backtrack(&mut self, mark: usize) {
        for var in self.trail.drain(mark..) {
            self.assignment[var as usize] = None;
        }
    }

    /// Unit propagation to a fixpoint. Returns `false` on conflict.
    fn propagate(&mut self) -> bool {
        loop {
            let mut changed = false;
            for i in 0..self.clauses.len() {
                let clause = self.clauses[i];
                let mut open = None;
                let mut open_count = 0;
                let mut satisfied = false;
                for &lit in clause {
                    match self.value(lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => {}
                        None => {
                            open_count += 1;
                            open = Some(lit);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match (open_count, open) {
                    (0, _) => return false,
                    (1, Some(lit)) => {
                        self.assign(lit);
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !changed {
                return true;
            }
        }
    }

    /// First open literal of the first clause not yet satisfied.
    fn pick_branch(&self) -> Option<Lit> {
        self.clauses
            .iter()
            .filter(|c| !c.iter().any(|&l| self.value(l) == Some(true)))
            .flat_map(|c| c.iter())
            .find(|&&l| self.value(l).is_none())
            .copied()
    }

    /// `Err` carries the decision count when the budget runs out.
    fn solve(&mut self) -> Result<bool, u64> {
        if !self.propagate() {
            return Ok(false);
        }
        let Some(lit) = self.pick_branch() else {
            return Ok(true);
        };

        self.decisions += 1;
        if self.decisions > self.budget {
            return Err(self.decisions);
        }

        for choice in [lit, lit.negate()] {
            let mark = self.trail.len();
            self.assign(choice);
            if self.solve()? {
                return Ok(true);
            }
            self.backtrack(mark);
        }
        Ok(false)
    }

    fn model(&self) -> Model {
        Model(self.assignment.iter().map(|v| v.unwrap_or(false)).collect())
    }
}
