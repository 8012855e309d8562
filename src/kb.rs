//! Knowledge base: hazard propositions and the constraints over them.
//!
//! Propositions are declared lazily, one per `(hazard kind, cell)` pair, the
//! first time anything mentions that pair. Constraints only accumulate: there
//! is no retraction, so anything entailed stays entailed.
//!
//! Entailment is checked by refutation: `KB ⊨ F` iff `KB ∧ ¬F` is
//! unsatisfiable. Each query is independent; nothing is cached here.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{KbError, KbResult};
use crate::grid::Cell;
use crate::hazard::HazardKind;
use crate::logic::cnf::CnfEncoder;
use crate::logic::solver::{DpllSolver, SatBackend, SatOutcome};
use crate::logic::{Clause, CnfProblem, Formula, PropId};

/// What a proposition stands for: "`kind` is at `cell`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropLabel {
    pub kind: HazardKind,
    pub cell: Cell,
    var: u32,
}

impl fmt::Display for PropLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.kind.prefix(), self.cell.x, self.cell.y)
    }
}

/// Source of knowledge base ids, stamped into every [`PropId`] issued.
static NEXT_KB_ID: AtomicU32 = AtomicU32::new(1);

/// The agent's knowledge: a growing conjunction of constraints.
#[derive(Debug)]
pub struct KnowledgeBase {
    id: u32,
    props: HashMap<(HazardKind, Cell), PropId>,
    /// Indexed by `PropId::index()`.
    labels: Vec<PropLabel>,
    constraints: Vec<Formula>,
    seen: HashSet<Formula>,
    clauses: Vec<Clause>,
    /// Solver variables in use, propositions and Tseitin auxiliaries alike.
    num_vars: u32,
    backend: Box<dyn SatBackend>,
}

impl KnowledgeBase {
    /// An empty knowledge base on the default DPLL backend.
    pub fn new() -> Self {
        Self::with_backend(Box::new(DpllSolver::default()))
    }

    pub fn with_backend(backend: Box<dyn SatBackend>) -> Self {
        Self {
            id: NEXT_KB_ID.fetch_add(1, Ordering::Relaxed),
            props: HashMap::new(),
            labels: Vec::new(),
            constraints: Vec::new(),
            seen: HashSet::new(),
            clauses: Vec::new(),
            num_vars: 0,
            backend,
        }
    }

    /// The proposition "`kind` is at `cell`", declared on first use.
    ///
    /// Idempotent: the same pair always yields the same handle. Fails only
    /// once the solver variable space is used up.
    pub fn declare_variable(&mut self, kind: HazardKind, cell: Cell) -> KbResult<PropId> {
        if let Some(&prop) = self.props.get(&(kind, cell)) {
            return Ok(prop);
        }
        let exhausted = || KbError::PropositionSpaceExhausted {
            declared: self.labels.len(),
        };
        let prop = PropId::from_index(self.id, self.labels.len()).ok_or_else(exhausted)?;
        let next_var = self.num_vars.checked_add(1).ok_or_else(exhausted)?;

        let var = self.num_vars;
        self.num_vars = next_var;
        self.labels.push(PropLabel { kind, cell, var });
        self.props.insert((kind, cell), prop);
        tracing::trace!(%prop, label = %self.labels[prop.index()], "declared proposition");
        Ok(prop)
    }

    /// The proposition for `(kind, cell)` if it has been declared.
    pub fn lookup(&self, kind: HazardKind, cell: Cell) -> Option<PropId> {
        self.props.get(&(kind, cell)).copied()
    }

    /// What `prop` stands for. `None` for handles issued elsewhere.
    pub fn label(&self, prop: PropId) -> Option<&PropLabel> {
        if prop.owner() != self.id {
            return None;
        }
        self.labels.get(prop.index())
    }

    /// Render a formula with proposition labels (`(or D_3_1 D_2_2)`).
    pub fn render(&self, formula: &Formula) -> String {
        formula.render(&|p: PropId| match self.label(p) {
            Some(label) => label.to_string(),
            None => format!("?{p}"),
        })
    }

    /// Add a constraint permanently.
    ///
    /// Returns `false` if the identical constraint was already present.
    /// Fails with `MalformedConstraint` if the formula mentions a proposition
    /// this knowledge base did not issue or contains an empty disjunction.
    pub fn assert(&mut self, formula: Formula) -> KbResult<bool> {
        if self.seen.contains(&formula) {
            return Ok(false);
        }
        if formula.has_empty_disjunction() {
            return Err(KbError::MalformedConstraint {
                formula: self.render(&formula),
                reason: "empty disjunction can never hold".into(),
            });
        }

        let (clauses, next_var) = self.encode(&formula)?;
        tracing::debug!(
            constraint = %self.render(&formula),
            clauses = clauses.len(),
            "asserted"
        );
        self.clauses.extend(clauses);
        self.num_vars = next_var;
        self.seen.insert(formula.clone());
        self.constraints.push(formula);
        Ok(true)
    }

    /// Whether every model of the knowledge base satisfies `formula`.
    pub fn entails(&self, formula: &Formula) -> KbResult<bool> {
        let negated = Formula::not(formula.clone());
        let (query, next_var) = self.encode(&negated)?;
        let outcome = self.backend.check(&CnfProblem {
            num_vars: next_var,
            base: &self.clauses,
            query: &query,
        })?;
        let entailed = outcome == SatOutcome::Unsatisfiable;
        tracing::trace!(query = %self.render(formula), entailed, "entailment");
        Ok(entailed)
    }

    /// Whether the constraints admit at least one model.
    pub fn is_consistent(&self) -> KbResult<bool> {
        Ok(self
            .backend
            .check(&CnfProblem {
                num_vars: self.num_vars,
                base: &self.clauses,
                query: &[],
            })?
            .is_sat())
    }

    fn encode(&self, formula: &Formula) -> KbResult<(Vec<Clause>, u32)> {
        let mut encoder = CnfEncoder::new(
            |p: PropId| self.label(p).map(|l| l.var),
            self.num_vars,
        );
        encoder
            .assert_root(formula)
            .map_err(|prop| KbError::MalformedConstraint {
                formula: self.render(formula),
                reason: format!("references undeclared proposition {prop}"),
            })?;
        Ok(encoder.finish())
    }

    /// Asserted constraints, oldest first.
    pub fn constraints(&self) -> &[Formula] {
        &self.constraints
    }

    pub fn proposition_count(&self) -> usize {
        self.labels.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;

    fn d(kb: &mut KnowledgeBase, x: i32, y: i32) -> Formula {
        Formula::var(kb.declare_variable(HazardKind::DamagedFloor, Cell::new(x, y)).unwrap())
    }

    #[test]
    fn declare_is_idempotent() {
        let mut kb = KnowledgeBase::new();
        let a = kb.declare_variable(HazardKind::Forklift, Cell::new(1, 3)).unwrap();
        let b = kb.declare_variable(HazardKind::Forklift, Cell::new(1, 3)).unwrap();
        let c = kb.declare_variable(HazardKind::DamagedFloor, Cell::new(1, 3)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(kb.proposition_count(), 2);
        assert_eq!(kb.label(a).unwrap().to_string(), "F_1_3");
    }

    #[test]
    fn foreign_proposition_is_malformed() {
        let mut other = KnowledgeBase::new();
        other.declare_variable(HazardKind::DamagedFloor, Cell::new(1, 1)).unwrap();
        let foreign = other.declare_variable(HazardKind::DamagedFloor, Cell::new(2, 1)).unwrap();

        let mut kb = KnowledgeBase::new();
        kb.declare_variable(HazardKind::DamagedFloor, Cell::new(1, 1)).unwrap();
        let err = kb.assert(Formula::var(foreign)).unwrap_err();
        assert!(matches!(err, KbError::MalformedConstraint { .. }));
        assert!(matches!(
            kb.entails(&Formula::var(foreign)),
            Err(KbError::MalformedConstraint { .. })
        ));
        assert_eq!(kb.constraint_count(), 0);
    }

    #[test]
    fn foreign_proposition_with_a_local_index_is_malformed() {
        // Both handles sit at index 0, one in each knowledge base.
        let mut other = KnowledgeBase::new();
        let forklift = other.declare_variable(HazardKind::Forklift, Cell::new(4, 4)).unwrap();

        let mut kb = KnowledgeBase::new();
        let local = kb.declare_variable(HazardKind::DamagedFloor, Cell::new(1, 1)).unwrap();
        assert_eq!(forklift.index(), local.index());
        assert_ne!(forklift, local);
        assert!(kb.label(forklift).is_none());

        let err = kb.assert(Formula::var(forklift)).unwrap_err();
        assert!(matches!(err, KbError::MalformedConstraint { .. }));
        assert_eq!(kb.constraint_count(), 0);
        assert!(!kb.entails(&Formula::var(local)).unwrap());
        assert_eq!(other.label(forklift).unwrap().to_string(), "F_4_4");
    }

    #[test]
    fn empty_disjunction_is_malformed() {
        let mut kb = KnowledgeBase::new();
        let err = kb.assert(Formula::Or(Vec::new())).unwrap_err();
        assert!(matches!(err, KbError::MalformedConstraint { .. }));
    }

    #[test]
    fn entailment_by_refutation() {
        let mut kb = KnowledgeBase::new();
        let a = d(&mut kb, 2, 1);
        let b = d(&mut kb, 1, 2);
        kb.assert(Formula::or([a.clone(), b.clone()])).unwrap();
        assert!(!kb.entails(&a).unwrap());

        kb.assert(Formula::not(b.clone())).unwrap();
        assert!(kb.entails(&a).unwrap());
        assert!(kb.entails(&Formula::not(b)).unwrap());
        assert!(kb.entails(&Formula::Const(true)).unwrap());
        assert!(!kb.entails(&Formula::Const(false)).unwrap());
    }

    #[test]
    fn entailment_is_monotonic() {
        let mut kb = KnowledgeBase::new();
        let cells: Vec<Formula> = (1..=4).map(|x| d(&mut kb, x, 1)).collect();
        let steps = [
            Formula::or([cells[0].clone(), cells[1].clone()]),
            Formula::implies(cells[1].clone(), cells[2].clone()),
            Formula::not(cells[0].clone()),
            Formula::or([cells[2].clone(), cells[3].clone()]),
        ];
        let queries: Vec<Formula> = cells
            .iter()
            .flat_map(|c| [c.clone(), Formula::not(c.clone())])
            .collect();

        let mut entailed: Vec<bool> = vec![false; queries.len()];
        for step in steps {
            kb.assert(step).unwrap();
            for (i, q) in queries.iter().enumerate() {
                let now = kb.entails(q).unwrap();
                assert!(now || !entailed[i], "lost entailment of {}", kb.render(q));
                entailed[i] = now;
            }
        }
        // ¬D_1_1, then D_2_1, then D_3_1 follow.
        assert!(entailed[1] && entailed[2] && entailed[4]);
    }

    #[test]
    fn duplicate_asserts_are_noops() {
        let mut kb = KnowledgeBase::new();
        let a = d(&mut kb, 2, 2);
        assert!(kb.assert(Formula::not(a.clone())).unwrap());
        let clauses = kb.clause_count();
        assert!(!kb.assert(Formula::not(a)).unwrap());
        assert_eq!(kb.clause_count(), clauses);
        assert_eq!(kb.constraint_count(), 1);
    }

    #[test]
    fn contradictions_make_the_kb_inconsistent() {
        let mut kb = KnowledgeBase::new();
        let a = d(&mut kb, 3, 3);
        kb.assert(a.clone()).unwrap();
        assert!(kb.is_consistent().unwrap());
        kb.assert(Formula::not(a)).unwrap();
        assert!(!kb.is_consistent().unwrap());
    }

    #[test]
    fn nested_constraints_use_auxiliary_variables() {
        let mut kb = KnowledgeBase::new();
        let a = d(&mut kb, 1, 2);
        let b = d(&mut kb, 2, 1);
        let c = d(&mut kb, 2, 2);
        // (a ∧ b) ∨ c
        kb.assert(Formula::or([Formula::and([a.clone(), b.clone()]), c.clone()]))
            .unwrap();
        kb.assert(Formula::not(c)).unwrap();
        assert!(kb.entails(&a).unwrap());
        assert!(kb.entails(&b).unwrap());
        // Auxiliaries must not shift the next proposition's variable.
        let e = d(&mut kb, 3, 1);
        assert!(!kb.entails(&e).unwrap());
        assert!(!kb.entails(&Formula::not(e)).unwrap());
    }

    #[derive(Debug)]
    struct Offline;

    impl SatBackend for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn check(&self, _: &CnfProblem<'_>) -> crate::error::SolverResult<SatOutcome> {
            Err(SolverError::Unavailable {
                backend: "offline".into(),
                message: "not connected".into(),
            })
        }
    }

    #[test]
    fn backend_failures_surface_as_solver_errors() {
        let mut kb = KnowledgeBase::with_backend(Box::new(Offline));
        let a = d(&mut kb, 2, 1);
        kb.assert(Formula::not(a.clone())).unwrap();
        assert!(matches!(kb.entails(&a), Err(KbError::Solver(_))));
        assert_eq!(kb.backend_name(), "offline");
    }
}
