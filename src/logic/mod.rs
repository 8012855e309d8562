//! Propositional logic over knowledge-base propositions.
//!
//! [`Formula`] is the language callers speak to the knowledge base. Internally
//! formulas are lowered to CNF ([`cnf`]) and handed to a satisfiability
//! backend ([`solver`]) through a narrow trait so the backend can be swapped.

pub mod cnf;
pub mod solver;

use std::fmt;
use std::num::NonZeroU32;

/// Handle to a proposition issued by a [`KnowledgeBase`](crate::kb::KnowledgeBase).
///
/// Carries the issuing knowledge base's id, so a handle from one knowledge base
/// never resolves in another. The slot is `NonZeroU32` so that `Option<PropId>`
/// is the same size as `PropId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropId {
    owner: u32,
    slot: NonZeroU32,
}

impl PropId {
    /// Handle for the proposition stored at `index` (0-based) by `owner`.
    pub(crate) fn from_index(owner: u32, index: usize) -> Option<Self> {
        let slot = u32::try_from(index.checked_add(1)?).ok().and_then(NonZeroU32::new)?;
        Some(PropId { owner, slot })
    }

    /// 0-based position in the issuing knowledge base.
    pub fn index(self) -> usize {
        (self.slot.get() - 1) as usize
    }

    /// Id of the issuing knowledge base.
    pub fn owner(self) -> u32 {
        self.owner
    }
}

impl fmt::Display for PropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.slot)
    }
}

/// A propositional formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Const(bool),
    Var(PropId),
    Not(Box<Formula>),
    /// Conjunction. Empty means `true`.
    And(Vec<Formula>),
    /// Disjunction. Empty means `false`.
    Or(Vec<Formula>),
}

impl Formula {
    pub fn var(prop: PropId) -> Self {
        Formula::Var(prop)
    }

    /// Negation, folding constants and double negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Formula) -> Self {
        match inner {
            Formula::Const(b) => Formula::Const(!b),
            Formula::Not(f) => *f,
            other => Formula::Not(Box::new(other)),
        }
    }

    /// Conjunction. A single conjunct is returned unwrapped.
    pub fn and(items: impl IntoIterator<Item = Formula>) -> Self {
        let mut items: Vec<Formula> = items.into_iter().collect();
        if items.len() == 1 {
            return items.remove(0);
        }
        Formula::And(items)
    }

    /// Disjunction. A single disjunct is returned unwrapped.
    pub fn or(items: impl IntoIterator<Item = Formula>) -> Self {
        let mut items: Vec<Formula> = items.into_iter().collect();
        if items.len() == 1 {
            return items.remove(0);
        }
        Formula::Or(items)
    }

    pub fn implies(premise: Formula, conclusion: Formula) -> Self {
        Formula::or([Formula::not(premise), conclusion])
    }

    /// Whether any disjunction in the formula is empty.
    pub fn has_empty_disjunction(&self) -> bool {
        match self {
            Formula::Const(_) | Formula::Var(_) => false,
            Formula::Not(f) => f.has_empty_disjunction(),
            Formula::Or(fs) if fs.is_empty() => true,
            Formula::And(fs) | Formula::Or(fs) => fs.iter().any(Formula::has_empty_disjunction),
        }
    }

    /// Truth value under `assignment`.
    pub fn evaluate(&self, assignment: &impl Fn(PropId) -> bool) -> bool {
        match self {
            Formula::Const(b) => *b,
            Formula::Var(p) => assignment(*p),
            Formula::Not(f) => !f.evaluate(assignment),
            Formula::And(fs) => fs.iter().all(|f| f.evaluate(assignment)),
            Formula::Or(fs) => fs.iter().any(|f| f.evaluate(assignment)),
        }
    }

    /// Render with a custom proposition namer, in s-expression form.
    pub fn render(&self, name: &impl Fn(PropId) -> String) -> String {
        match self {
            Formula::Const(b) => b.to_string(),
            Formula::Var(p) => name(*p),
            Formula::Not(f) => format!("(not {})", f.render(name)),
            Formula::And(fs) => Self::render_list("and", fs, name),
            Formula::Or(fs) => Self::render_list("or", fs, name),
        }
    }

    fn render_list(op: &str, fs: &[Formula], name: &impl Fn(PropId) -> String) -> String {
        let mut out = format!("({op}");
        for f in fs {
            out.push(' ');
            out.push_str(&f.render(name));
        }
        out.push(')');
        out
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&|p: PropId| p.to_string()))
    }
}

// ---------------------------------------------------------------------------
// CNF primitives
// ---------------------------------------------------------------------------

/// A literal over a solver variable: `var << 1 | negated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit(u32);

impl Lit {
    pub fn positive(var: u32) -> Self {
        Lit(var << 1)
    }

    pub fn negative(var: u32) -> Self {
        Lit((var << 1) | 1)
    }

    pub fn var(self) -> u32 {
        self.0 >> 1
    }

    pub fn is_negated(self) -> bool {
        self.0 & 1 == 1
    }

    pub fn negate(self) -> Self {
        Lit(self.0 ^ 1)
    }
}

/// A disjunction of literals. Empty means `false`.
pub type Clause = Vec<Lit>;

/// A satisfiability problem: the permanent clauses plus per-query clauses.
#[derive(Debug, Clone, Copy)]
pub struct CnfProblem<'a> {
    /// Number of variables; every literal's variable is below this.
    pub num_vars: u32,
    pub base: &'a [Clause],
    pub query: &'a [Clause],
}

impl<'a> CnfProblem<'a> {
    pub fn clauses(&self) -> impl Iterator<Item = &'a Clause> + use<'a> {
        self.base.iter().chain(self.query.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: usize) -> PropId {
        PropId::from_index(0, n).unwrap()
    }

    #[test]
    fn builders_fold_trivial_cases() {
        assert_eq!(Formula::not(Formula::not(Formula::var(p(0)))), Formula::var(p(0)));
        assert_eq!(Formula::not(Formula::Const(true)), Formula::Const(false));
        assert_eq!(Formula::or([Formula::var(p(1))]), Formula::var(p(1)));
        assert_eq!(Formula::and(Vec::new()), Formula::And(Vec::new()));
    }

    #[test]
    fn evaluate_follows_connectives() {
        let f = Formula::implies(Formula::var(p(0)), Formula::var(p(1)));
        assert!(f.evaluate(&|_| false));
        assert!(!f.evaluate(&|x| x == p(0)));
        assert!(Formula::And(Vec::new()).evaluate(&|_| false));
        assert!(!Formula::Or(Vec::new()).evaluate(&|_| true));
    }

    #[test]
    fn display_is_an_s_expression() {
        let f = Formula::or([
            Formula::var(p(0)),
            Formula::not(Formula::var(p(2))),
        ]);
        assert_eq!(f.to_string(), "(or p1 (not p3))");
    }

    #[test]
    fn empty_disjunctions_are_detected_anywhere() {
        let nested = Formula::and([Formula::var(p(0)), Formula::not(Formula::Or(Vec::new()))]);
        assert!(nested.has_empty_disjunction());
        assert!(!Formula::var(p(0)).has_empty_disjunction());
    }

    #[test]
    fn literals_pack_sign_and_var() {
        let l = Lit::negative(7);
        assert_eq!(l.var(), 7);
        assert!(l.is_negated());
        assert_eq!(l.negate(), Lit::positive(7));
    }
}
