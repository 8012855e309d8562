//! Lowering formulas to clauses.
//!
//! Top-level conjunctions are split into independent roots, disjunctions of
//! literals become clauses as-is, and anything deeper gets a Tseitin
//! definition: a fresh variable constrained to be equivalent to the
//! subformula. Fresh variables come from the caller's variable space so
//! permanent and per-query encodings never collide.

use super::{Clause, Formula, Lit, PropId};

/// Incremental CNF encoder.
///
/// `resolve` maps a proposition to its solver variable; a proposition it does
/// not know aborts encoding with that proposition as the error.
pub struct CnfEncoder<F> {
    resolve: F,
    next_var: u32,
    clauses: Vec<Clause>,
}

impl<F> CnfEncoder<F>
where
    F: Fn(PropId) -> Option<u32>,
{
    /// Start encoding with fresh variables numbered from `next_var`.
    pub fn new(resolve: F, next_var: u32) -> Self {
        Self {
            resolve,
            next_var,
            clauses: Vec::new(),
        }
    }

    /// Add clauses forcing `formula` to hold.
    pub fn assert_root(&mut self, formula: &Formula) -> Result<(), PropId> {
        match formula {
            Formula::Const(true) => Ok(()),
            Formula::Const(false) => {
                self.clauses.push(Vec::new());
                Ok(())
            }
            Formula::And(children) => {
                for child in children {
                    self.assert_root(child)?;
                }
                Ok(())
            }
            Formula::Not(inner) => match inner.as_ref() {
                // De Morgan: ¬(a ∨ b) is ¬a ∧ ¬b.
                Formula::Or(children) => {
                    for child in children {
                        self.assert_root(&Formula::not(child.clone()))?;
                    }
                    Ok(())
                }
                _ => self.assert_general(formula),
            },
            _ => self.assert_general(formula),
        }
    }

    fn assert_general(&mut self, formula: &Formula) -> Result<(), PropId> {
        if let Some(clause) = self.as_clause(formula)? {
            self.clauses.push(clause);
        } else {
            let lit = self.define(formula)?;
            self.clauses.push(vec![lit]);
        }
        Ok(())
    }

    /// Consume the encoder, returning its clauses and the next free variable.
    pub fn finish(self) -> (Vec<Clause>, u32) {
        (self.clauses, self.next_var)
    }

    fn fresh(&mut self) -> u32 {
        let var = self.next_var;
        self.next_var += 1;
        var
    }

    fn literal(&self, formula: &Formula) -> Result<Option<Lit>, PropId> {
        match formula {
            Formula::Var(p) => (self.resolve)(*p).map(Lit::positive).map(Some).ok_or(*p),
            Formula::Not(inner) => match inner.as_ref() {
                Formula::Var(p) => (self.resolve)(*p).map(Lit::negative).map(Some).ok_or(*p),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// The formula as a single clause, if it is a literal or a flat
    /// disjunction of literals.
    fn as_clause(&self, formula: &Formula) -> Result<Option<Clause>, PropId> {
        if let Some(lit) = self.literal(formula)? {
            return Ok(Some(vec![lit]));
        }
        let Formula::Or(children) = formula else {
            return Ok(None);
        };
        let mut clause = Vec::with_capacity(children.len());
        for child in children {
            match self.literal(child)? {
                Some(lit) => clause.push(lit),
                None => return Ok(None),
            }
        }
        Ok(Some(clause))
    }

    /// Tseitin definition: a literal equivalent to `formula`.
    fn define(&mut self, formula: &Formula) -> Result<Lit, PropId> {
        match formula {
            Formula::Var(p) => (self.resolve)(*p).map(Lit::positive).ok_or(*p),
            Formula::Not(inner) => Ok(self.define(inner)?.negate()),
            Formula::Const(value) => {
                let t = Lit::positive(self.fresh());
                self.clauses.push(vec![if *value { t } else { t.negate() }]);
                Ok(t)
            }
            Formula::And(children) => {
                let lits = children
                    .iter()
                    .map(|c| self.define(c))
                    .collect::<Result<Vec<_>, _>>()?;
                let t = Lit::positive(self.fresh());
                // t → each child
                for &l in &lits {
                    self.clauses.push(vec![t.negate(), l]);
                }
                // all children → t
                let mut back: Clause = lits.iter().map(|l| l.negate()).collect();
                back.push(t);
                self.clauses.push(back);
                Ok(t)
            }
            Formula::Or(children) => {
                let lits = children
                    .iter()
                    .map(|c| self.define(c))
                    .collect::<Result<Vec<_>, _>>()?;
                let t = Lit::positive(self.fresh());
                // each child → t
                for &l in &lits {
                    self.clauses.push(vec![l.negate(), t]);
                }
                // t → some child
                let mut forward = lits;
                forward.push(t.negate());
                self.clauses.push(forward);
                Ok(t)
            }
        }
    }
}
