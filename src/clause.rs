use crate::error::ClauseError;
use crate::term::{Indicator, Renaming, Term};
use std::fmt;

/// A program clause.
///
/// A rule whose body is `true` is stored as a fact, so the two forms never
/// coexist for the same text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Clause {
    Fact(Term),
    Rule(Term, Term),
    Directive(Term),
}

impl Clause {
    pub fn fact(head: Term) -> Self {
        Clause::Fact(head)
    }

    pub fn rule(head: Term, body: Term) -> Self {
        if body.is_atom_named("true") {
            Clause::Fact(head)
        } else {
            Clause::Rule(head, body)
        }
    }

    pub fn directive(body: Term) -> Self {
        Clause::Directive(body)
    }

    /// Read a clause from its term form: `H :- B`, `:- B` or a bare head.
    pub fn from_term(term: &Term) -> Result<Self, ClauseError> {
        let clause = if term.is_functor(":-", 2) {
            Clause::rule(term.args()[0].clone(), term.args()[1].clone())
        } else if term.is_functor(":-", 1) {
            Clause::directive(term.args()[0].clone())
        } else {
            Clause::fact(term.clone())
        };
        clause.check()?;
        Ok(clause)
    }

    pub fn to_term(&self) -> Term {
        match self {
            Clause::Fact(head) => head.clone(),
            Clause::Rule(head, body) => Term::compound(":-", [head.clone(), body.clone()]),
            Clause::Directive(body) => Term::compound(":-", [body.clone()]),
        }
    }

    pub fn head(&self) -> Option<&Term> {
        match self {
            Clause::Fact(head) | Clause::Rule(head, _) => Some(head),
            Clause::Directive(_) => None,
        }
    }

    /// The body; facts have body `true`.
    pub fn body(&self) -> Term {
        match self {
            Clause::Fact(_) => Term::truth(),
            Clause::Rule(_, body) | Clause::Directive(body) => body.clone(),
        }
    }

    pub fn indicator(&self) -> Option<Indicator> {
        self.head().and_then(Term::indicator)
    }

    pub fn is_directive(&self) -> bool {
        matches!(self, Clause::Directive(_))
    }

    pub fn is_well_formed(&self) -> bool {
        self.check().is_ok()
    }

    /// Head must be a struct; no number may sit in goal position.
    pub fn check(&self) -> Result<(), ClauseError> {
        if let Some(head) = self.head() {
            if !head.is_callable() {
                return Err(ClauseError::InvalidHead(head.clone()));
            }
        }
        match self {
            Clause::Fact(_) => Ok(()),
            Clause::Rule(_, body) | Clause::Directive(body) => check_body(body),
        }
    }

    /// The same clause over fresh variables, renamed consistently across
    /// head and body.
    pub fn fresh_copy(&self) -> Clause {
        let mut renaming = Renaming::default();
        match self {
            Clause::Fact(head) => Clause::Fact(head.fresh_copy_with(&mut renaming)),
            Clause::Rule(head, body) => Clause::Rule(
                head.fresh_copy_with(&mut renaming),
                body.fresh_copy_with(&mut renaming),
            ),
            Clause::Directive(body) => Clause::Directive(body.fresh_copy_with(&mut renaming)),
        }
    }
}

fn check_body(body: &Term) -> Result<(), ClauseError> {
    let mut pending = vec![body];
    while let Some(goal) = pending.pop() {
        match goal {
            Term::Var(_) => {}
            Term::Int(_) | Term::Real(_) => return Err(ClauseError::InvalidBody(goal.clone())),
            Term::Struct(_) => {
                if goal.is_functor(",", 2) || goal.is_functor(";", 2) || goal.is_functor("->", 2) {
                    pending.extend(goal.args().iter());
                }
            }
        }
    }
    Ok(())
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", self.to_term())
    }
}

#[cfg(test)]
#[path = "tests/clause.rs"]
mod tests;
