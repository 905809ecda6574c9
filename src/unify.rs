use crate::subst::Substitution;
use crate::term::{Term, Var};
use crate::FxMap;
use smallvec::SmallVec;

#[cfg(feature = "tracing")]
use crate::trace::{debug_span, trace};

/// Computes most general unifiers.
///
/// The occurs check is off by default, as in most Prolog systems; with it
/// off, `X = f(X)` succeeds and binds `X` cyclically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unificator {
    pub occurs_check: bool,
}

impl Unificator {
    pub fn new(occurs_check: bool) -> Self {
        Self { occurs_check }
    }

    /// Unify `a` with `b`, returning an idempotent MGU or `Failed`.
    ///
    /// Uses an explicit worklist so deep terms do not recurse.
    pub fn unify(&self, a: &Term, b: &Term) -> Substitution {
        #[cfg(feature = "tracing")]
        let _span = debug_span!("unify", %a, %b).entered();

        let mut bindings = FxMap::default();
        if !self.solve(a, b, &mut bindings) {
            #[cfg(feature = "tracing")]
            trace!("unify_failed");
            return Substitution::Failed;
        }
        if bindings.is_empty() {
            return Substitution::empty();
        }

        // Resolve chains so every binding is final.
        let triangular = Substitution::from_map(bindings);
        let resolved = triangular
            .iter()
            .map(|(var, term)| (*var, term.apply(&triangular)))
            .collect();
        Substitution::from_map(resolved)
    }

    /// True iff `a` and `b` unify. Does not build the unifier.
    pub fn matches(&self, a: &Term, b: &Term) -> bool {
        let mut bindings = FxMap::default();
        self.solve(a, b, &mut bindings)
    }

    fn solve(&self, a: &Term, b: &Term, bindings: &mut FxMap<Var, Term>) -> bool {
        let mut worklist: SmallVec<[(Term, Term); 32]> = SmallVec::new();
        worklist.push((a.clone(), b.clone()));

        while let Some((a, b)) = worklist.pop() {
            let a = deref(a, bindings);
            let b = deref(b, bindings);

            match (&a, &b) {
                (Term::Var(x), Term::Var(y)) if x == y => {}
                (Term::Var(x), _) => {
                    if self.occurs_check && occurs(x, &b, bindings) {
                        #[cfg(feature = "tracing")]
                        trace!(var = %x, term = %b, "occurs_check_failed");
                        return false;
                    }
                    bindings.insert(*x, b);
                }
                (_, Term::Var(y)) => {
                    if self.occurs_check && occurs(y, &a, bindings) {
                        #[cfg(feature = "tracing")]
                        trace!(var = %y, term = %a, "occurs_check_failed");
                        return false;
                    }
                    bindings.insert(*y, a);
                }
                (Term::Int(x), Term::Int(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (Term::Real(x), Term::Real(y)) => {
                    if x.0 != y.0 {
                        return false;
                    }
                }
                (Term::Struct(x), Term::Struct(y)) => {
                    if std::sync::Arc::ptr_eq(x, y) {
                        continue;
                    }
                    if x.functor() != y.functor() || x.arity() != y.arity() {
                        #[cfg(feature = "tracing")]
                        trace!(left = %x.indicator(), right = %y.indicator(), "functor_mismatch");
                        return false;
                    }
                    for (xa, ya) in x.args().iter().zip(y.args().iter()).rev() {
                        worklist.push((xa.clone(), ya.clone()));
                    }
                }
                // Int and Real never unify, even when numerically equal.
                _ => return false,
            }
        }
        true
    }
}

/// Follow variable bindings until reaching an unbound variable or a non-variable.
fn deref(mut term: Term, bindings: &FxMap<Var, Term>) -> Term {
    while let Term::Var(v) = &term {
        match bindings.get(v) {
            Some(bound) => term = bound.clone(),
            None => break,
        }
    }
    term
}

/// Check whether `var` occurs in `term` under the current bindings.
fn occurs(var: &Var, term: &Term, bindings: &FxMap<Var, Term>) -> bool {
    let mut stack: SmallVec<[Term; 16]> = SmallVec::new();
    stack.push(term.clone());
    while let Some(t) = stack.pop() {
        match deref(t, bindings) {
            Term::Var(v) if v == *var => return true,
            Term::Struct(s) => stack.extend(s.args().iter().cloned()),
            _ => {}
        }
    }
    false
}

/// Unify with the default settings (no occurs check).
pub fn unify(a: &Term, b: &Term) -> Substitution {
    Unificator::default().unify(a, b)
}

/// Test unifiability with the default settings.
pub fn matches(a: &Term, b: &Term) -> bool {
    Unificator::default().matches(a, b)
}

#[cfg(test)]
#[path = "tests/unify.rs"]
mod tests;
