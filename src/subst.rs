use crate::term::{Term, Var};
use crate::FxMap;
use std::fmt;
use std::sync::Arc;

/// An immutable mapping from variables to terms.
///
/// `Failed` is absorbing under composition. Bindings of a `Unifier` may
/// mention other bound variables (the map is triangular); `Term::apply`
/// follows such chains, so callers never need to normalize by hand.
/// Unifiers produced by `Unificator::unify` are already idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    Unifier(Arc<FxMap<Var, Term>>),
    Failed,
}

impl Substitution {
    /// The identity substitution.
    pub fn empty() -> Self {
        Substitution::Unifier(Arc::new(FxMap::default()))
    }

    pub fn failed() -> Self {
        Substitution::Failed
    }

    /// Build a substitution from explicit bindings. Later duplicates win.
    pub fn of(bindings: impl IntoIterator<Item = (Var, Term)>) -> Self {
        Substitution::Unifier(Arc::new(bindings.into_iter().collect()))
    }

    pub(crate) fn from_map(map: FxMap<Var, Term>) -> Self {
        Substitution::Unifier(Arc::new(map))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Substitution::Failed)
    }

    pub fn is_success(&self) -> bool {
        !self.is_failed()
    }

    /// Number of bindings. `Failed` has none.
    pub fn len(&self) -> usize {
        match self {
            Substitution::Unifier(map) => map.len(),
            Substitution::Failed => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct binding of `var`, without following chains.
    pub fn get(&self, var: &Var) -> Option<&Term> {
        match self {
            Substitution::Unifier(map) => map.get(var),
            Substitution::Failed => None,
        }
    }

    /// Iterate over bindings in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Term)> + '_ {
        let map = match self {
            Substitution::Unifier(map) => Some(map.iter()),
            Substitution::Failed => None,
        };
        map.into_iter().flatten()
    }

    /// `self` followed by `other`: applying the result equals applying
    /// `self` and then `other`.
    ///
    /// Where both bind the same variable the binding in `self` is kept; the
    /// resolution engine never produces such overlaps because it unifies
    /// goals that already had `self` applied.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        match (self, other) {
            (Substitution::Failed, _) | (_, Substitution::Failed) => Substitution::Failed,
            (Substitution::Unifier(left), Substitution::Unifier(right)) => {
                if right.is_empty() {
                    return self.clone();
                }
                if left.is_empty() {
                    return other.clone();
                }
                let mut merged = Arc::clone(left);
                let map = Arc::make_mut(&mut merged);
                map.reserve(right.len());
                for (var, term) in right.iter() {
                    map.entry(*var).or_insert_with(|| term.clone());
                }
                Substitution::Unifier(merged)
            }
        }
    }

    /// Keep only `vars`, each bound to its fully resolved value. Variables
    /// that resolve to themselves are dropped.
    pub fn restrict(&self, vars: impl IntoIterator<Item = Var>) -> Substitution {
        match self {
            Substitution::Failed => Substitution::Failed,
            Substitution::Unifier(_) => {
                let mut map = FxMap::default();
                for var in vars {
                    let value = Term::Var(var).apply(self);
                    if value != Term::Var(var) {
                        map.insert(var, value);
                    }
                }
                Substitution::from_map(map)
            }
        }
    }

    /// Bindings sorted by variable creation order, for stable output.
    pub fn sorted(&self) -> Vec<(Var, Term)> {
        let mut pairs: Vec<(Var, Term)> = self.iter().map(|(v, t)| (*v, t.clone())).collect();
        pairs.sort_by_key(|(v, _)| v.id());
        pairs
    }
}

impl Default for Substitution {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_failed() {
            return f.write_str("failed");
        }
        f.write_str("{")?;
        for (i, (var, term)) in self.sorted().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", var, term)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
#[path = "tests/subst.rs"]
mod tests;
