//! Primitive protocol and library registry.
//!
//! A primitive is a native predicate. It receives its (already
//! substituted) arguments and the calling context and answers with a lazy
//! stream of responses, each a substitution plus an optional goal to run
//! next. The engine backtracks over responses exactly as it does over
//! clauses. Primitives never mutate the knowledge base themselves; they
//! describe the change as a `SideEffect` and the engine applies it.

use crate::clause::Clause;
use crate::context::ExecutionContext;
use crate::error::{ClauseError, LibraryError, PrologError};
use crate::index::{ClauseIndex, DEFAULT_NESTING};
use crate::subst::Substitution;
use crate::term::{Indicator, Term};
use crate::unify::Unificator;
use crate::FxMap;
use std::fmt;
use std::sync::Arc;

/// Knowledge-base change requested by a primitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SideEffect {
    AssertA(Clause),
    AssertZ(Clause),
    /// Remove this exact stored clause.
    Retract(Clause),
    Abolish(Indicator),
}

/// One answer of a primitive.
#[derive(Clone, Debug)]
pub struct Response {
    /// New bindings, relative to the caller's substitution.
    pub substitution: Substitution,
    /// Goal to run before the caller's continuation, if any.
    pub continuation: Option<Term>,
    pub side_effects: Vec<SideEffect>,
}

impl Response {
    pub fn yes(substitution: Substitution) -> Self {
        Self {
            substitution,
            continuation: None,
            side_effects: Vec::new(),
        }
    }

    pub fn then(substitution: Substitution, goal: Term) -> Self {
        Self {
            substitution,
            continuation: Some(goal),
            side_effects: Vec::new(),
        }
    }

    pub fn with_side_effect(mut self, effect: SideEffect) -> Self {
        self.side_effects.push(effect);
        self
    }
}

/// Lazy answers of a primitive call.
pub type Responses = Box<dyn Iterator<Item = Result<Response, PrologError>> + Send>;

/// No answers: the call fails.
pub fn no() -> Responses {
    Box::new(std::iter::empty())
}

/// Exactly one answer.
pub fn one(response: Response) -> Responses {
    Box::new(std::iter::once(Ok(response)))
}

/// Raise `error` in the caller.
pub fn raise(error: PrologError) -> Responses {
    Box::new(std::iter::once(Err(error)))
}

/// Answers produced lazily by `iter`.
pub fn many<I>(iter: I) -> Responses
where
    I: Iterator<Item = Result<Response, PrologError>> + Send + 'static,
{
    Box::new(iter)
}

/// Everything a primitive sees of its call.
pub struct PrimitiveCall<'a> {
    pub signature: Indicator,
    pub arguments: &'a [Term],
    pub context: &'a ExecutionContext,
}

impl<'a> PrimitiveCall<'a> {
    pub fn arg(&self, i: usize) -> &'a Term {
        &self.arguments[i]
    }

    /// The goal as called, arguments substituted.
    pub fn goal(&self) -> Term {
        Term::from_symbol(self.signature.name, self.arguments.iter().cloned().collect())
    }

    pub fn unificator(&self) -> Unificator {
        Unificator::new(self.context.flags().occurs_check)
    }

    /// Succeed once if `a` unifies with `b`, fail otherwise.
    pub fn reply_unify(&self, a: &Term, b: &Term) -> Responses {
        match self.unificator().unify(a, b) {
            Substitution::Failed => no(),
            mgu => one(Response::yes(mgu)),
        }
    }

    /// Succeed once without bindings when `condition` holds.
    pub fn reply_if(&self, condition: bool) -> Responses {
        if condition {
            one(Response::yes(Substitution::empty()))
        } else {
            no()
        }
    }
}

/// A native predicate.
pub trait Primitive: Send + Sync {
    fn call(&self, call: PrimitiveCall<'_>) -> Responses;
}

impl<F> Primitive for F
where
    F: Fn(PrimitiveCall<'_>) -> Responses + Send + Sync,
{
    fn call(&self, call: PrimitiveCall<'_>) -> Responses {
        self(call)
    }
}

/// A named bundle of clauses and primitives.
#[derive(Clone)]
pub struct Library {
    alias: String,
    clauses: Vec<Clause>,
    primitives: FxMap<Indicator, Arc<dyn Primitive>>,
}

impl Library {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            clauses: Vec::new(),
            primitives: FxMap::default(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn with_clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn with_clauses(mut self, clauses: impl IntoIterator<Item = Clause>) -> Self {
        self.clauses.extend(clauses);
        self
    }

    pub fn with_primitive(
        mut self,
        name: &str,
        arity: usize,
        primitive: impl Primitive + 'static,
    ) -> Self {
        self.primitives
            .insert(Indicator::new(name, arity), Arc::new(primitive));
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn primitive_indicators(&self) -> impl Iterator<Item = &Indicator> + '_ {
        self.primitives.keys()
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("alias", &self.alias)
            .field("clauses", &self.clauses.len())
            .field("primitives", &self.primitives.len())
            .finish()
    }
}

/// The loaded libraries: the primitive registry and the library clause
/// source of every theory.
///
/// When two libraries define the same primitive the later one wins.
/// Library clauses are indexed in load order.
#[derive(Clone)]
pub struct Runtime {
    libraries: Vec<Arc<Library>>,
    primitives: FxMap<Indicator, Arc<dyn Primitive>>,
    clauses: Arc<ClauseIndex>,
    nesting: usize,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_nesting(DEFAULT_NESTING)
    }

    pub fn with_nesting(nesting: usize) -> Self {
        Self {
            libraries: Vec::new(),
            primitives: FxMap::default(),
            clauses: Arc::new(ClauseIndex::with_nesting(nesting)),
            nesting,
        }
    }

    pub fn load(&mut self, library: Library) -> Result<(), LibraryError> {
        if self.is_loaded(library.alias()) {
            return Err(LibraryError::AlreadyLoaded(library.alias.clone()));
        }
        let mut index = (*self.clauses).clone();
        for clause in library.clauses.iter() {
            index
                .assert_z(clause.clone())
                .map_err(|error: ClauseError| LibraryError::InvalidClause {
                    alias: library.alias.clone(),
                    error,
                })?;
        }
        self.clauses = Arc::new(index);
        for (indicator, primitive) in library.primitives.iter() {
            self.primitives.insert(*indicator, Arc::clone(primitive));
        }
        self.libraries.push(Arc::new(library));
        Ok(())
    }

    /// Unload a library and rebuild the registry from the rest.
    pub fn unload(&mut self, alias: &str) -> Result<(), LibraryError> {
        if !self.is_loaded(alias) {
            return Err(LibraryError::NotLoaded(alias.to_string()));
        }
        let remaining: Vec<Arc<Library>> = self
            .libraries
            .iter()
            .filter(|lib| lib.alias() != alias)
            .cloned()
            .collect();
        let mut rebuilt = Runtime::with_nesting(self.nesting);
        for lib in remaining {
            rebuilt.load((*lib).clone())?;
        }
        *self = rebuilt;
        Ok(())
    }

    pub fn is_loaded(&self, alias: &str) -> bool {
        self.libraries.iter().any(|lib| lib.alias() == alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> + '_ {
        self.libraries.iter().map(|lib| lib.alias())
    }

    pub fn primitive(&self, indicator: &Indicator) -> Option<&Arc<dyn Primitive>> {
        self.primitives.get(indicator)
    }

    pub fn is_primitive(&self, indicator: &Indicator) -> bool {
        self.primitives.contains_key(indicator)
    }

    /// Library clauses, as the first clause source of a theory.
    pub fn clauses(&self) -> &Arc<ClauseIndex> {
        &self.clauses
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("libraries", &self.aliases().collect::<Vec<_>>())
            .field("primitives", &self.primitives.len())
            .field("clauses", &self.clauses.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/library.rs"]
mod tests;
