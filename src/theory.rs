use crate::clause::Clause;
use crate::error::ClauseError;
use crate::index::{ClauseIndex, DEFAULT_NESTING};
use crate::term::{Indicator, Term};
use std::sync::Arc;

/// Outcome of retracting a batch of clauses. Partial success is normal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetractResult {
    /// Clauses found and removed, as they were stored.
    pub retracted: Vec<Clause>,
    /// Requested patterns with no matching clause.
    pub missing: Vec<Clause>,
}

impl RetractResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// The clauses visible to a derivation.
///
/// Three sources, searched in a fixed order: library clauses, then the
/// static knowledge base, then the dynamic one. Only the dynamic knowledge
/// base is writable. Each source is shared; writing copies the dynamic
/// index if any other theory still holds it, so a derivation that took a
/// snapshot never sees later writes.
#[derive(Clone, Debug)]
pub struct Theory {
    library: Arc<ClauseIndex>,
    static_kb: Arc<ClauseIndex>,
    dynamic_kb: Arc<ClauseIndex>,
}

impl Theory {
    pub fn new() -> Self {
        Self::with_nesting(DEFAULT_NESTING)
    }

    pub fn with_nesting(nesting: usize) -> Self {
        Self {
            library: Arc::new(ClauseIndex::with_nesting(nesting)),
            static_kb: Arc::new(ClauseIndex::with_nesting(nesting)),
            dynamic_kb: Arc::new(ClauseIndex::with_nesting(nesting)),
        }
    }

    pub fn with_library(mut self, library: Arc<ClauseIndex>) -> Self {
        self.library = library;
        self
    }

    pub fn with_static(mut self, static_kb: Arc<ClauseIndex>) -> Self {
        self.static_kb = static_kb;
        self
    }

    pub fn with_dynamic(mut self, dynamic_kb: Arc<ClauseIndex>) -> Self {
        self.dynamic_kb = dynamic_kb;
        self
    }

    pub fn library(&self) -> &Arc<ClauseIndex> {
        &self.library
    }

    pub fn static_kb(&self) -> &Arc<ClauseIndex> {
        &self.static_kb
    }

    pub fn dynamic_kb(&self) -> &Arc<ClauseIndex> {
        &self.dynamic_kb
    }

    /// Clauses whose head unifies with `query`: library first, then static,
    /// then dynamic, each in program order.
    pub fn get(&self, query: &Term) -> Vec<Clause> {
        let mut out = self.library.get(query);
        out.extend(self.static_kb.get(query));
        out.extend(self.dynamic_kb.get(query));
        out
    }

    pub fn get_by_indicator(&self, indicator: &Indicator) -> Vec<Clause> {
        let mut out = self.library.get_by_indicator(indicator);
        out.extend(self.static_kb.get_by_indicator(indicator));
        out.extend(self.dynamic_kb.get_by_indicator(indicator));
        out
    }

    /// True iff any source defines `indicator`.
    pub fn defines(&self, indicator: &Indicator) -> bool {
        self.library.contains_indicator(indicator)
            || self.static_kb.contains_indicator(indicator)
            || self.dynamic_kb.contains_indicator(indicator)
    }

    /// Every clause, in search order.
    pub fn clauses(&self) -> Vec<Clause> {
        let mut out = self.library.clauses();
        out.extend(self.static_kb.clauses());
        out.extend(self.dynamic_kb.clauses());
        out
    }

    pub fn len(&self) -> usize {
        self.library.len() + self.static_kb.len() + self.dynamic_kb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dynamic_mut(&mut self) -> &mut ClauseIndex {
        Arc::make_mut(&mut self.dynamic_kb)
    }

    pub fn assert_a(&mut self, clause: Clause) -> Result<(), ClauseError> {
        self.dynamic_mut().assert_a(clause)
    }

    pub fn assert_z(&mut self, clause: Clause) -> Result<(), ClauseError> {
        self.dynamic_mut().assert_z(clause)
    }

    /// Prepend `clauses`, keeping their relative order.
    pub fn assert_all_a(
        &mut self,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> Result<(), ClauseError> {
        let clauses: Vec<Clause> = clauses.into_iter().collect();
        for clause in clauses.into_iter().rev() {
            self.assert_a(clause)?;
        }
        Ok(())
    }

    pub fn assert_all_z(
        &mut self,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> Result<(), ClauseError> {
        for clause in clauses {
            self.assert_z(clause)?;
        }
        Ok(())
    }

    /// Remove, for each pattern, the first dynamic clause unifying with it.
    pub fn retract(&mut self, patterns: impl IntoIterator<Item = Clause>) -> RetractResult {
        let mut result = RetractResult::default();
        for pattern in patterns {
            match self.dynamic_mut().retract_matching(&pattern) {
                Some(clause) => result.retracted.push(clause),
                None => result.missing.push(pattern),
            }
        }
        result
    }

    /// Remove every dynamic clause whose head unifies with `query`.
    pub fn retract_all(&mut self, query: &Term) -> Vec<Clause> {
        let Some(indicator) = query.indicator() else {
            return Vec::new();
        };
        if !self.dynamic_kb.contains_indicator(&indicator) {
            return Vec::new();
        }
        self.dynamic_mut().retract_all(query)
    }

    /// Remove the dynamic clause strictly equal to `clause`.
    pub fn retract_exact(&mut self, clause: &Clause) -> bool {
        self.dynamic_mut().remove_exact(clause)
    }

    /// Remove every dynamic clause of `indicator`, whatever its arguments.
    pub fn abolish(&mut self, indicator: &Indicator) -> Vec<Clause> {
        self.retract_all(&indicator.template())
    }
}

impl Default for Theory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/theory.rs"]
mod tests;
