//! Clause Index - a discrimination network over clause heads.
//!
//! Clauses are grouped by the functor/arity of their head (a family), then
//! by the key of the first argument, descending into the first argument of
//! compound keys up to a bounded nesting depth. Every clause carries a
//! position fixed at insertion time; retrieval merges the candidate leaves by
//! position so callers always see program order, whatever the branch layout.
//!
//! The key path is only a filter. Every candidate is checked against the
//! query with a full unifiability test before it is returned.

use crate::clause::Clause;
use crate::error::ClauseError;
use crate::term::{Indicator, Term};
use crate::unify::matches;

#[cfg(feature = "tracing")]
use crate::trace::trace;
use crate::FxMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;

/// Default depth of first-argument indexing.
pub const DEFAULT_NESTING: usize = 3;

/// A clause with its position in program order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedClause {
    pub clause: Clause,
    pub position: i64,
}

/// One level of first-argument discrimination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Functor(Indicator),
    Int(i64),
    /// Bit pattern of the value, with `-0.0` folded into `0.0`.
    Real(u64),
}

type Leaf = VecDeque<IndexedClause>;

/// Keys leading to a clause's leaf. `open` means the walk stopped at a
/// variable, so the clause also matches anything below the last key.
struct KeyPath {
    keys: SmallVec<[IndexKey; 4]>,
    open: bool,
}

fn key_path(head: &Term, nesting: usize) -> KeyPath {
    let mut keys = SmallVec::new();
    let mut current = head.args().first();
    while let Some(arg) = current {
        if keys.len() >= nesting {
            break;
        }
        match arg {
            Term::Var(_) => return KeyPath { keys, open: true },
            Term::Int(i) => {
                keys.push(IndexKey::Int(*i));
                break;
            }
            Term::Real(r) => {
                let value = if r.0 == 0.0 { 0.0f64 } else { r.0 };
                keys.push(IndexKey::Real(value.to_bits()));
                break;
            }
            Term::Struct(s) => {
                keys.push(IndexKey::Functor(s.indicator()));
                current = s.args().first();
            }
        }
    }
    KeyPath { keys, open: false }
}

#[derive(Clone, Debug, Default)]
struct ArgNode {
    /// Clauses whose argument at this level is a variable.
    variables: Leaf,
    /// Clauses whose key path ends exactly here.
    terminal: Leaf,
    branches: FxMap<IndexKey, ArgNode>,
}

impl ArgNode {
    fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.terminal.is_empty() && self.branches.is_empty()
    }

    fn insert_leaf(&mut self, path: &KeyPath) -> &mut Leaf {
        let mut node = self;
        for key in path.keys.iter() {
            node = node.branches.entry(*key).or_default();
        }
        if path.open {
            &mut node.variables
        } else {
            &mut node.terminal
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut SmallVec<[&'a Leaf; 8]>) {
        out.push(&self.variables);
        out.push(&self.terminal);
        for child in self.branches.values() {
            child.collect_leaves(out);
        }
    }

    /// Leaves that may hold clauses matching a query with key path `keys`:
    /// variable leaves along the path plus the whole subtree at its end.
    fn candidate_leaves<'a>(&'a self, keys: &[IndexKey], out: &mut SmallVec<[&'a Leaf; 8]>) {
        match keys.split_first() {
            None => self.collect_leaves(out),
            Some((key, rest)) => {
                out.push(&self.variables);
                if let Some(child) = self.branches.get(key) {
                    child.candidate_leaves(rest, out);
                }
            }
        }
    }

    fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut Leaf)) {
        f(&mut self.variables);
        f(&mut self.terminal);
        for child in self.branches.values_mut() {
            child.for_each_leaf_mut(f);
        }
    }

    fn for_each_candidate_leaf_mut(&mut self, keys: &[IndexKey], f: &mut impl FnMut(&mut Leaf)) {
        match keys.split_first() {
            None => self.for_each_leaf_mut(f),
            Some((key, rest)) => {
                f(&mut self.variables);
                if let Some(child) = self.branches.get_mut(key) {
                    child.for_each_candidate_leaf_mut(rest, f);
                }
            }
        }
    }

    /// Drop branches left empty by removals.
    fn prune(&mut self) {
        self.branches.retain(|_, child| {
            child.prune();
            !child.is_empty()
        });
    }
}

/// Merge position-sorted leaves into one position-sorted sequence.
fn merge<'a>(leaves: &[&'a Leaf]) -> Vec<&'a IndexedClause> {
    let mut heap = BinaryHeap::with_capacity(leaves.len());
    let mut total = 0;
    for (i, leaf) in leaves.iter().enumerate() {
        total += leaf.len();
        if let Some(first) = leaf.front() {
            heap.push(Reverse((first.position, i, 0usize)));
        }
    }
    let mut out = Vec::with_capacity(total);
    while let Some(Reverse((_, i, j))) = heap.pop() {
        out.push(&leaves[i][j]);
        if let Some(next) = leaves[i].get(j + 1) {
            heap.push(Reverse((next.position, i, j + 1)));
        }
    }
    out
}

/// An ordered, indexed collection of clauses.
///
/// `assert_a` positions decrease from -1 and `assert_z` positions increase
/// from 0, so every leaf stays sorted by position with plain front/back
/// pushes. Families are reference counted; cloning an index is cheap and
/// writes copy only the family they touch.
#[derive(Debug)]
pub struct ClauseIndex {
    families: FxMap<Indicator, Arc<ArgNode>>,
    nesting: usize,
    low: i64,
    high: i64,
    len: usize,
    cache: Mutex<Option<Arc<[IndexedClause]>>>,
}

impl ClauseIndex {
    pub fn new() -> Self {
        Self::with_nesting(DEFAULT_NESTING)
    }

    /// An index discriminating `nesting` levels into the first argument.
    /// Zero degrades to functor/arity only.
    pub fn with_nesting(nesting: usize) -> Self {
        Self {
            families: FxMap::default(),
            nesting,
            low: -1,
            high: 0,
            len: 0,
            cache: Mutex::new(None),
        }
    }

    /// Build an index holding `clauses` in order.
    pub fn from_clauses(
        clauses: impl IntoIterator<Item = Clause>,
        nesting: usize,
    ) -> Result<Self, ClauseError> {
        let mut index = Self::with_nesting(nesting);
        for clause in clauses {
            index.assert_z(clause)?;
        }
        Ok(index)
    }

    pub fn nesting(&self) -> usize {
        self.nesting
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains_indicator(&self, indicator: &Indicator) -> bool {
        self.families.contains_key(indicator)
    }

    pub fn indicators(&self) -> impl Iterator<Item = &Indicator> + '_ {
        self.families.keys()
    }

    fn invalidate(&mut self) {
        *self.cache.get_mut() = None;
    }

    fn insert(&mut self, clause: Clause, front: bool) -> Result<(), ClauseError> {
        clause.check()?;
        let head = match clause.head() {
            Some(head) => head,
            None => return Err(ClauseError::Directive(clause.body())),
        };
        let indicator = head
            .indicator()
            .ok_or_else(|| ClauseError::InvalidHead(head.clone()))?;
        let path = key_path(head, self.nesting);
        let position = if front {
            let p = self.low;
            self.low -= 1;
            p
        } else {
            let p = self.high;
            self.high += 1;
            p
        };

        let family = Arc::make_mut(self.families.entry(indicator).or_default());
        let leaf = family.insert_leaf(&path);
        let entry = IndexedClause { clause, position };
        if front {
            leaf.push_front(entry);
        } else {
            leaf.push_back(entry);
        }
        self.len += 1;
        self.invalidate();
        #[cfg(feature = "tracing")]
        trace!(%indicator, front, "clause_asserted");
        Ok(())
    }

    /// Insert before every clause currently in the index.
    pub fn assert_a(&mut self, clause: Clause) -> Result<(), ClauseError> {
        self.insert(clause, true)
    }

    /// Insert after every clause currently in the index.
    pub fn assert_z(&mut self, clause: Clause) -> Result<(), ClauseError> {
        self.insert(clause, false)
    }

    /// Clauses whose head unifies with `query`, in program order.
    pub fn get_indexed(&self, query: &Term) -> Vec<IndexedClause> {
        let Some(family) = query.indicator().and_then(|i| self.families.get(&i)) else {
            return Vec::new();
        };
        let path = key_path(query, self.nesting);
        let mut leaves = SmallVec::new();
        family.candidate_leaves(&path.keys, &mut leaves);
        merge(&leaves)
            .into_iter()
            .filter(|ic| ic.clause.head().is_some_and(|head| matches(head, query)))
            .cloned()
            .collect()
    }

    pub fn get(&self, query: &Term) -> Vec<Clause> {
        self.get_indexed(query).into_iter().map(|ic| ic.clause).collect()
    }

    /// Every clause of `indicator`, in program order.
    pub fn get_by_indicator(&self, indicator: &Indicator) -> Vec<Clause> {
        let Some(family) = self.families.get(indicator) else {
            return Vec::new();
        };
        let mut leaves = SmallVec::new();
        family.collect_leaves(&mut leaves);
        merge(&leaves).into_iter().map(|ic| ic.clause.clone()).collect()
    }

    fn remove_where(
        &mut self,
        indicator: Indicator,
        keys: &[IndexKey],
        mut remove: impl FnMut(&IndexedClause) -> bool,
    ) -> Vec<IndexedClause> {
        let mut removed = Vec::new();
        let Some(family) = self.families.get_mut(&indicator) else {
            return removed;
        };
        let node = Arc::make_mut(family);
        node.for_each_candidate_leaf_mut(keys, &mut |leaf: &mut Leaf| {
            leaf.retain(|ic| {
                if remove(ic) {
                    removed.push(ic.clone());
                    false
                } else {
                    true
                }
            });
        });
        node.prune();
        if node.is_empty() {
            self.families.remove(&indicator);
        }
        if !removed.is_empty() {
            self.len -= removed.len();
            self.invalidate();
            #[cfg(feature = "tracing")]
            trace!(%indicator, count = removed.len(), "clauses_retracted");
        }
        removed.sort_by_key(|ic| ic.position);
        removed
    }

    /// Remove and return every clause whose head unifies with `query`, in
    /// program order.
    pub fn retract_all(&mut self, query: &Term) -> Vec<Clause> {
        let Some(indicator) = query.indicator() else {
            return Vec::new();
        };
        let path = key_path(query, self.nesting);
        self.remove_where(indicator, &path.keys, |ic| {
            ic.clause.head().is_some_and(|head| matches(head, query))
        })
        .into_iter()
        .map(|ic| ic.clause)
        .collect()
    }

    /// Remove the first clause, in program order, whose head unifies with
    /// `query`.
    pub fn retract_first(&mut self, query: &Term) -> Option<Clause> {
        let first = self.get_indexed(query).into_iter().next()?;
        let indicator = query.indicator()?;
        let position = first.position;
        self.remove_where(indicator, &[], |ic| ic.position == position);
        Some(first.clause)
    }

    /// Remove the first clause, in program order, that unifies with
    /// `pattern` as a whole (head and body).
    pub fn retract_matching(&mut self, pattern: &Clause) -> Option<Clause> {
        let head = pattern.head()?;
        let indicator = head.indicator()?;
        let wanted = pattern.to_term();
        let found = self
            .get_indexed(head)
            .into_iter()
            .find(|ic| matches(&ic.clause.fresh_copy().to_term(), &wanted))?;
        let position = found.position;
        self.remove_where(indicator, &[], |ic| ic.position == position);
        Some(found.clause)
    }

    /// Remove the first clause strictly equal to `clause`. Returns whether
    /// one was found.
    pub fn remove_exact(&mut self, clause: &Clause) -> bool {
        let Some(indicator) = clause.indicator() else {
            return false;
        };
        let position = {
            let Some(family) = self.families.get(&indicator) else {
                return false;
            };
            let mut leaves = SmallVec::new();
            family.collect_leaves(&mut leaves);
            match merge(&leaves).into_iter().find(|ic| ic.clause == *clause) {
                Some(ic) => ic.position,
                None => return false,
            }
        };
        !self
            .remove_where(indicator, &[], |ic| ic.position == position)
            .is_empty()
    }

    /// Every clause in the index, in program order.
    ///
    /// The flattened view is memoized and dropped on the next write.
    pub fn get_cache(&self) -> Arc<[IndexedClause]> {
        let mut cache = self.cache.lock();
        if let Some(flat) = cache.as_ref() {
            return Arc::clone(flat);
        }
        let mut leaves = SmallVec::new();
        for family in self.families.values() {
            family.collect_leaves(&mut leaves);
        }
        let flat: Arc<[IndexedClause]> = merge(&leaves).into_iter().cloned().collect();
        #[cfg(feature = "tracing")]
        trace!(clauses = flat.len(), "index_cache_rebuilt");
        *cache = Some(Arc::clone(&flat));
        flat
    }

    pub fn clauses(&self) -> Vec<Clause> {
        self.get_cache().iter().map(|ic| ic.clause.clone()).collect()
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self) -> bool {
        self.cache.lock().is_some()
    }
}

impl Default for ClauseIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ClauseIndex {
    fn clone(&self) -> Self {
        Self {
            families: self.families.clone(),
            nesting: self.nesting,
            low: self.low,
            high: self.high,
            len: self.len,
            cache: Mutex::new(self.cache.lock().clone()),
        }
    }
}

#[cfg(test)]
#[path = "tests/index.rs"]
mod tests;
