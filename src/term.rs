//! Term Model - immutable, structurally shared Prolog terms.
//!
//! A term is a variable, an integer, a real, or a struct. Atoms are structs
//! of arity 0; there is a single representation for both. Terms are never
//! edited in place: applying a substitution or renaming variables builds a
//! new term that shares every untouched subterm with the original.

use crate::subst::Substitution;
use crate::symbol::Symbol;
use crate::{FxMap, FxSet};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of variable identities. Every `Var` ever created gets a distinct id.
static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(0);

fn next_var_id() -> u64 {
    NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed)
}

/// Argument storage for structs.
pub type Args = SmallVec<[Term; 4]>;

/// Mapping used by `fresh_copy_with` to rename variables consistently.
pub type Renaming = FxMap<Var, Var>;

/// A logic variable: a name plus an identity.
///
/// Two variables are the same variable iff their identities match; the name
/// is only for display. Fresh copies keep the name and get a new identity.
#[derive(Clone, Copy, Debug)]
pub struct Var {
    name: Symbol,
    id: u64,
    renamed: bool,
}

impl Var {
    /// The name carried by anonymous variables.
    pub const ANONYMOUS_NAME: &'static str = "_";

    /// Create a new variable with the given name.
    pub fn of(name: &str) -> Self {
        Var {
            name: Symbol::intern(name),
            id: next_var_id(),
            renamed: false,
        }
    }

    /// Create a new anonymous variable.
    pub fn anonymous() -> Self {
        Var::of(Self::ANONYMOUS_NAME)
    }

    pub fn name(&self) -> &'static str {
        self.name.as_str()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is(Self::ANONYMOUS_NAME)
    }

    /// A variable with the same name and a new identity.
    pub fn fresh_copy(&self) -> Var {
        Var {
            name: self.name,
            id: next_var_id(),
            renamed: true,
        }
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            write!(f, "_G{}", self.id)
        } else if self.renamed {
            write!(f, "_{}{}", self.name, self.id)
        } else {
            f.write_str(self.name.as_str())
        }
    }
}

/// A floating point number with bitwise strict equality.
///
/// Strict equality and hashing compare bit patterns; unification compares
/// numeric values (see `unify`).
#[derive(Clone, Copy, Debug)]
pub struct Real(pub f64);

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Real {}

impl Hash for Real {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// A functor applied to arguments. Arity 0 is an atom.
#[derive(Clone, Debug)]
pub struct Struct {
    functor: Symbol,
    args: Args,
}

impl Struct {
    pub fn functor(&self) -> Symbol {
        self.functor
    }

    pub fn name(&self) -> &'static str {
        self.functor.as_str()
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn indicator(&self) -> Indicator {
        Indicator {
            name: self.functor,
            arity: self.args.len(),
        }
    }
}

impl PartialEq for Struct {
    fn eq(&self, other: &Self) -> bool {
        self.functor == other.functor
            && self.args.len() == other.args.len()
            && self.args.iter().zip(other.args.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for Struct {}

impl Hash for Struct {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.functor.hash(state);
        self.args.len().hash(state);
        for arg in self.args.iter() {
            arg.hash(state);
        }
    }
}

/// Unlinks uniquely owned children before they drop, so a long list is
/// freed in a loop rather than one stack frame per cell.
impl Drop for Struct {
    fn drop(&mut self) {
        if !self.args.iter().any(|arg| matches!(arg, Term::Struct(_))) {
            return;
        }
        let mut pending: Args = std::mem::take(&mut self.args);
        while let Some(term) = pending.pop() {
            if let Term::Struct(child) = term {
                if let Ok(mut owned) = Arc::try_unwrap(child) {
                    pending.extend(std::mem::take(&mut owned.args));
                }
            }
        }
    }
}

/// A Prolog term.
///
/// `PartialEq` is strict equality: same variant, same value, variables
/// compared by identity.
#[derive(Clone, Debug)]
pub enum Term {
    Var(Var),
    Int(i64),
    Real(Real),
    Struct(Arc<Struct>),
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        let mut pending: SmallVec<[(&Term, &Term); 16]> = SmallVec::new();
        pending.push((self, other));
        while let Some(pair) = pending.pop() {
            match pair {
                (Term::Var(a), Term::Var(b)) if a == b => {}
                (Term::Int(a), Term::Int(b)) if a == b => {}
                (Term::Real(a), Term::Real(b)) if a == b => {}
                (Term::Struct(a), Term::Struct(b)) => {
                    if Arc::ptr_eq(a, b) {
                        continue;
                    }
                    if a.functor != b.functor || a.args.len() != b.args.len() {
                        return false;
                    }
                    pending.extend(a.args.iter().zip(b.args.iter()));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut pending: SmallVec<[&Term; 16]> = SmallVec::new();
        pending.push(self);
        while let Some(term) = pending.pop() {
            std::mem::discriminant(term).hash(state);
            match term {
                Term::Var(v) => v.hash(state),
                Term::Int(i) => i.hash(state),
                Term::Real(r) => r.hash(state),
                Term::Struct(s) => {
                    s.functor.hash(state);
                    s.args.len().hash(state);
                    pending.extend(s.args.iter().rev());
                }
            }
        }
    }
}

impl Term {
    /// Build a struct from an interned functor. Empty args give an atom.
    pub fn from_symbol(functor: Symbol, args: Args) -> Term {
        Term::Struct(Arc::new(Struct { functor, args }))
    }

    pub fn atom(name: &str) -> Term {
        Term::from_symbol(Symbol::intern(name), SmallVec::new())
    }

    /// Build a compound term. With no arguments this is the atom `name`.
    pub fn compound(name: &str, args: impl IntoIterator<Item = Term>) -> Term {
        Term::from_symbol(Symbol::intern(name), args.into_iter().collect())
    }

    pub fn int(value: i64) -> Term {
        Term::Int(value)
    }

    pub fn real(value: f64) -> Term {
        Term::Real(Real(value))
    }

    /// A new variable named `name`. Each call creates a distinct variable.
    pub fn var(name: &str) -> Term {
        Term::Var(Var::of(name))
    }

    pub fn anonymous() -> Term {
        Term::Var(Var::anonymous())
    }

    pub fn truth() -> Term {
        Term::atom("true")
    }

    pub fn fail() -> Term {
        Term::atom("fail")
    }

    pub fn empty_list() -> Term {
        Term::atom("[]")
    }

    pub fn cons(head: Term, tail: Term) -> Term {
        Term::compound(".", [head, tail])
    }

    /// A proper list of `items`.
    pub fn list(items: impl IntoIterator<Item = Term>) -> Term {
        Term::list_with_tail(items, Term::empty_list())
    }

    /// A (possibly partial) list of `items` ending in `tail`.
    pub fn list_with_tail(items: impl IntoIterator<Item = Term>, tail: Term) -> Term {
        let items: Vec<Term> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Term::cons(item, acc))
    }

    /// Right-nested `','/2` chain of `goals`; `true` when empty.
    pub fn conjunction(goals: impl IntoIterator<Item = Term>) -> Term {
        let goals: Vec<Term> = goals.into_iter().collect();
        let mut iter = goals.into_iter().rev();
        match iter.next() {
            None => Term::truth(),
            Some(last) => iter.fold(last, |acc, goal| Term::compound(",", [goal, acc])),
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Term::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Term::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Term::Int(_) | Term::Real(_))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Term::Struct(s) if s.args.is_empty())
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Term::Struct(s) if !s.args.is_empty())
    }

    pub fn is_atomic(&self) -> bool {
        self.is_atom() || self.is_number()
    }

    /// Structs (atoms included) can be executed as goals.
    pub fn is_callable(&self) -> bool {
        matches!(self, Term::Struct(_))
    }

    pub fn functor(&self) -> Option<Symbol> {
        self.as_struct().map(Struct::functor)
    }

    pub fn arity(&self) -> usize {
        self.as_struct().map_or(0, Struct::arity)
    }

    pub fn args(&self) -> &[Term] {
        match self {
            Term::Struct(s) => &s.args,
            _ => &[],
        }
    }

    pub fn indicator(&self) -> Option<Indicator> {
        self.as_struct().map(Struct::indicator)
    }

    /// True iff this is a struct `name/arity`.
    pub fn is_functor(&self, name: &str, arity: usize) -> bool {
        matches!(self, Term::Struct(s) if s.args.len() == arity && s.functor.is(name))
    }

    pub fn is_atom_named(&self, name: &str) -> bool {
        self.is_functor(name, 0)
    }

    pub fn is_ground(&self) -> bool {
        let mut stack: SmallVec<[&Term; 16]> = SmallVec::new();
        stack.push(self);
        while let Some(t) = stack.pop() {
            match t {
                Term::Var(_) => return false,
                Term::Struct(s) => stack.extend(s.args.iter()),
                _ => {}
            }
        }
        true
    }

    /// Variables in order of first occurrence, without duplicates.
    pub fn variables(&self) -> Vec<Var> {
        let mut seen = FxSet::default();
        let mut out = Vec::new();
        let mut pending: SmallVec<[&Term; 16]> = SmallVec::new();
        pending.push(self);
        while let Some(term) = pending.pop() {
            match term {
                Term::Var(v) => {
                    if seen.insert(*v) {
                        out.push(*v);
                    }
                }
                Term::Struct(s) => pending.extend(s.args.iter().rev()),
                _ => {}
            }
        }
        out
    }

    /// Replace every bound variable by its image, recursively.
    ///
    /// Subterms without bound variables are shared with `self`. A binding
    /// that reaches back to a variable already being expanded (a cyclic
    /// binding, possible without occurs-check) leaves that variable in place.
    pub fn apply(&self, subst: &Substitution) -> Term {
        if subst.is_empty() {
            return self.clone();
        }
        rebuild(self, move |v| match subst.get(v) {
            Some(bound) => VarImage::Expand(bound),
            None => VarImage::Keep,
        })
        .unwrap_or_else(|| self.clone())
    }

    /// Rename every variable to a new identity, consistently.
    pub fn fresh_copy(&self) -> Term {
        self.fresh_copy_with(&mut Renaming::default())
    }

    /// Like `fresh_copy`, sharing `renaming` so several terms (the head and
    /// body of a clause) get the same fresh variables.
    pub fn fresh_copy_with(&self, renaming: &mut Renaming) -> Term {
        rebuild(self, |v| {
            VarImage::Replace(Term::Var(
                *renaming.entry(*v).or_insert_with(|| v.fresh_copy()),
            ))
        })
        .unwrap_or_else(|| self.clone())
    }

    /// Equality up to variable identity: any variable equals any variable,
    /// everything else must agree exactly. Apply the relevant substitution
    /// first to compare what bound variables denote.
    pub fn structurally_equals(&self, other: &Term) -> bool {
        let mut pending: SmallVec<[(&Term, &Term); 16]> = SmallVec::new();
        pending.push((self, other));
        while let Some(pair) = pending.pop() {
            match pair {
                (Term::Var(_), Term::Var(_)) => {}
                (Term::Int(a), Term::Int(b)) if a == b => {}
                (Term::Real(a), Term::Real(b)) if a.0 == b.0 => {}
                (Term::Struct(a), Term::Struct(b)) => {
                    if a.functor != b.functor || a.args.len() != b.args.len() {
                        return false;
                    }
                    pending.extend(a.args.iter().zip(b.args.iter()));
                }
                _ => return false,
            }
        }
        true
    }
}

/// What `rebuild` puts in place of a variable.
enum VarImage<'a> {
    Keep,
    Replace(Term),
    /// The rebuilt image of this term, inside which the variable itself is
    /// left alone.
    Expand(&'a Term),
}

enum Step<'a> {
    Enter(&'a Term),
    Build(&'a Arc<Struct>),
    Expanded(Var, &'a Term),
}

/// Bottom-up rebuild of `root` over an explicit stack. `None` means no
/// variable changed and the caller can share `root`.
fn rebuild<'a>(root: &'a Term, mut image: impl FnMut(&Var) -> VarImage<'a>) -> Option<Term> {
    let mut steps: Vec<Step<'a>> = vec![Step::Enter(root)];
    let mut results: Vec<Option<Term>> = Vec::new();
    let mut expanding: FxSet<Var> = FxSet::default();

    while let Some(step) = steps.pop() {
        match step {
            Step::Enter(Term::Var(v)) => {
                if expanding.contains(v) {
                    results.push(None);
                    continue;
                }
                match image(v) {
                    VarImage::Keep => results.push(None),
                    VarImage::Replace(term) => results.push(Some(term)),
                    VarImage::Expand(bound) => {
                        expanding.insert(*v);
                        steps.push(Step::Expanded(*v, bound));
                        steps.push(Step::Enter(bound));
                    }
                }
            }
            Step::Enter(Term::Struct(s)) if !s.args.is_empty() => {
                steps.push(Step::Build(s));
                steps.extend(s.args.iter().rev().map(Step::Enter));
            }
            Step::Enter(_) => results.push(None),
            Step::Expanded(v, bound) => {
                expanding.remove(&v);
                let resolved = results.pop().flatten().unwrap_or_else(|| bound.clone());
                results.push(Some(resolved));
            }
            Step::Build(s) => {
                let start = results.len() - s.args.len();
                if results[start..].iter().all(Option::is_none) {
                    results.truncate(start);
                    results.push(None);
                    continue;
                }
                let args: Args = s
                    .args
                    .iter()
                    .zip(results.drain(start..))
                    .map(|(old, new)| new.unwrap_or_else(|| old.clone()))
                    .collect();
                results.push(Some(Term::from_symbol(s.functor, args)));
            }
        }
    }
    results.pop().flatten()
}

impl From<Var> for Term {
    fn from(v: Var) -> Self {
        Term::Var(v)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Int(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::real(value)
    }
}

/// A predicate indicator `name/arity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Indicator {
    pub name: Symbol,
    pub arity: usize,
}

impl Indicator {
    pub fn new(name: &str, arity: usize) -> Self {
        Indicator {
            name: Symbol::intern(name),
            arity,
        }
    }

    /// The term `name/arity`.
    pub fn to_term(&self) -> Term {
        Term::compound("/", [
            Term::from_symbol(self.name, SmallVec::new()),
            Term::int(self.arity as i64),
        ])
    }

    /// Read `name/arity` back; `None` unless the term is well formed.
    pub fn from_term(term: &Term) -> Option<Self> {
        if !term.is_functor("/", 2) {
            return None;
        }
        let args = term.args();
        let name = args[0].as_struct().filter(|s| s.arity() == 0)?.functor();
        let arity = usize::try_from(args[1].as_int()?).ok()?;
        Some(Indicator { name, arity })
    }

    /// `name(_, ..., _)` with fresh variables in every argument.
    pub fn template(&self) -> Term {
        Term::from_symbol(self.name, (0..self.arity).map(|_| Term::anonymous()).collect())
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_atom(self.name.as_str(), f)?;
        write!(f, "/{}", self.arity)
    }
}

/// Named variables shared while building one clause or query.
///
/// `var("X")` returns the same variable every time within a scope; the
/// anonymous name `_` always yields a new variable.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    vars: FxMap<Symbol, Var>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(&mut self, name: &str) -> Term {
        if name == Var::ANONYMOUS_NAME {
            return Term::anonymous();
        }
        let var = *self
            .vars
            .entry(Symbol::intern(name))
            .or_insert_with(|| Var::of(name));
        Term::Var(var)
    }

    pub fn get(&self, name: &str) -> Option<Var> {
        self.vars.get(&Symbol::get(name)?).copied()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// (priority, max left priority, max right priority) of the infix operators
/// rendered in operator form.
fn infix(name: &str) -> Option<(u32, u32, u32)> {
    let op = match name {
        ":-" => (1200, 1199, 1199),
        ";" => (1100, 1099, 1100),
        "->" => (1050, 1049, 1050),
        "," => (1000, 999, 1000),
        "=" | "\\=" | "==" | "\\==" | "is" | "<" | ">" | "=<" | ">=" | "=:=" | "=\\=" => {
            (700, 699, 699)
        }
        "+" | "-" => (500, 500, 499),
        "*" | "/" => (400, 400, 399),
        _ => return None,
    };
    Some(op)
}

fn needs_quotes(name: &str) -> bool {
    match name {
        "[]" | "{}" | "!" | ";" => return false,
        "," | "" => return true,
        _ => {}
    }
    let first = name.chars().next().unwrap_or(' ');
    if first.is_ascii_lowercase() {
        !name.chars().all(|c| c.is_alphanumeric() || c == '_')
    } else {
        !name.chars().all(|c| "+-*/\\^<>=~:.?@#&$".contains(c))
    }
}

fn write_atom(name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if !needs_quotes(name) {
        return f.write_str(name);
    }
    f.write_str("'")?;
    for c in name.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            _ => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

fn write_term(term: &Term, f: &mut fmt::Formatter<'_>, max_priority: u32) -> fmt::Result {
    match term {
        Term::Var(v) => write!(f, "{}", v),
        Term::Int(i) => write!(f, "{}", i),
        Term::Real(r) => write!(f, "{:?}", r.0),
        Term::Struct(s) => write_struct(s, f, max_priority),
    }
}

fn write_struct(s: &Struct, f: &mut fmt::Formatter<'_>, max_priority: u32) -> fmt::Result {
    let name = s.name();
    match (name, s.args.len()) {
        (_, 0) => write_atom(name, f),
        (".", 2) => write_list(s, f),
        ("{}", 1) => {
            f.write_str("{")?;
            write_term(&s.args[0], f, 1200)?;
            f.write_str("}")
        }
        (_, 2) if infix(name).is_some() => {
            let (priority, left, right) = infix(name).unwrap_or((0, 0, 0));
            let parens = priority > max_priority;
            if parens {
                f.write_str("(")?;
            }
            write_term(&s.args[0], f, left)?;
            match name {
                "," => f.write_str(", ")?,
                "/" | "*" => write!(f, "{}", name)?,
                _ => write!(f, " {} ", name)?,
            }
            write_term(&s.args[1], f, right)?;
            if parens {
                f.write_str(")")?;
            }
            Ok(())
        }
        _ => {
            write_atom(name, f)?;
            f.write_str("(")?;
            for (i, arg) in s.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_term(arg, f, 999)?;
            }
            f.write_str(")")
        }
    }
}

fn write_list(s: &Struct, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[")?;
    write_term(&s.args[0], f, 999)?;
    let mut tail = &s.args[1];
    loop {
        match tail {
            Term::Struct(t) if t.name() == "." && t.args.len() == 2 => {
                f.write_str(", ")?;
                write_term(&t.args[0], f, 999)?;
                tail = &t.args[1];
            }
            t if t.is_atom_named("[]") => break,
            t => {
                f.write_str(" | ")?;
                write_term(t, f, 999)?;
                break;
            }
        }
    }
    f.write_str("]")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(self, f, 1200)
    }
}

#[cfg(test)]
#[path = "tests/term.rs"]
mod tests;
