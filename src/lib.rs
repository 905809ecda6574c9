pub mod channel;
pub mod choice;
pub mod clause;
pub mod context;
pub mod error;
pub mod index;
pub mod library;
pub mod metrics;
pub mod solve;
pub mod solver;
pub mod stdlib;
pub mod subst;
pub mod symbol;
pub mod term;
pub mod theory;
pub mod trace;
pub mod unify;

pub use clause::Clause;
pub use error::{Halt, PrologError, Throwable};
pub use library::{Library, Primitive, PrimitiveCall, Response, Responses};
pub use solve::{Solution, Solutions};
pub use solver::{Solver, SolverConfig, UnknownPolicy};
pub use subst::Substitution;
pub use term::{Indicator, Scope, Term, Var};
pub use theory::Theory;

pub(crate) type FxMap<K, V> =
    hashbrown::HashMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
pub(crate) type FxSet<T> =
    hashbrown::HashSet<T, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
