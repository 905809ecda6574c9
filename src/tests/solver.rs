use super::*;
use crate::channel::Channels;
use crate::library::{one, PrimitiveCall, Response, Responses};
use crate::subst::Substitution;
use crate::term::Scope;

fn fact(name: &str, arg: i64) -> Clause {
    Clause::fact(Term::compound(name, [Term::int(arg)]))
}

fn silent() -> Solver {
    Solver::new().with_channels(Channels::silent())
}

fn count(solver: &Solver, goal: Term) -> usize {
    solver.solve(goal).filter(|s| s.is_yes()).count()
}

// ========== CONFIGURATION ==========

#[test]
fn default_config() {
    let config = SolverConfig::default();
    assert_eq!(config.max_duration, None);
    assert!(!config.flags.occurs_check);
    assert_eq!(config.flags.unknown, UnknownPolicy::Warning);
    assert_eq!(config.index_nesting, DEFAULT_NESTING);
}

#[test]
fn builtins_are_loaded() {
    let solver = silent();
    assert!(solver.runtime().is_loaded(crate::stdlib::ALIAS));
    assert!(solver.runtime().is_primitive(&Indicator::new("=", 2)));
    assert!(solver
        .theory()
        .library()
        .contains_indicator(&Indicator::new("member", 2)));
}

#[test]
fn occurs_check_flag_reaches_unification() {
    let mut s = Scope::new();
    let goal = Term::compound("=", [s.var("X"), Term::compound("f", [s.var("X")])]);

    let plain = silent();
    assert!(plain.solve_once(goal.clone()).is_yes());

    let checked = Solver::with_config(SolverConfig::default().with_occurs_check(true))
        .with_channels(Channels::silent());
    assert!(checked.solve_once(goal).is_no());
}

#[test]
fn configured_budget_applies_to_every_request() {
    let mut solver = Solver::with_config(SolverConfig::default().with_max_duration(Duration::ZERO))
        .with_channels(Channels::silent());
    assert!(solver.consult([fact("q", 1)]).is_ok());
    let solution = solver.solve_once(Term::compound("q", [Term::int(1)]));
    assert!(solution.halt().is_some_and(|h| h.is_time_out()));
}

// ========== THREADS ==========

#[test]
fn solutions_can_move_to_another_thread() {
    fn assert_send<T: Send>() {}
    assert_send::<Solver>();
    assert_send::<Solutions>();

    let mut solver = silent();
    assert!(solver.consult([fact("q", 1), fact("q", 2), fact("q", 3)]).is_ok());
    let mut s = Scope::new();
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let solutions = solver.solve(Term::compound("q", [s.var("X")]));
            std::thread::spawn(move || solutions.filter(|sol| sol.is_yes()).count())
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().ok(), Some(3));
    }
}

// ========== KNOWLEDGE BASE ==========

#[test]
fn consult_fills_the_static_kb() {
    let mut solver = silent();
    assert!(solver.consult([fact("q", 1), fact("q", 2)]).is_ok());
    assert_eq!(solver.theory().static_kb().len(), 2);
    assert!(solver.theory().dynamic_kb().is_empty());
    let mut s = Scope::new();
    assert_eq!(count(&solver, Term::compound("q", [s.var("X")])), 2);
}

#[test]
fn consult_rejects_a_bad_clause() {
    let mut solver = silent();
    let bad = Clause::fact(Term::int(3));
    assert!(solver.consult([fact("q", 1), bad]).is_err());
    assert!(solver.theory().static_kb().is_empty());
}

#[test]
fn host_assert_retract_and_abolish() {
    let mut solver = silent();
    assert!(solver.assert_z(fact("d", 1)).is_ok());
    assert!(solver.assert_z(fact("d", 2)).is_ok());
    assert!(solver.assert_a(fact("d", 0)).is_ok());
    let mut s = Scope::new();
    assert_eq!(count(&solver, Term::compound("d", [s.var("X")])), 3);

    let result = solver.retract([fact("d", 1)]);
    assert!(result.is_complete());
    assert_eq!(count(&solver, Term::compound("d", [s.var("X")])), 2);

    let removed = solver.abolish(&Indicator::new("d", 1));
    assert_eq!(removed.len(), 2);
    assert_eq!(count(&solver, Term::compound("d", [s.var("X")])), 0);
}

#[test]
fn commit_adopts_derivation_changes() {
    let mut solver = silent();
    let solutions = {
        let mut solutions = solver.solve(Term::compound("assertz", [fact("k", 7).to_term()]));
        assert!(solutions.next().is_some_and(|s| s.is_yes()));
        solutions
    };
    assert!(solver.theory().dynamic_kb().is_empty());
    solver.commit(&solutions);
    assert_eq!(solver.theory().dynamic_kb().len(), 1);
    assert!(solver.solve_once(Term::compound("k", [Term::int(7)])).is_yes());
}

// ========== LIBRARIES ==========

fn answer(call: PrimitiveCall<'_>) -> Responses {
    match call.arg(0) {
        Term::Var(v) => one(Response::yes(Substitution::of([(*v, Term::int(42))]))),
        other => call.reply_if(other == &Term::int(42)),
    }
}

#[test]
fn load_and_unload_library() {
    let mut solver = silent();
    let lib = Library::new("answers").with_primitive("answer", 1, answer);
    assert!(solver.load_library(lib.clone()).is_ok());
    assert!(matches!(
        solver.load_library(lib),
        Err(LibraryError::AlreadyLoaded(_))
    ));

    let mut s = Scope::new();
    let solution = solver.solve_once(Term::compound("answer", [s.var("X")]));
    assert_eq!(solution.get("X"), Some(Term::int(42)));

    assert!(solver.unload_library("answers").is_ok());
    assert!(!solver.runtime().is_primitive(&Indicator::new("answer", 1)));
    assert!(matches!(
        solver.unload_library("answers"),
        Err(LibraryError::NotLoaded(_))
    ));
}

#[test]
fn library_clauses_follow_load_and_unload() {
    let mut solver = silent();
    let lib = Library::new("facts").with_clause(fact("lib_fact", 1));
    assert!(solver.load_library(lib).is_ok());
    assert!(solver.solve_once(Term::compound("lib_fact", [Term::int(1)])).is_yes());
    assert!(solver.unload_library("facts").is_ok());
    assert!(solver.theory().library().get_by_indicator(&Indicator::new("lib_fact", 1)).is_empty());
}

#[test]
fn solver_clones_are_independent() {
    let mut first = silent();
    let second = first.clone();
    assert!(first.assert_z(fact("only_first", 1)).is_ok());
    assert_eq!(first.theory().dynamic_kb().len(), 1);
    assert!(second.theory().dynamic_kb().is_empty());
}
