use super::*;
use crate::channel::{pipe, Channels, InputChannel, OutputChannel};
use crate::error::{ErrorKind, Halt, Throwable};
use crate::solve::Solution;
use crate::solver::Solver;

fn c(name: &str, args: Vec<Term>) -> Term {
    Term::compound(name, args)
}

fn a(name: &str) -> Term {
    Term::atom(name)
}

fn solver() -> Solver {
    Solver::new().with_channels(Channels::silent())
}

fn holds(goal: Term) -> bool {
    solver().solve_once(goal).is_yes()
}

fn error_kind(solution: &Solution) -> Option<ErrorKind> {
    match solution.halt()? {
        Halt::Uncaught(Throwable::Error(e)) => Some(e.kind),
        _ => None,
    }
}

fn raises(goal: Term) -> Option<ErrorKind> {
    error_kind(&solver().solve_once(goal))
}

// ========== UNIFICATION AND COMPARISON ==========

#[test]
fn unify_binds() {
    let mut s = Scope::new();
    let goal = c("=", vec![c("f", vec![s.var("X"), a("b")]), c("f", vec![a("a"), s.var("Y")])]);
    let solution = solver().solve_once(goal);
    assert_eq!(solution.get("X"), Some(a("a")));
    assert_eq!(solution.get("Y"), Some(a("b")));
}

#[test]
fn not_unifiable_leaves_no_bindings() {
    let mut s = Scope::new();
    assert!(holds(c("\\=", vec![a("a"), a("b")])));
    assert!(!holds(c("\\=", vec![s.var("X"), a("b")])));
    assert!(!holds(c("=", vec![Term::int(1), Term::real(1.0)])));
}

#[test]
fn strict_equality_does_not_unify() {
    let mut s = Scope::new();
    assert!(holds(c("==", vec![c("f", vec![a("a")]), c("f", vec![a("a")])])));
    assert!(!holds(c("==", vec![s.var("X"), a("a")])));
    assert!(holds(c("\\==", vec![s.var("X"), s.var("Y")])));
    assert!(!holds(c("\\==", vec![s.var("X"), s.var("X")])));
}

// ========== TYPE CHECKS ==========

#[test]
fn type_checks() {
    let mut s = Scope::new();
    let x = s.var("X");
    let f = c("f", vec![a("a")]);
    let cases = [
        ("var", x.clone(), true),
        ("var", a("a"), false),
        ("nonvar", f.clone(), true),
        ("atom", a("a"), true),
        ("atom", Term::empty_list(), true),
        ("atom", f.clone(), false),
        ("number", Term::real(1.5), true),
        ("integer", Term::int(3), true),
        ("integer", Term::real(3.0), false),
        ("float", Term::real(3.0), true),
        ("atomic", Term::int(3), true),
        ("atomic", x.clone(), false),
        ("compound", f.clone(), true),
        ("compound", a("a"), false),
        ("callable", a("a"), true),
        ("callable", Term::int(1), false),
    ];
    for (check, arg, expected) in cases {
        let goal = c(check, vec![arg.clone()]);
        assert_eq!(holds(goal), expected, "{}({})", check, arg);
    }
}

// ========== KNOWLEDGE BASE ==========

#[test]
fn assert_rule_then_call_it() {
    let mut s = Scope::new();
    let head = c("double", vec![s.var("X"), c("d", vec![s.var("X"), s.var("X")])]);
    let rule = c(":-", vec![head, Term::truth()]);
    let mut q = Scope::new();
    let goal = Term::conjunction([
        c("assert", vec![rule]),
        c("double", vec![Term::int(4), q.var("D")]),
    ]);
    let solution = solver().solve_once(goal);
    assert_eq!(solution.get("D"), Some(c("d", vec![Term::int(4), Term::int(4)])));
}

#[test]
fn assert_errors() {
    let mut s = Scope::new();
    assert_eq!(raises(c("assertz", vec![s.var("X")])), Some(ErrorKind::Instantiation));
    assert_eq!(raises(c("assertz", vec![Term::int(1)])), Some(ErrorKind::Type));
    assert_eq!(
        raises(c("assertz", vec![c(":-", vec![a("foo"), Term::int(1)])])),
        Some(ErrorKind::Type)
    );
    assert_eq!(
        raises(c("asserta", vec![c("=", vec![a("a"), a("a")])])),
        Some(ErrorKind::Permission)
    );
    assert_eq!(
        raises(c("assertz", vec![c("member", vec![a("a"), a("b")])])),
        Some(ErrorKind::Permission)
    );
    assert_eq!(
        raises(c("assertz", vec![c(",", vec![a("a"), a("b")])])),
        Some(ErrorKind::Permission)
    );
}

#[test]
fn retract_enumerates_matches_on_backtracking() {
    let mut s = Scope::new();
    let setup = Term::conjunction([
        c("assertz", vec![c("n", vec![Term::int(1)])]),
        c("assertz", vec![c("n", vec![Term::int(2)])]),
        c("retract", vec![c("n", vec![s.var("X")])]),
    ]);
    let mut solutions = solver().solve(setup);
    let first = solutions.next();
    assert_eq!(first.and_then(|s| s.get("X")), Some(Term::int(1)));
    assert_eq!(solutions.theory().dynamic_kb().len(), 1);
    let second = solutions.next();
    assert_eq!(second.and_then(|s| s.get("X")), Some(Term::int(2)));
    assert!(solutions.theory().dynamic_kb().is_empty());
}

#[test]
fn retract_matches_rule_bodies() {
    let mut s = Scope::new();
    let rule = c(":-", vec![c("r", vec![s.var("X")]), c("q", vec![s.var("X")])]);
    let mut p = Scope::new();
    let goal = Term::conjunction([
        c("assertz", vec![rule]),
        c("retract", vec![c(":-", vec![c("r", vec![p.var("A")]), p.var("B")])]),
    ]);
    let solution = solver().solve_once(goal);
    assert!(solution.is_yes());
    assert!(solution.get("B").is_some_and(|b| b.is_functor("q", 1)));
}

#[test]
fn retract_fails_without_match() {
    assert!(!holds(c("retract", vec![c("absent", vec![a("x")])])));
    let mut s = Scope::new();
    assert_eq!(raises(c("retract", vec![s.var("X")])), Some(ErrorKind::Instantiation));
    assert_eq!(
        raises(c("retract", vec![c("member", vec![a("a"), a("b")])])),
        Some(ErrorKind::Permission)
    );
}

#[test]
fn abolish_removes_the_predicate() {
    let goal = Term::conjunction([
        c("assertz", vec![c("gone", vec![Term::int(1)])]),
        c("abolish", vec![c("/", vec![a("gone"), Term::int(1)])]),
    ]);
    let mut solutions = solver().solve(goal);
    assert!(solutions.next().is_some_and(|s| s.is_yes()));
    assert!(solutions.theory().dynamic_kb().is_empty());
}

#[test]
fn abolish_errors() {
    let mut s = Scope::new();
    let spec = |name: Term, arity: Term| c("abolish", vec![c("/", vec![name, arity])]);
    assert_eq!(raises(c("abolish", vec![s.var("X")])), Some(ErrorKind::Instantiation));
    assert_eq!(raises(spec(s.var("N"), Term::int(1))), Some(ErrorKind::Instantiation));
    assert_eq!(raises(spec(Term::int(1), Term::int(1))), Some(ErrorKind::Type));
    assert_eq!(raises(spec(a("foo"), a("bar"))), Some(ErrorKind::Type));
    assert_eq!(raises(spec(a("foo"), Term::int(-1))), Some(ErrorKind::Domain));
    assert_eq!(raises(c("abolish", vec![a("foo")])), Some(ErrorKind::Type));
    assert_eq!(raises(spec(a("append"), Term::int(3))), Some(ErrorKind::Permission));
}

// ========== I/O ==========

#[test]
fn write_and_nl_go_to_stdout() {
    let (tx, rx) = pipe();
    let channels = Channels::silent().with_output(STDOUT, OutputChannel::Pipe(tx));
    let solver = Solver::new().with_channels(channels);
    let goal = Term::conjunction([
        c("write", vec![c("f", vec![a("x"), Term::int(1)])]),
        a("nl"),
    ]);
    assert!(solver.solve_once(goal).is_yes());
    let written: Vec<String> = rx.try_iter().collect();
    assert_eq!(written, vec!["f(x, 1)".to_string(), "\n".to_string()]);
}

#[test]
fn read_until_end_of_file() {
    let (tx, rx) = pipe();
    assert!(tx.send(a("hello")).is_ok());
    let solver =
        Solver::new().with_channels(Channels::silent().with_input(STDIN, InputChannel::Pipe(rx)));
    let mut s = Scope::new();
    let goal = Term::conjunction([c("read", vec![s.var("X")]), c("read", vec![s.var("Y")])]);
    let solution = solver.solve_once(goal);
    assert_eq!(solution.get("X"), Some(a("hello")));
    assert_eq!(solution.get("Y"), Some(a("end_of_file")));
}

// ========== BETWEEN ==========

#[test]
fn between_enumerates_inclusive_range() {
    let mut s = Scope::new();
    let got: Vec<Term> = solver()
        .solve(c("between", vec![Term::int(1), Term::int(3), s.var("X")]))
        .filter_map(|sol| sol.get("X"))
        .collect();
    assert_eq!(got, vec![Term::int(1), Term::int(2), Term::int(3)]);
}

#[test]
fn between_checks_and_bounds() {
    let mut s = Scope::new();
    assert!(holds(c("between", vec![Term::int(1), Term::int(3), Term::int(3)])));
    assert!(!holds(c("between", vec![Term::int(1), Term::int(3), Term::int(4)])));
    assert!(!holds(c("between", vec![Term::int(3), Term::int(1), s.var("X")])));
    assert!(holds(c("between", vec![Term::int(1), a("inf"), Term::int(1_000_000)])));
}

#[test]
fn between_with_infinite_upper_bound_is_lazy() {
    let mut s = Scope::new();
    let taken: Vec<Term> = solver()
        .solve(c("between", vec![Term::int(0), a("inf"), s.var("X")]))
        .take(4)
        .filter_map(|sol| sol.get("X"))
        .collect();
    assert_eq!(taken.len(), 4);
    assert_eq!(taken.last(), Some(&Term::int(3)));
}

#[test]
fn between_errors() {
    let mut s = Scope::new();
    assert_eq!(
        raises(c("between", vec![s.var("L"), Term::int(3), s.var("X")])),
        Some(ErrorKind::Instantiation)
    );
    assert_eq!(
        raises(c("between", vec![Term::int(1), Term::int(3), a("x")])),
        Some(ErrorKind::Type)
    );
}

// ========== LIBRARY PREDICATES ==========

#[test]
fn once_and_ignore() {
    let mut s = Scope::new();
    let list = Term::list([Term::int(1), Term::int(2)]);
    let member = c("member", vec![s.var("X"), list]);
    let all: Vec<Solution> = solver().solve(c("once", vec![member])).collect();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get("X"), Some(Term::int(1)));

    assert!(holds(c("ignore", vec![Term::fail()])));
}

#[test]
fn library_exports() {
    let lib = library();
    assert_eq!(lib.alias(), ALIAS);
    let indicators: Vec<String> = lib.primitive_indicators().map(|i| i.to_string()).collect();
    for expected in ["=/2", "assertz/1", "retract/1", "between/3", "write/1"] {
        assert!(indicators.iter().any(|i| i == expected), "missing {}", expected);
    }
    assert_eq!(lib.clauses().len(), 6);
}

#[test]
fn library_loads_into_a_fresh_runtime() {
    let mut runtime = crate::library::Runtime::new();
    assert!(runtime.load(library()).is_ok());
    assert!(runtime.is_loaded(ALIAS));
    assert!(runtime.load(library()).is_err());
}
