use super::*;
use crate::term::Scope;

fn p(arg: Term) -> Term {
    Term::compound("p", [arg])
}

fn index(clauses: Vec<Clause>) -> Arc<ClauseIndex> {
    match ClauseIndex::from_clauses(clauses, DEFAULT_NESTING) {
        Ok(index) => Arc::new(index),
        Err(e) => panic!("bad clause: {}", e),
    }
}

#[test]
fn library_precedes_static_precedes_dynamic() {
    let mut theory = Theory::new()
        .with_library(index(vec![Clause::fact(p(Term::atom("lib")))]))
        .with_static(index(vec![Clause::fact(p(Term::atom("static")))]));
    assert!(theory.assert_a(Clause::fact(p(Term::atom("dyn")))).is_ok());

    let mut scope = Scope::new();
    let got: Vec<String> = theory
        .get(&p(scope.var("X")))
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(got, vec!["p(lib).", "p(static).", "p(dyn)."]);
    assert_eq!(theory.len(), 3);
}

#[test]
fn writes_only_touch_dynamic_kb() {
    let mut theory = Theory::new().with_static(index(vec![Clause::fact(p(Term::atom("a")))]));
    let removed = theory.retract_all(&p(Term::atom("a")));
    assert!(removed.is_empty());
    assert_eq!(theory.static_kb().len(), 1);
}

#[test]
fn retract_reports_partial_success() {
    let mut theory = Theory::new();
    assert!(theory
        .assert_all_z([Clause::fact(p(Term::int(0))), Clause::fact(p(Term::int(1)))])
        .is_ok());
    let result = theory.retract([
        Clause::fact(p(Term::int(1))),
        Clause::fact(p(Term::int(9))),
    ]);
    assert_eq!(result.retracted, vec![Clause::fact(p(Term::int(1)))]);
    assert_eq!(result.missing, vec![Clause::fact(p(Term::int(9)))]);
    assert!(!result.is_complete());
    assert_eq!(theory.dynamic_kb().len(), 1);
}

#[test]
fn assert_all_a_keeps_relative_order() {
    let mut theory = Theory::new();
    assert!(theory.assert_z(Clause::fact(p(Term::int(9)))).is_ok());
    assert!(theory
        .assert_all_a([Clause::fact(p(Term::int(1))), Clause::fact(p(Term::int(2)))])
        .is_ok());
    let got: Vec<String> = theory.clauses().iter().map(|c| c.to_string()).collect();
    assert_eq!(got, vec!["p(1).", "p(2).", "p(9)."]);
}

#[test]
fn abolish_removes_every_shape() {
    let mut scope = Scope::new();
    let mut theory = Theory::new();
    assert!(theory
        .assert_all_z([
            Clause::fact(p(Term::atom("a"))),
            Clause::rule(p(scope.var("X")), Term::atom("q")),
            Clause::fact(Term::compound("p", [Term::atom("a"), Term::atom("b")])),
        ])
        .is_ok());
    let removed = theory.abolish(&Indicator::new("p", 1));
    assert_eq!(removed.len(), 2);
    assert!(!theory.defines(&Indicator::new("p", 1)));
    assert!(theory.defines(&Indicator::new("p", 2)));
}

#[test]
fn snapshots_do_not_see_later_writes() {
    let mut theory = Theory::new();
    assert!(theory.assert_z(Clause::fact(p(Term::int(0)))).is_ok());
    let snapshot = theory.clone();
    assert!(theory.assert_z(Clause::fact(p(Term::int(1)))).is_ok());
    assert_eq!(snapshot.len(), 1);
    assert_eq!(theory.len(), 2);
}

#[test]
fn retract_exact_removes_stored_clause() {
    let mut theory = Theory::new();
    let c = Clause::fact(p(Term::atom("x")));
    assert!(theory.assert_z(c.clone()).is_ok());
    assert!(theory.retract_exact(&c));
    assert!(!theory.retract_exact(&c));
}
