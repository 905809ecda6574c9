use super::*;
use crate::term::Scope;

fn p(arg: Term) -> Term {
    Term::compound("p", [arg])
}

fn fact(head: Term) -> Clause {
    Clause::fact(head)
}

fn heads(clauses: &[Clause]) -> Vec<String> {
    clauses
        .iter()
        .filter_map(|c| c.head().map(|h| h.to_string()))
        .collect()
}

fn index_of(clauses: Vec<Clause>) -> ClauseIndex {
    let mut index = ClauseIndex::new();
    for c in clauses {
        assert!(index.assert_z(c).is_ok());
    }
    index
}

// ========== RETRIEVAL ORDER ==========

#[test]
fn global_query_merges_branches_in_program_order() {
    let mut scope = Scope::new();
    let index = index_of(vec![
        fact(p(Term::atom("a"))),
        fact(p(Term::atom("b"))),
        fact(p(Term::atom("a"))),
        fact(p(Term::int(1))),
        fact(p(Term::compound("f", [Term::atom("c")]))),
    ]);
    let got = index.get(&p(scope.var("X")));
    assert_eq!(heads(&got), vec!["p(a)", "p(b)", "p(a)", "p(1)", "p(f(c))"]);
}

#[test]
fn keyed_query_includes_variable_clauses_in_order() {
    let mut scope = Scope::new();
    let index = index_of(vec![
        fact(p(Term::atom("a"))),
        fact(p(scope.var("X"))),
        fact(p(Term::atom("b"))),
        fact(p(Term::atom("a"))),
    ]);
    let got = index.get(&p(Term::atom("a")));
    assert_eq!(got.len(), 3);
    assert_eq!(got[0], fact(p(Term::atom("a"))));
    assert!(got[1].head().map(|h| h.args()[0].is_var()).unwrap_or(false));
    assert_eq!(got[2], fact(p(Term::atom("a"))));
}

#[test]
fn assert_a_prepends_across_branches() {
    let mut index = index_of(vec![fact(p(Term::atom("a"))), fact(p(Term::atom("b")))]);
    assert!(index.assert_a(fact(p(Term::atom("z")))).is_ok());
    assert!(index.assert_z(fact(p(Term::atom("y")))).is_ok());
    let mut scope = Scope::new();
    assert_eq!(
        heads(&index.get(&p(scope.var("X")))),
        vec!["p(z)", "p(a)", "p(b)", "p(y)"]
    );
}

#[test]
fn nested_keys_discriminate_and_keep_order() {
    let mut scope = Scope::new();
    let f = |t: Term| Term::compound("f", [t]);
    let index = index_of(vec![
        fact(p(f(Term::atom("a")))),
        fact(p(f(scope.var("Y")))),
        fact(p(f(Term::atom("b")))),
        fact(p(Term::atom("g"))),
    ]);
    let got = index.get(&p(f(Term::atom("b"))));
    assert_eq!(got.len(), 2);
    assert_eq!(got[1], fact(p(f(Term::atom("b")))));
    let open = index.get(&p(f(scope.var("Z"))));
    assert_eq!(open.len(), 3);
}

#[test]
fn nesting_bound_degrades_without_losing_matches() {
    let f = |t: Term| Term::compound("f", [t]);
    let mut index = ClauseIndex::with_nesting(1);
    for c in [
        fact(p(f(f(Term::atom("a"))))),
        fact(p(f(f(Term::atom("b"))))),
        fact(p(f(Term::atom("c")))),
    ] {
        assert!(index.assert_z(c).is_ok());
    }
    let got = index.get(&p(f(f(Term::atom("b")))));
    assert_eq!(got, vec![fact(p(f(f(Term::atom("b")))))]);

    let mut flat = ClauseIndex::with_nesting(0);
    assert!(flat.assert_z(fact(p(Term::atom("a")))).is_ok());
    assert!(flat.assert_z(fact(p(Term::atom("b")))).is_ok());
    assert_eq!(flat.get(&p(Term::atom("b"))).len(), 1);
}

#[test]
fn numbers_are_usable_keys() {
    let index = index_of(vec![
        fact(p(Term::int(1))),
        fact(p(Term::real(1.0))),
        fact(p(Term::int(2))),
        fact(p(Term::real(0.0))),
    ]);
    assert_eq!(index.get(&p(Term::int(1))), vec![fact(p(Term::int(1)))]);
    assert_eq!(index.get(&p(Term::real(1.0))), vec![fact(p(Term::real(1.0)))]);
    assert_eq!(index.get(&p(Term::real(-0.0))).len(), 1);
}

#[test]
fn atom_heads_are_indexed_by_family() {
    let index = index_of(vec![fact(Term::atom("go")), fact(Term::atom("stop"))]);
    assert_eq!(index.get(&Term::atom("go")), vec![fact(Term::atom("go"))]);
    assert!(index.get(&Term::atom("other")).is_empty());
    assert!(index.get(&Term::int(3)).is_empty());
}

#[test]
fn full_match_filters_beyond_first_argument() {
    let two = |a: &str, b: &str| Term::compound("q", [Term::atom(a), Term::atom(b)]);
    let index = index_of(vec![fact(two("a", "x")), fact(two("a", "y"))]);
    assert_eq!(index.get(&two("a", "y")), vec![fact(two("a", "y"))]);
}

// ========== MUTATION ==========

#[test]
fn directives_and_bad_heads_are_rejected() {
    let mut index = ClauseIndex::new();
    assert!(matches!(
        index.assert_z(Clause::directive(Term::atom("x"))),
        Err(ClauseError::Directive(_))
    ));
    assert!(index.assert_z(fact(Term::int(4))).is_err());
    assert!(index.is_empty());
}

#[test]
fn retract_all_removes_only_unifying_clauses() {
    let mut scope = Scope::new();
    let mut index = index_of(vec![
        fact(p(Term::atom("a"))),
        fact(p(Term::atom("b"))),
        fact(p(scope.var("X"))),
        fact(p(Term::atom("a"))),
    ]);
    let removed = index.retract_all(&p(Term::atom("a")));
    assert_eq!(removed.len(), 3);
    assert_eq!(removed[0], fact(p(Term::atom("a"))));
    assert_eq!(index.len(), 1);
    assert_eq!(index.clauses(), vec![fact(p(Term::atom("b")))]);
}

#[test]
fn retract_first_takes_earliest_match() {
    let mut index = index_of(vec![
        fact(p(Term::int(0))),
        fact(p(Term::int(1))),
        fact(p(Term::int(2))),
    ]);
    let mut scope = Scope::new();
    assert_eq!(index.retract_first(&p(scope.var("X"))), Some(fact(p(Term::int(0)))));
    assert_eq!(index.len(), 2);
    assert_eq!(index.retract_first(&p(Term::int(7))), None);
}

#[test]
fn remove_exact_drops_one_copy() {
    let mut index = index_of(vec![fact(p(Term::atom("a"))), fact(p(Term::atom("a")))]);
    assert!(index.remove_exact(&fact(p(Term::atom("a")))));
    assert_eq!(index.len(), 1);
    assert!(!index.remove_exact(&fact(p(Term::atom("zz")))));
}

#[test]
fn emptied_family_disappears() {
    let mut index = index_of(vec![fact(p(Term::atom("a")))]);
    let ind = Indicator::new("p", 1);
    assert!(index.contains_indicator(&ind));
    index.retract_all(&p(Term::atom("a")));
    assert!(!index.contains_indicator(&ind));
}

// ========== CACHE ==========

#[test]
fn cache_is_memoized_and_invalidated_on_write() {
    let mut index = index_of(vec![fact(p(Term::atom("a")))]);
    assert!(!index.is_cached());
    let first = index.get_cache();
    assert!(index.is_cached());
    assert!(Arc::ptr_eq(&first, &index.get_cache()));

    assert!(index.assert_z(fact(p(Term::atom("b")))).is_ok());
    assert!(!index.is_cached());
    assert_eq!(index.get_cache().len(), 2);
}

#[test]
fn clone_is_independent_after_write() {
    let original = index_of(vec![fact(p(Term::atom("a")))]);
    let mut copy = original.clone();
    assert!(copy.assert_z(fact(p(Term::atom("b")))).is_ok());
    assert_eq!(original.len(), 1);
    assert_eq!(copy.len(), 2);
    assert_eq!(original.clauses(), vec![fact(p(Term::atom("a")))]);
}

#[test]
fn get_by_indicator_lists_whole_family() {
    let mut scope = Scope::new();
    let index = index_of(vec![
        fact(p(Term::atom("b"))),
        fact(p(scope.var("X"))),
        fact(Term::atom("other")),
    ]);
    assert_eq!(index.get_by_indicator(&Indicator::new("p", 1)).len(), 2);
    assert_eq!(index.get_by_indicator(&Indicator::new("p", 2)).len(), 0);
}

#[test]
fn retract_matching_unifies_head_and_body() {
    let mut scope = Scope::new();
    let rule = |body: &str| Clause::rule(p(Term::atom("a")), Term::atom(body));
    let mut index = index_of(vec![rule("q"), rule("r")]);
    let pattern = Clause::rule(p(scope.var("X")), Term::atom("r"));
    assert_eq!(index.retract_matching(&pattern), Some(rule("r")));
    assert_eq!(index.clauses(), vec![rule("q")]);
    assert_eq!(index.retract_matching(&pattern), None);
}
