use super::*;
use crate::solver::Solver;
use crate::term::Term;

#[test]
fn macros_accept_engine_field_syntax() {
    let goal = Term::atom("p");
    trace!(step = 1u64, depth = 0usize, %goal, "goal_evaluation");
    debug!(%goal, "exception raised");
    warn!(indicator = "p/0", "unknown procedure");

    let _span = debug_span!("solve", query = %goal).entered();
    assert!(goal.is_atom());
}

#[test]
fn subscriber_install_is_repeatable() {
    init_subscriber();
    init_subscriber();
}

#[test]
fn solving_with_subscriber_installed() {
    init_subscriber();
    let solver = Solver::new();
    let solution = solver.solve_once(Term::compound("=", [Term::var("X"), Term::int(1)]));
    assert!(solution.is_yes());
}
