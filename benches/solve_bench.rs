//! Resolution benchmarks using Criterion.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure:
//! - Unification of deep terms
//! - Clause retrieval from a large indexed predicate
//! - Deep recursion through library clauses
//! - Backtracking over many primitive answers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sldlog::channel::Channels;
use sldlog::index::ClauseIndex;
use sldlog::term::Scope;
use sldlog::unify::Unificator;
use sldlog::{Clause, Solver, Term};

fn silent_solver() -> Solver {
    Solver::new().with_channels(Channels::silent())
}

/// `edge(i, i + 1)` for `i < n`.
fn edges(n: i64) -> Vec<Clause> {
    (0..n)
        .map(|i| Clause::fact(Term::compound("edge", [Term::int(i), Term::int(i + 1)])))
        .collect()
}

/// `s(s(...s(tail)...))` with `n` successors.
fn peano(n: u32, tail: Term) -> Term {
    (0..n).fold(tail, |acc, _| Term::compound("s", [acc]))
}

/// Benchmark unifying a deep ground term against one ending in a variable.
fn bench_unify(c: &mut Criterion) {
    let mut group = c.benchmark_group("unify");
    let unificator = Unificator::default();

    for depth in [10u32, 100, 1_000] {
        let ground = peano(depth, Term::atom("z"));
        let open = peano(depth, Term::var("Z"));
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, _| {
            b.iter(|| black_box(unificator.unify(black_box(&ground), black_box(&open))))
        });
    }

    group.finish();
}

/// Benchmark first-argument lookup against a growing fact table.
fn bench_index_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_lookup");

    for size in [100i64, 1_000, 10_000] {
        let mut index = ClauseIndex::new();
        for clause in edges(size) {
            let _ = index.assert_z(clause);
        }
        let query = Term::compound("edge", [Term::int(size / 2), Term::var("Y")]);
        group.bench_with_input(BenchmarkId::new("facts", size), &size, |b, _| {
            b.iter(|| black_box(index.get(black_box(&query))))
        });
    }

    group.finish();
}

/// Benchmark `append/3` on lists of increasing length.
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    let solver = silent_solver();

    for len in [10i64, 100, 500] {
        let list = Term::list((0..len).map(Term::int));
        group.bench_with_input(BenchmarkId::new("len", len), &len, |b, _| {
            b.iter(|| {
                let mut s = Scope::new();
                let goal = Term::compound("append", [list.clone(), list.clone(), s.var("R")]);
                black_box(solver.solve_once(goal))
            })
        });
    }

    group.finish();
}

/// Benchmark exhausting `between/3` answers, one backtrack per answer.
fn bench_backtracking(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtrack");
    let solver = silent_solver();

    for n in [100i64, 1_000] {
        group.bench_with_input(BenchmarkId::new("answers", n), &n, |b, &n| {
            b.iter(|| {
                let mut s = Scope::new();
                let goal = Term::compound("between", [Term::int(1), Term::int(n), s.var("X")]);
                black_box(solver.solve(goal).count())
            })
        });
    }

    group.finish();
}

/// Benchmark a recursive path query over a chain of edges.
fn bench_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("path");

    for n in [50i64, 200] {
        let mut solver = silent_solver();
        let mut program = edges(n);
        // path(X, X).
        // path(X, Z) :- edge(X, Y), path(Y, Z).
        let mut s = Scope::new();
        program.push(Clause::fact(Term::compound("path", [s.var("X"), s.var("X")])));
        let mut s = Scope::new();
        program.push(Clause::rule(
            Term::compound("path", [s.var("X"), s.var("Z")]),
            Term::conjunction([
                Term::compound("edge", [s.var("X"), s.var("Y")]),
                Term::compound("path", [s.var("Y"), s.var("Z")]),
            ]),
        ));
        let _ = solver.consult(program);

        group.bench_with_input(BenchmarkId::new("chain", n), &n, |b, &n| {
            b.iter(|| {
                let goal = Term::compound("path", [Term::int(0), Term::int(n)]);
                black_box(solver.solve_once(goal))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_unify,
    bench_index_lookup,
    bench_append,
    bench_backtracking,
    bench_path
);
criterion_main!(benches);
