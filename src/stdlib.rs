//! The `builtins` library loaded into every solver: unification and type
//! checks, knowledge-base updates, basic I/O, `between/3`, and a few list
//! and control predicates written as clauses.

use crate::channel::{STDIN, STDOUT};
use crate::clause::Clause;
use crate::error::{ClauseError, PrologError};
use crate::library::{
    many, no, one, raise, Library, PrimitiveCall, Response, Responses, SideEffect,
};
use crate::solve::is_control_construct;
use crate::subst::Substitution;
use crate::term::{Indicator, Scope, Term};

pub const ALIAS: &str = "builtins";

pub fn library() -> Library {
    Library::new(ALIAS)
        .with_primitive("=", 2, unify)
        .with_primitive("\\=", 2, not_unifiable)
        .with_primitive("==", 2, identical)
        .with_primitive("\\==", 2, not_identical)
        .with_primitive("var", 1, is_var)
        .with_primitive("nonvar", 1, is_nonvar)
        .with_primitive("atom", 1, is_atom)
        .with_primitive("number", 1, is_number)
        .with_primitive("integer", 1, is_integer)
        .with_primitive("float", 1, is_float)
        .with_primitive("atomic", 1, is_atomic)
        .with_primitive("compound", 1, is_compound)
        .with_primitive("callable", 1, is_callable)
        .with_primitive("asserta", 1, asserta)
        .with_primitive("assertz", 1, assertz)
        .with_primitive("assert", 1, assertz)
        .with_primitive("retract", 1, retract)
        .with_primitive("abolish", 1, abolish)
        .with_primitive("write", 1, write)
        .with_primitive("nl", 0, nl)
        .with_primitive("read", 1, read)
        .with_primitive("between", 3, between)
        .with_clauses(library_clauses())
}

fn library_clauses() -> Vec<Clause> {
    let mut clauses = Vec::new();

    // member(X, [X|_]).
    // member(X, [_|T]) :- member(X, T).
    let mut s = Scope::new();
    clauses.push(Clause::fact(Term::compound("member", [
        s.var("X"),
        Term::cons(s.var("X"), s.var("_")),
    ])));
    let mut s = Scope::new();
    clauses.push(Clause::rule(
        Term::compound("member", [s.var("X"), Term::cons(s.var("_"), s.var("T"))]),
        Term::compound("member", [s.var("X"), s.var("T")]),
    ));

    // append([], L, L).
    // append([H|T], L, [H|R]) :- append(T, L, R).
    let mut s = Scope::new();
    clauses.push(Clause::fact(Term::compound("append", [
        Term::empty_list(),
        s.var("L"),
        s.var("L"),
    ])));
    let mut s = Scope::new();
    clauses.push(Clause::rule(
        Term::compound("append", [
            Term::cons(s.var("H"), s.var("T")),
            s.var("L"),
            Term::cons(s.var("H"), s.var("R")),
        ]),
        Term::compound("append", [s.var("T"), s.var("L"), s.var("R")]),
    ));

    // once(G) :- call(G), !.
    let mut s = Scope::new();
    clauses.push(Clause::rule(
        Term::compound("once", [s.var("G")]),
        Term::conjunction([Term::compound("call", [s.var("G")]), Term::atom("!")]),
    ));

    // ignore(G) :- (call(G) -> true ; true).
    let mut s = Scope::new();
    clauses.push(Clause::rule(
        Term::compound("ignore", [s.var("G")]),
        Term::compound(";", [
            Term::compound("->", [Term::compound("call", [s.var("G")]), Term::truth()]),
            Term::truth(),
        ]),
    ));

    clauses
}

// ---------------------------------------------------------------------------
// Unification and comparison
// ---------------------------------------------------------------------------

fn unify(call: PrimitiveCall<'_>) -> Responses {
    call.reply_unify(call.arg(0), call.arg(1))
}

fn not_unifiable(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(!call.unificator().matches(call.arg(0), call.arg(1)))
}

fn identical(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(call.arg(0) == call.arg(1))
}

fn not_identical(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(call.arg(0) != call.arg(1))
}

// ---------------------------------------------------------------------------
// Type checks
// ---------------------------------------------------------------------------

fn is_var(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(call.arg(0).is_var())
}

fn is_nonvar(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(!call.arg(0).is_var())
}

fn is_atom(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(call.arg(0).is_atom())
}

fn is_number(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(call.arg(0).is_number())
}

fn is_integer(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(matches!(call.arg(0), Term::Int(_)))
}

fn is_float(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(matches!(call.arg(0), Term::Real(_)))
}

fn is_atomic(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(call.arg(0).is_atomic())
}

fn is_compound(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(call.arg(0).is_compound())
}

fn is_callable(call: PrimitiveCall<'_>) -> Responses {
    call.reply_if(call.arg(0).is_callable())
}

// ---------------------------------------------------------------------------
// Knowledge base
// ---------------------------------------------------------------------------

/// Predicates a program may not redefine: control constructs, primitives
/// and library predicates.
fn is_protected(call: &PrimitiveCall<'_>, indicator: &Indicator) -> bool {
    is_control_construct(indicator)
        || call.context.runtime().is_primitive(indicator)
        || call.context.theory().library().contains_indicator(indicator)
}

fn permission_to_modify(indicator: Indicator) -> PrologError {
    PrologError::permission_error("modify", "static_procedure", indicator.to_term())
}

/// Turn the argument of `assert*/1` into a storable clause. The stored copy
/// shares no variables with the caller.
fn storable_clause(call: &PrimitiveCall<'_>, term: &Term) -> Result<Clause, PrologError> {
    if term.is_var() {
        return Err(PrologError::instantiation());
    }
    let clause = Clause::from_term(&term.fresh_copy())?;
    let Some(indicator) = clause.indicator() else {
        return Err(ClauseError::Directive(term.clone()).into());
    };
    if is_protected(call, &indicator) {
        return Err(permission_to_modify(indicator));
    }
    Ok(clause)
}

fn asserta(call: PrimitiveCall<'_>) -> Responses {
    match storable_clause(&call, call.arg(0)) {
        Ok(clause) => {
            one(Response::yes(Substitution::empty()).with_side_effect(SideEffect::AssertA(clause)))
        }
        Err(e) => raise(e),
    }
}

fn assertz(call: PrimitiveCall<'_>) -> Responses {
    match storable_clause(&call, call.arg(0)) {
        Ok(clause) => {
            one(Response::yes(Substitution::empty()).with_side_effect(SideEffect::AssertZ(clause)))
        }
        Err(e) => raise(e),
    }
}

/// `retract(Head :- Body)` or `retract(Head)`: one answer per unifying
/// dynamic clause, taken from the knowledge base as it was at call time.
fn retract(call: PrimitiveCall<'_>) -> Responses {
    let pattern = call.arg(0);
    let (head, body) = if pattern.is_functor(":-", 2) {
        (pattern.args()[0].clone(), pattern.args()[1].clone())
    } else {
        (pattern.clone(), Term::truth())
    };
    match &head {
        Term::Var(_) => return raise(PrologError::instantiation()),
        Term::Int(_) | Term::Real(_) => return raise(PrologError::type_error("callable", head)),
        Term::Struct(s) => {
            if is_protected(&call, &s.indicator()) {
                return raise(permission_to_modify(s.indicator()));
            }
        }
    }

    let candidates = call.context.theory().dynamic_kb().get(&head);
    let wanted = Term::compound(":-", [head, body]);
    let unificator = call.unificator();
    many(candidates.into_iter().filter_map(move |stored| {
        let copy = stored.fresh_copy();
        let target = Term::compound(":-", [copy.head()?.clone(), copy.body()]);
        match unificator.unify(&wanted, &target) {
            Substitution::Failed => None,
            mgu => Some(Ok(Response::yes(mgu).with_side_effect(SideEffect::Retract(stored)))),
        }
    }))
}

fn abolish(call: PrimitiveCall<'_>) -> Responses {
    let spec = call.arg(0);
    if spec.is_var() {
        return raise(PrologError::instantiation());
    }
    if !spec.is_functor("/", 2) {
        return raise(PrologError::type_error("predicate_indicator", spec.clone()));
    }
    let (name, arity) = (&spec.args()[0], &spec.args()[1]);
    if name.is_var() || arity.is_var() {
        return raise(PrologError::instantiation());
    }
    if !name.is_atom() {
        return raise(PrologError::type_error("atom", name.clone()));
    }
    let Some(n) = arity.as_int() else {
        return raise(PrologError::type_error("integer", arity.clone()));
    };
    if n < 0 {
        return raise(PrologError::domain_error("not_less_than_zero", arity.clone()));
    }
    let Some(indicator) = Indicator::from_term(spec) else {
        return no();
    };
    if is_protected(&call, &indicator) {
        return raise(permission_to_modify(indicator));
    }
    one(Response::yes(Substitution::empty()).with_side_effect(SideEffect::Abolish(indicator)))
}

// ---------------------------------------------------------------------------
// I/O
// ---------------------------------------------------------------------------

fn write(call: PrimitiveCall<'_>) -> Responses {
    match call.context.channels().write(STDOUT, &call.arg(0).to_string()) {
        Ok(()) => one(Response::yes(Substitution::empty())),
        Err(e) => raise(e),
    }
}

fn nl(call: PrimitiveCall<'_>) -> Responses {
    match call.context.channels().write(STDOUT, "\n") {
        Ok(()) => one(Response::yes(Substitution::empty())),
        Err(e) => raise(e),
    }
}

/// Unify the argument with the next input term, or `end_of_file`.
fn read(call: PrimitiveCall<'_>) -> Responses {
    match call.context.channels().read(STDIN) {
        Ok(Some(term)) => call.reply_unify(call.arg(0), &term),
        Ok(None) => call.reply_unify(call.arg(0), &Term::atom("end_of_file")),
        Err(e) => raise(e),
    }
}

// ---------------------------------------------------------------------------
// Arithmetic enumeration
// ---------------------------------------------------------------------------

/// `between(Low, High, X)`; `High` may be `inf`.
fn between(call: PrimitiveCall<'_>) -> Responses {
    let low = match call.arg(0) {
        Term::Int(i) => *i,
        Term::Var(_) => return raise(PrologError::instantiation()),
        other => return raise(PrologError::type_error("integer", other.clone())),
    };
    let high = match call.arg(1) {
        Term::Int(i) => *i,
        t if t.is_atom_named("inf") || t.is_atom_named("infinite") => i64::MAX,
        Term::Var(_) => return raise(PrologError::instantiation()),
        other => return raise(PrologError::type_error("integer", other.clone())),
    };
    match call.arg(2) {
        Term::Int(x) => call.reply_if(low <= *x && *x <= high),
        Term::Var(var) => {
            let var = *var;
            many(
                (low..=high)
                    .map(move |i| Ok(Response::yes(Substitution::of([(var, Term::int(i))])))),
            )
        }
        other => raise(PrologError::type_error("integer", other.clone())),
    }
}

#[cfg(test)]
#[path = "tests/stdlib.rs"]
mod tests;
