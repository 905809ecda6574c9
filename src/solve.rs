//! Resolution Engine - SLD resolution as an explicit state machine.
//!
//! A solve request starts in `Init` and is driven one transition at a time
//! by `State::next`. `Solutions` pulls transitions until an `End` state and
//! turns it into a `Solution`; after a `Yes` with choice points left, the
//! next pull resumes from `Backtrack`.
//!
//! Control constructs (conjunction, disjunction, if-then-else, negation,
//! cut, `call/N`, `catch/3`, `throw/1`, `halt/0,1`) are handled here.
//! Everything else is a primitive from the runtime or a user predicate from
//! the theory.

use crate::channel::WARNINGS;
use crate::choice::{Alternatives, ChoicePoint, Frame, Kont, Snapshot};
use crate::clause::Clause;
use crate::context::ExecutionContext;
use crate::error::{Halt, PrologError, Throwable};
use crate::library::{Primitive, PrimitiveCall, Responses, SideEffect};
use crate::metrics::{EvalMetrics, MetricsReport};
use crate::solver::UnknownPolicy;
use crate::subst::Substitution;
use crate::term::{Indicator, Term, Var};
use crate::theory::Theory;
use crate::trace::{debug, debug_span, trace, warn};
use parking_lot::Mutex;
use std::fmt;
use std::iter::Peekable;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry point of the engine: a goal plus the context to prove it in.
#[derive(Clone, Debug)]
pub struct SolveRequest {
    goal: Term,
    context: ExecutionContext,
    issued_at: Instant,
    max_duration: Option<Duration>,
}

impl SolveRequest {
    pub fn new(goal: Term, context: ExecutionContext) -> Self {
        let max_duration = context.max_duration;
        Self {
            goal,
            context,
            issued_at: Instant::now(),
            max_duration,
        }
    }

    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn with_issued_at(mut self, issued_at: Instant) -> Self {
        self.issued_at = issued_at;
        self
    }

    pub fn goal(&self) -> &Term {
        &self.goal
    }

    /// The predicate being queried. A variable query is a `call/1`.
    pub fn signature(&self) -> Option<Indicator> {
        match &self.goal {
            Term::Var(_) => Some(Indicator::new("call", 1)),
            goal => goal.indicator(),
        }
    }

    pub fn arguments(&self) -> &[Term] {
        match &self.goal {
            Term::Var(_) => std::slice::from_ref(&self.goal),
            goal => goal.args(),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }
}

/// Terminal states of a branch (`True`, `False`) or of the request (`Halt`).
#[derive(Debug)]
pub enum End {
    True(ExecutionContext),
    False(ExecutionContext),
    Halt(ExecutionContext, Halt),
}

/// The engine states.
pub enum State {
    Init(SolveRequest),
    GoalEvaluation(ExecutionContext),
    /// The goal, resolved under the context's substitution.
    RuleSelection(ExecutionContext, Term),
    PrimitiveExecution(ExecutionContext, Term, Arc<dyn Primitive>),
    Backtrack(ExecutionContext),
    Exception(ExecutionContext, Throwable),
    End(End),
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Init(_) => "init",
            State::GoalEvaluation(_) => "goal_evaluation",
            State::RuleSelection(..) => "rule_selection",
            State::PrimitiveExecution(..) => "primitive_execution",
            State::Backtrack(_) => "backtrack",
            State::Exception(..) => "exception",
            State::End(End::True(_)) => "end_true",
            State::End(End::False(_)) => "end_false",
            State::End(End::Halt(..)) => "end_halt",
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, State::End(_))
    }

    /// Take one transition. `End` states are returned unchanged.
    pub fn next(self, metrics: &EvalMetrics) -> State {
        metrics.record_step();
        match self {
            State::Init(request) => init(request),
            State::GoalEvaluation(ctx) => evaluate(ctx, metrics),
            State::RuleSelection(ctx, goal) => select_rule(ctx, goal, metrics),
            State::PrimitiveExecution(ctx, goal, primitive) => {
                execute(ctx, goal, primitive, metrics)
            }
            State::Backtrack(ctx) => backtrack(ctx, metrics),
            State::Exception(ctx, thrown) => unwind(ctx, thrown, metrics),
            end @ State::End(_) => end,
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn halt(ctx: ExecutionContext, halt: Halt) -> State {
    debug!(%halt, "request halted");
    State::End(End::Halt(ctx, halt))
}

fn throw(ctx: ExecutionContext, error: PrologError) -> State {
    State::Exception(ctx, Throwable::Error(error))
}

fn init(request: SolveRequest) -> State {
    let SolveRequest {
        goal,
        mut context,
        issued_at,
        max_duration,
    } = request;
    context.issued_at = issued_at;
    context.max_duration = max_duration;
    context.kont = Kont::new();
    context.choice_points = Default::default();
    context.catches = Default::default();
    context.cut_parent = 0;
    context.depth = 0;

    let goal = context.resolve(&goal);
    if goal.is_atom_named("true") {
        return State::End(End::True(context));
    }
    context.goal = match goal {
        Term::Var(_) => Term::compound("call", [goal]),
        Term::Struct(_) => goal,
        Term::Int(_) | Term::Real(_) => return State::End(End::False(context)),
    };
    State::GoalEvaluation(context)
}

/// Save what a choice point needs to resume and push it.
fn push_choice(ctx: &mut ExecutionContext, alternatives: Alternatives, metrics: &EvalMetrics) {
    let snapshot = Snapshot {
        kont: ctx.kont.clone(),
        substitution: ctx.substitution.clone(),
        catches: ctx.catches.clone(),
        depth: ctx.depth,
    };
    ctx.choice_points = ctx.choice_points.push(ChoicePoint {
        snapshot,
        alternatives,
    });
    metrics.record_choice_point(ctx.choice_points.height() as u64);
}

/// The current goal succeeded: continue with the next pending frame.
fn proceed(mut ctx: ExecutionContext) -> State {
    loop {
        let Some((frame, rest)) = ctx.kont.pop().map(|(frame, rest)| (frame.clone(), rest)) else {
            return State::End(End::True(ctx));
        };
        ctx.kont = rest;
        match frame {
            Frame::Goal {
                goal,
                cut_parent,
                catches,
                depth,
            } => {
                ctx.goal = goal;
                ctx.cut_parent = cut_parent;
                ctx.catches = catches;
                ctx.depth = depth;
                return State::GoalEvaluation(ctx);
            }
            Frame::CatchExit { id } => {
                let on_top = ctx.choice_points.peek().is_some_and(|cp| cp.is_catch(id));
                if on_top {
                    let height = ctx.choice_points.height() - 1;
                    ctx.choice_points = ctx.choice_points.cut_to(height);
                }
            }
            Frame::CutTo { height } => {
                ctx.choice_points = ctx.choice_points.cut_to(height);
            }
        }
    }
}

fn evaluate(mut ctx: ExecutionContext, metrics: &EvalMetrics) -> State {
    if ctx.is_timed_out() {
        return halt(ctx, Halt::TimeOut);
    }
    metrics.record_goal_evaluation();
    ctx.step += 1;

    let goal = ctx.resolve(&ctx.goal);
    trace!(step = ctx.step, depth = ctx.depth, %goal, "goal_evaluation");
    let s = match &goal {
        Term::Var(_) => return throw(ctx, PrologError::instantiation()),
        Term::Int(_) | Term::Real(_) => {
            return throw(ctx, PrologError::type_error("callable", goal.clone()));
        }
        Term::Struct(s) => Arc::clone(s),
    };
    let args = s.args();

    match (s.name(), args.len()) {
        ("true", 0) => proceed(ctx),
        ("fail", 0) | ("false", 0) => State::Backtrack(ctx),
        ("!", 0) => {
            metrics.record_cut();
            trace!(height = ctx.cut_parent, "cut");
            ctx.choice_points = ctx.choice_points.cut_to(ctx.cut_parent);
            proceed(ctx)
        }
        (",", 2) => {
            ctx.kont = ctx.kont.push(Frame::Goal {
                goal: args[1].clone(),
                cut_parent: ctx.cut_parent,
                catches: ctx.catches.clone(),
                depth: ctx.depth,
            });
            ctx.goal = args[0].clone();
            State::GoalEvaluation(ctx)
        }
        (";", 2) if args[0].is_functor("->", 2) => {
            let cond = args[0].args();
            if_then_else(ctx, &cond[0], &cond[1], Some(&args[1]), metrics)
        }
        (";", 2) => {
            let cut_parent = ctx.cut_parent;
            push_choice(
                &mut ctx,
                Alternatives::Goal {
                    goal: args[1].clone(),
                    cut_parent,
                },
                metrics,
            );
            ctx.goal = args[0].clone();
            State::GoalEvaluation(ctx)
        }
        ("->", 2) => if_then_else(ctx, &args[0], &args[1], None, metrics),
        ("\\+", 1) | ("not", 1) => {
            ctx.goal = Term::compound(";", [
                Term::compound("->", [args[0].clone(), Term::fail()]),
                Term::truth(),
            ]);
            State::GoalEvaluation(ctx)
        }
        ("call", n) if n >= 1 => call(ctx, args),
        ("catch", 3) => catch(ctx, args, metrics),
        ("throw", 1) => {
            if args[0].is_var() {
                return throw(ctx, PrologError::instantiation());
            }
            let ball = args[0].fresh_copy();
            State::Exception(ctx, Throwable::Ball(ball))
        }
        ("halt", 0) => halt(ctx, Halt::Signal(0)),
        ("halt", 1) => match &args[0] {
            Term::Var(_) => throw(ctx, PrologError::instantiation()),
            Term::Int(code) => match i32::try_from(*code) {
                Ok(code) => halt(ctx, Halt::Signal(code)),
                Err(_) => throw(ctx, PrologError::representation_error("exit_code")),
            },
            other => {
                let culprit = other.clone();
                throw(ctx, PrologError::type_error("integer", culprit))
            }
        },
        _ => match ctx.runtime.primitive(&s.indicator()).cloned() {
            Some(primitive) => State::PrimitiveExecution(ctx, goal, primitive),
            None => State::RuleSelection(ctx, goal),
        },
    }
}

/// Whether `evaluate` handles `indicator` itself, ahead of any primitive or
/// clause.
pub fn is_control_construct(indicator: &Indicator) -> bool {
    match (indicator.name.as_str(), indicator.arity) {
        ("true", 0) | ("fail", 0) | ("false", 0) | ("!", 0) => true,
        (",", 2) | (";", 2) | ("->", 2) => true,
        ("\\+", 1) | ("not", 1) | ("throw", 1) | ("catch", 3) => true,
        ("halt", 0) | ("halt", 1) => true,
        ("call", n) => n >= 1,
        _ => false,
    }
}

/// `Cond -> Then ; Else`, or `Cond -> Then` when `otherwise` is `None`.
///
/// The condition is cut-opaque. Once it succeeds, everything it left behind
/// and the else branch are discarded.
fn if_then_else(
    mut ctx: ExecutionContext,
    cond: &Term,
    then: &Term,
    otherwise: Option<&Term>,
    metrics: &EvalMetrics,
) -> State {
    let height = ctx.choice_points.height();
    if let Some(otherwise) = otherwise {
        let cut_parent = ctx.cut_parent;
        push_choice(
            &mut ctx,
            Alternatives::Goal {
                goal: otherwise.clone(),
                cut_parent,
            },
            metrics,
        );
    }
    ctx.kont = ctx
        .kont
        .push(Frame::Goal {
            goal: then.clone(),
            cut_parent: ctx.cut_parent,
            catches: ctx.catches.clone(),
            depth: ctx.depth,
        })
        .push(Frame::CutTo { height });
    ctx.goal = cond.clone();
    ctx.cut_parent = ctx.choice_points.height();
    State::GoalEvaluation(ctx)
}

/// `call/N`: extra arguments are appended to the goal. Cut-opaque.
fn call(mut ctx: ExecutionContext, args: &[Term]) -> State {
    let target = &args[0];
    let goal = if args.len() == 1 {
        target.clone()
    } else {
        match target {
            Term::Struct(s) => Term::from_symbol(
                s.functor(),
                s.args().iter().chain(args[1..].iter()).cloned().collect(),
            ),
            Term::Var(_) => return throw(ctx, PrologError::instantiation()),
            other => {
                let culprit = other.clone();
                return throw(ctx, PrologError::type_error("callable", culprit));
            }
        }
    };
    match goal {
        Term::Var(_) => throw(ctx, PrologError::instantiation()),
        Term::Int(_) | Term::Real(_) => throw(ctx, PrologError::type_error("callable", goal)),
        Term::Struct(_) => {
            ctx.goal = goal;
            ctx.cut_parent = ctx.choice_points.height();
            ctx.depth += 1;
            State::GoalEvaluation(ctx)
        }
    }
}

/// `catch(Goal, Catcher, Recovery)`: leave a marker choice point, run
/// `Goal` with the marker in its catch chain.
fn catch(mut ctx: ExecutionContext, args: &[Term], metrics: &EvalMetrics) -> State {
    // Steps are never rewound, so the step number names this catch uniquely.
    let id = ctx.step;
    push_choice(
        &mut ctx,
        Alternatives::Catch {
            id,
            catcher: args[1].clone(),
            recovery: args[2].clone(),
        },
        metrics,
    );
    ctx.kont = ctx.kont.push(Frame::CatchExit { id });
    ctx.catches = ctx.catches.push(id);
    ctx.goal = args[0].clone();
    ctx.cut_parent = ctx.choice_points.height();
    ctx.depth += 1;
    State::GoalEvaluation(ctx)
}

fn select_rule(ctx: ExecutionContext, goal: Term, metrics: &EvalMetrics) -> State {
    if ctx.is_timed_out() {
        return halt(ctx, Halt::TimeOut);
    }
    metrics.record_rule_selection();
    let clauses = ctx.theory.get(&goal);
    trace!(%goal, candidates = clauses.len(), "rule_selection");
    if clauses.is_empty() {
        return unknown_or_fail(ctx, &goal);
    }
    try_clauses(ctx, goal, clauses.into(), 0, metrics)
}

/// No clause matched. If the predicate does not exist at all, apply the
/// `unknown` policy.
fn unknown_or_fail(ctx: ExecutionContext, goal: &Term) -> State {
    let Some(indicator) = goal.indicator() else {
        return State::Backtrack(ctx);
    };
    if ctx.theory.defines(&indicator) {
        return State::Backtrack(ctx);
    }
    match ctx.flags.unknown {
        UnknownPolicy::Error => throw(ctx, PrologError::existence_procedure(indicator)),
        UnknownPolicy::Warning => {
            warn!(%indicator, "unknown procedure");
            let message = format!("warning: unknown procedure {}\n", indicator);
            // A missing or broken warnings channel must not change the outcome.
            let _ = ctx.channels.write(WARNINGS, &message);
            State::Backtrack(ctx)
        }
        UnknownPolicy::Fail => State::Backtrack(ctx),
    }
}

/// Try `clauses[next..]` against `goal` in order. The first one whose
/// renamed head unifies becomes the new goal; if candidates remain, they
/// are saved as a choice point first.
fn try_clauses(
    mut ctx: ExecutionContext,
    goal: Term,
    clauses: Arc<[Clause]>,
    mut next: usize,
    metrics: &EvalMetrics,
) -> State {
    let unificator = ctx.unificator();
    while next < clauses.len() {
        let clause = clauses[next].fresh_copy();
        next += 1;
        let Some(head) = clause.head() else {
            continue;
        };
        let mgu = unificator.unify(&goal, head);
        if mgu.is_failed() {
            metrics.record_unification_failure();
            continue;
        }
        metrics.record_unification();

        let cut_parent = ctx.choice_points.height();
        if next < clauses.len() {
            push_choice(
                &mut ctx,
                Alternatives::Clauses {
                    goal: goal.clone(),
                    clauses: Arc::clone(&clauses),
                    next,
                },
                metrics,
            );
        }
        ctx.substitution = ctx.substitution.compose(&mgu);
        ctx.goal = clause.body();
        ctx.cut_parent = cut_parent;
        ctx.depth += 1;
        return State::GoalEvaluation(ctx);
    }
    State::Backtrack(ctx)
}

fn execute(
    ctx: ExecutionContext,
    goal: Term,
    primitive: Arc<dyn Primitive>,
    metrics: &EvalMetrics,
) -> State {
    if ctx.is_timed_out() {
        return halt(ctx, Halt::TimeOut);
    }
    metrics.record_primitive_call();
    let Some(signature) = goal.indicator() else {
        return State::Backtrack(ctx);
    };
    trace!(%goal, "primitive_execution");
    let responses = primitive.call(PrimitiveCall {
        signature,
        arguments: goal.args(),
        context: &ctx,
    });
    next_response(ctx, goal, responses.peekable(), metrics)
}

/// Apply a response's knowledge-base changes to `theory`. `Ok(false)` means
/// a clause to retract was already gone, which voids the response.
fn apply_side_effects(theory: &mut Theory, effects: &[SideEffect]) -> Result<bool, PrologError> {
    for effect in effects {
        match effect {
            SideEffect::AssertA(clause) => theory.assert_a(clause.clone())?,
            SideEffect::AssertZ(clause) => theory.assert_z(clause.clone())?,
            SideEffect::Retract(clause) => {
                if !theory.retract_exact(clause) {
                    return Ok(false);
                }
            }
            SideEffect::Abolish(indicator) => {
                theory.abolish(indicator);
            }
        }
    }
    Ok(true)
}

/// Continue with the next usable response of a primitive call.
fn next_response(
    mut ctx: ExecutionContext,
    goal: Term,
    mut responses: Peekable<Responses>,
    metrics: &EvalMetrics,
) -> State {
    loop {
        let response = match responses.next() {
            None => return State::Backtrack(ctx),
            Some(Err(error)) => return throw(ctx, error.push_context(goal)),
            Some(Ok(response)) => response,
        };
        if response.substitution.is_failed() {
            continue;
        }
        let mut theory = ctx.theory.clone();
        match apply_side_effects(&mut theory, &response.side_effects) {
            Err(error) => return throw(ctx, error.push_context(goal)),
            Ok(false) => continue,
            Ok(true) => {}
        }

        let cut_parent = ctx.choice_points.height();
        if responses.peek().is_some() {
            push_choice(
                &mut ctx,
                Alternatives::Responses {
                    goal: goal.clone(),
                    responses: Mutex::new(Some(responses)),
                },
                metrics,
            );
        }
        ctx.theory = theory;
        ctx.substitution = ctx.substitution.compose(&response.substitution);
        return match response.continuation {
            Some(next) => {
                ctx.goal = next;
                ctx.cut_parent = cut_parent;
                ctx.depth += 1;
                State::GoalEvaluation(ctx)
            }
            None => proceed(ctx),
        };
    }
}

/// Owned copy of what a popped choice point resumes.
enum Resume {
    Clauses(Term, Arc<[Clause]>, usize),
    Responses(Term, Option<Peekable<Responses>>),
    Goal(Term, usize),
    Skip,
}

/// Resume the most recent choice point, or end the branch with `False`.
///
/// The theory is not restored: knowledge-base changes survive backtracking.
fn backtrack(mut ctx: ExecutionContext, metrics: &EvalMetrics) -> State {
    let stack = ctx.choice_points.clone();
    let Some((cp, rest)) = stack.pop() else {
        return State::End(End::False(ctx));
    };
    metrics.record_backtrack();
    let resume = match &cp.alternatives {
        Alternatives::Clauses {
            goal,
            clauses,
            next,
        } => Resume::Clauses(goal.clone(), Arc::clone(clauses), *next),
        Alternatives::Responses { goal, responses } => {
            Resume::Responses(goal.clone(), responses.lock().take())
        }
        Alternatives::Goal { goal, cut_parent } => Resume::Goal(goal.clone(), *cut_parent),
        Alternatives::Catch { .. } => Resume::Skip,
    };
    let snapshot = cp.snapshot.clone();
    trace!(height = rest.height(), "backtrack");

    ctx.choice_points = rest;
    ctx.kont = snapshot.kont;
    ctx.substitution = snapshot.substitution;
    ctx.catches = snapshot.catches;
    ctx.depth = snapshot.depth;

    match resume {
        Resume::Clauses(goal, clauses, next) => try_clauses(ctx, goal, clauses, next, metrics),
        Resume::Responses(goal, Some(responses)) => next_response(ctx, goal, responses, metrics),
        Resume::Responses(_, None) | Resume::Skip => State::Backtrack(ctx),
        Resume::Goal(goal, cut_parent) => {
            ctx.goal = goal;
            ctx.cut_parent = cut_parent;
            State::GoalEvaluation(ctx)
        }
    }
}

/// Unwind to the innermost active catch whose catcher unifies with the
/// ball. Everything above it on the choice-point stack is discarded.
fn unwind(mut ctx: ExecutionContext, thrown: Throwable, metrics: &EvalMetrics) -> State {
    metrics.record_exception();
    let ball = thrown.to_term();
    debug!(%ball, "exception raised");
    let unificator = ctx.unificator();

    let mut stack = ctx.choice_points.clone();
    loop {
        let (found, rest) = match stack.pop() {
            None => break,
            Some((cp, rest)) => {
                let found = match &cp.alternatives {
                    Alternatives::Catch {
                        id,
                        catcher,
                        recovery,
                    } if ctx.catches.contains(id) => {
                        let catcher = catcher.apply(&cp.snapshot.substitution);
                        let mgu = unificator.unify(&catcher, &ball);
                        mgu.is_success()
                            .then(|| (cp.snapshot.clone(), recovery.clone(), mgu))
                    }
                    _ => None,
                };
                (found, rest)
            }
        };
        if let Some((snapshot, recovery, mgu)) = found {
            ctx.choice_points = rest;
            ctx.kont = snapshot.kont;
            ctx.substitution = snapshot.substitution.compose(&mgu);
            ctx.catches = snapshot.catches;
            ctx.depth = snapshot.depth;
            ctx.goal = recovery;
            ctx.cut_parent = ctx.choice_points.height();
            return State::GoalEvaluation(ctx);
        }
        stack = rest;
    }
    halt(ctx, Halt::Uncaught(thrown))
}

/// One answer of a solve request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Solution {
    /// The query holds under `substitution`, restricted to the query's
    /// variables.
    Yes {
        query: Term,
        substitution: Substitution,
    },
    No {
        query: Term,
    },
    Halt {
        query: Term,
        halt: Halt,
    },
}

impl Solution {
    pub fn is_yes(&self) -> bool {
        matches!(self, Solution::Yes { .. })
    }

    pub fn is_no(&self) -> bool {
        matches!(self, Solution::No { .. })
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Solution::Halt { .. })
    }

    pub fn query(&self) -> &Term {
        match self {
            Solution::Yes { query, .. } | Solution::No { query } | Solution::Halt { query, .. } => {
                query
            }
        }
    }

    pub fn substitution(&self) -> Option<&Substitution> {
        match self {
            Solution::Yes { substitution, .. } => Some(substitution),
            _ => None,
        }
    }

    pub fn halt(&self) -> Option<&Halt> {
        match self {
            Solution::Halt { halt, .. } => Some(halt),
            _ => None,
        }
    }

    /// Value of the query variable named `name`, if bound.
    pub fn get(&self, name: &str) -> Option<Term> {
        let substitution = self.substitution()?;
        let var = self
            .query()
            .variables()
            .into_iter()
            .find(|v| v.name() == name)?;
        substitution.get(&var).cloned()
    }

    /// The query with the solution applied.
    pub fn solved_query(&self) -> Option<Term> {
        self.substitution().map(|s| self.query().apply(s))
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solution::Yes { substitution, .. } if substitution.is_empty() => f.write_str("yes."),
            Solution::Yes { substitution, .. } => {
                for (i, (var, value)) in substitution.sorted().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} = {}", var, value)?;
                }
                Ok(())
            }
            Solution::No { .. } => f.write_str("no."),
            Solution::Halt { halt, .. } => write!(f, "halt: {}", halt),
        }
    }
}

/// The lazy, restartable sequence of solutions of one request.
///
/// Each pull runs the state machine until the next solution. Dropping the
/// sequence early releases every pending choice point.
pub struct Solutions {
    request: SolveRequest,
    query: Term,
    query_vars: Vec<Var>,
    state: Option<State>,
    theory: Theory,
    metrics: EvalMetrics,
}

impl Solutions {
    pub fn new(request: SolveRequest) -> Self {
        let query = request.goal.clone();
        let query_vars = query.variables();
        let theory = request.context.theory.clone();
        Self {
            state: Some(State::Init(request.clone())),
            request,
            query,
            query_vars,
            theory,
            metrics: EvalMetrics::new(),
        }
    }

    /// Start over from `Init` with a fresh time budget. The theory reverts
    /// to the one the request was issued with.
    pub fn restart(&mut self) {
        let request = self.request.clone().with_issued_at(Instant::now());
        self.theory = request.context.theory.clone();
        self.state = Some(State::Init(request));
        self.metrics.reset();
    }

    pub fn query(&self) -> &Term {
        &self.query
    }

    /// The theory as left by the most recent end state, including any
    /// knowledge-base changes made by the derivation.
    pub fn theory(&self) -> &Theory {
        &self.theory
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.is_none()
    }

    fn finish(&mut self, end: End) -> Solution {
        match end {
            End::True(ctx) => {
                self.metrics.record_solution();
                self.theory = ctx.theory.clone();
                let substitution = ctx
                    .substitution
                    .restrict(self.query_vars.iter().copied());
                if !ctx.choice_points.is_empty() {
                    self.state = Some(State::Backtrack(ctx));
                }
                Solution::Yes {
                    query: self.query.clone(),
                    substitution,
                }
            }
            End::False(ctx) => {
                self.theory = ctx.theory;
                Solution::No {
                    query: self.query.clone(),
                }
            }
            End::Halt(ctx, halt) => {
                self.theory = ctx.theory;
                Solution::Halt {
                    query: self.query.clone(),
                    halt,
                }
            }
        }
    }
}

impl Iterator for Solutions {
    type Item = Solution;

    fn next(&mut self) -> Option<Solution> {
        let _span = debug_span!("solve", query = %self.query).entered();
        loop {
            let state = self.state.take()?;
            match state {
                State::End(end) => return Some(self.finish(end)),
                state => self.state = Some(state.next(&self.metrics)),
            }
        }
    }
}

impl fmt::Debug for Solutions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solutions")
            .field("query", &self.query.to_string())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/solve.rs"]
mod tests;
