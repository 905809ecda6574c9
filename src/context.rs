use crate::channel::Channels;
use crate::choice::{Catches, ChoicePointStack, Kont};
use crate::library::Runtime;
use crate::solver::SolverFlags;
use crate::subst::Substitution;
use crate::term::Term;
use crate::theory::Theory;
use crate::unify::Unificator;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The state of a derivation at one point in time.
///
/// Every resolution step builds a new context from the previous one; the
/// pieces that grow (substitution, continuation, choice points) are
/// persistent, so copies are cheap and old contexts stay valid for as long
/// as a choice point refers to them.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub(crate) goal: Term,
    /// Choice-point height a cut in `goal` truncates to.
    pub(crate) cut_parent: usize,
    pub(crate) catches: Catches,
    pub(crate) depth: usize,
    pub(crate) step: u64,
    pub(crate) kont: Kont,
    pub(crate) substitution: Substitution,
    pub(crate) choice_points: ChoicePointStack,
    pub(crate) theory: Theory,
    pub(crate) runtime: Arc<Runtime>,
    pub(crate) channels: Channels,
    pub(crate) flags: SolverFlags,
    pub(crate) issued_at: Instant,
    pub(crate) max_duration: Option<Duration>,
}

impl ExecutionContext {
    /// A root context with nothing to do yet.
    pub fn new(
        theory: Theory,
        runtime: Arc<Runtime>,
        channels: Channels,
        flags: SolverFlags,
    ) -> Self {
        Self {
            goal: Term::truth(),
            cut_parent: 0,
            catches: Catches::new(),
            depth: 0,
            step: 0,
            kont: Kont::new(),
            substitution: Substitution::empty(),
            choice_points: ChoicePointStack::new(),
            theory,
            runtime,
            channels,
            flags,
            issued_at: Instant::now(),
            max_duration: None,
        }
    }

    pub fn goal(&self) -> &Term {
        &self.goal
    }

    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    pub fn theory(&self) -> &Theory {
        &self.theory
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn flags(&self) -> &SolverFlags {
        &self.flags
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn choice_points(&self) -> &ChoicePointStack {
        &self.choice_points
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    pub fn elapsed(&self) -> Duration {
        self.issued_at.elapsed()
    }

    /// True once the request has used up its time budget.
    pub fn is_timed_out(&self) -> bool {
        self.max_duration
            .is_some_and(|max| self.issued_at.elapsed() >= max)
    }

    pub fn unificator(&self) -> Unificator {
        Unificator::new(self.flags.occurs_check)
    }

    /// Resolve `term` under the current substitution.
    pub fn resolve(&self, term: &Term) -> Term {
        term.apply(&self.substitution)
    }
}
