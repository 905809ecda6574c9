//! Public entry point: a solver owns a runtime, a theory and channels, and
//! issues solve requests against snapshots of them.

use crate::channel::Channels;
use crate::clause::Clause;
use crate::context::ExecutionContext;
use crate::error::{ClauseError, LibraryError};
use crate::index::{ClauseIndex, DEFAULT_NESTING};
use crate::library::{Library, Runtime};
use crate::solve::{Solution, Solutions, SolveRequest};
use crate::stdlib;
use crate::term::{Indicator, Term};
use crate::theory::{RetractResult, Theory};
use std::sync::Arc;
use std::time::Duration;

/// What to do when a goal calls a predicate nobody defines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownPolicy {
    /// Throw `existence_error(procedure, Name/Arity)`.
    Error,
    /// Write a warning to the `warnings` channel and fail.
    #[default]
    Warning,
    /// Fail silently.
    Fail,
}

/// Flags visible to primitives through the execution context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverFlags {
    pub occurs_check: bool,
    pub unknown: UnknownPolicy,
}

/// Solver configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// Time budget of each request; `None` is unbounded.
    pub max_duration: Option<Duration>,
    pub flags: SolverFlags,
    /// Depth of first-argument indexing.
    pub index_nesting: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_duration: None,
            flags: SolverFlags::default(),
            index_nesting: DEFAULT_NESTING,
        }
    }
}

impl SolverConfig {
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    pub fn with_occurs_check(mut self, occurs_check: bool) -> Self {
        self.flags.occurs_check = occurs_check;
        self
    }

    pub fn with_unknown(mut self, unknown: UnknownPolicy) -> Self {
        self.flags.unknown = unknown;
        self
    }

    pub fn with_index_nesting(mut self, nesting: usize) -> Self {
        self.index_nesting = nesting;
        self
    }
}

/// A Prolog solver.
///
/// Each solve request runs against a snapshot of the theory. Changes a
/// derivation makes to the dynamic knowledge base are visible to that
/// derivation; `commit` adopts them into the solver.
#[derive(Clone, Debug)]
pub struct Solver {
    runtime: Arc<Runtime>,
    theory: Theory,
    channels: Channels,
    config: SolverConfig,
}

impl Solver {
    /// A solver with the standard library loaded and standard channels.
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    pub fn with_config(config: SolverConfig) -> Self {
        let mut runtime = Runtime::with_nesting(config.index_nesting);
        match runtime.load(stdlib::library()) {
            Ok(()) => {}
            // A fresh runtime has nothing loaded and the builtin clauses are
            // well formed, so neither error can occur.
            Err(e) => unreachable!("builtins failed to load: {e}"),
        }
        let runtime = Arc::new(runtime);
        let theory = Theory::with_nesting(config.index_nesting)
            .with_library(Arc::clone(runtime.clauses()));
        Self {
            runtime,
            theory,
            channels: Channels::standard(),
            config,
        }
    }

    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
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

    pub fn load_library(&mut self, library: Library) -> Result<(), LibraryError> {
        Arc::make_mut(&mut self.runtime).load(library)?;
        self.refresh_library();
        Ok(())
    }

    pub fn unload_library(&mut self, alias: &str) -> Result<(), LibraryError> {
        Arc::make_mut(&mut self.runtime).unload(alias)?;
        self.refresh_library();
        Ok(())
    }

    fn refresh_library(&mut self) {
        self.theory = self
            .theory
            .clone()
            .with_library(Arc::clone(self.runtime.clauses()));
    }

    /// Append `clauses` to the static knowledge base.
    pub fn consult(
        &mut self,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> Result<(), ClauseError> {
        let mut index: ClauseIndex = (**self.theory.static_kb()).clone();
        for clause in clauses {
            index.assert_z(clause)?;
        }
        self.theory = self.theory.clone().with_static(Arc::new(index));
        Ok(())
    }

    pub fn assert_a(&mut self, clause: Clause) -> Result<(), ClauseError> {
        self.theory.assert_a(clause)
    }

    pub fn assert_z(&mut self, clause: Clause) -> Result<(), ClauseError> {
        self.theory.assert_z(clause)
    }

    pub fn retract(&mut self, patterns: impl IntoIterator<Item = Clause>) -> RetractResult {
        self.theory.retract(patterns)
    }

    pub fn abolish(&mut self, indicator: &Indicator) -> Vec<Clause> {
        self.theory.abolish(indicator)
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext::new(
            self.theory.clone(),
            Arc::clone(&self.runtime),
            self.channels.clone(),
            self.config.flags,
        )
    }

    /// Lazily solve `goal` with the configured time budget.
    pub fn solve(&self, goal: Term) -> Solutions {
        let request =
            SolveRequest::new(goal, self.context()).with_max_duration(self.config.max_duration);
        Solutions::new(request)
    }

    /// Lazily solve `goal`, halting with a time-out after `max_duration`.
    pub fn solve_with_timeout(&self, goal: Term, max_duration: Duration) -> Solutions {
        let request = SolveRequest::new(goal, self.context()).with_max_duration(Some(max_duration));
        Solutions::new(request)
    }

    /// The first solution of `goal`.
    pub fn solve_once(&self, goal: Term) -> Solution {
        let query = goal.clone();
        self.solve(goal)
            .next()
            .unwrap_or(Solution::No { query })
    }

    /// Adopt the knowledge base left behind by `solutions`.
    pub fn commit(&mut self, solutions: &Solutions) {
        self.theory = self
            .theory
            .clone()
            .with_dynamic(Arc::clone(solutions.theory().dynamic_kb()));
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/solver.rs"]
mod tests;
