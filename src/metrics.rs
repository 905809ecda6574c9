//! Resolution metrics.
//!
//! Aggregate counters for one solve request. With the `tracing` feature the
//! engine records into atomics; without it every call is a no-op and
//! `report` returns zeros.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut solutions = solver.solve(goal);
//! let _ = solutions.by_ref().count();
//! let report = solutions.metrics();
//! println!("Steps: {}, Backtracks: {}", report.steps, report.backtracks);
//! ```

#[cfg(feature = "tracing")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while a request runs. Relaxed ordering throughout.
#[cfg(feature = "tracing")]
#[derive(Debug)]
pub struct EvalMetrics {
    /// State transitions taken
    pub steps: AtomicU64,
    /// Goals classified in GoalEvaluation
    pub goal_evaluations: AtomicU64,
    /// Entries into RuleSelection
    pub rule_selections: AtomicU64,
    /// Primitive invocations
    pub primitive_calls: AtomicU64,
    /// Clause head unifications that succeeded
    pub unifications: AtomicU64,
    /// Clause head unifications that failed
    pub unification_failures: AtomicU64,
    /// Choice points resumed
    pub backtracks: AtomicU64,
    /// Cuts executed
    pub cuts: AtomicU64,
    /// Exceptions raised
    pub exceptions: AtomicU64,
    /// Choice points created
    pub choice_points: AtomicU64,
    /// Highest choice-point stack observed
    pub max_choice_depth: AtomicU64,
    /// Solutions yielded
    pub solutions: AtomicU64,
}

#[cfg(feature = "tracing")]
impl EvalMetrics {
    pub fn new() -> Self {
        Self {
            steps: AtomicU64::new(0),
            goal_evaluations: AtomicU64::new(0),
            rule_selections: AtomicU64::new(0),
            primitive_calls: AtomicU64::new(0),
            unifications: AtomicU64::new(0),
            unification_failures: AtomicU64::new(0),
            backtracks: AtomicU64::new(0),
            cuts: AtomicU64::new(0),
            exceptions: AtomicU64::new(0),
            choice_points: AtomicU64::new(0),
            max_choice_depth: AtomicU64::new(0),
            solutions: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_goal_evaluation(&self) {
        self.goal_evaluations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rule_selection(&self) {
        self.rule_selections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_primitive_call(&self) {
        self.primitive_calls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unification(&self) {
        self.unifications.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unification_failure(&self) {
        self.unification_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_backtrack(&self) {
        self.backtracks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cut(&self) {
        self.cuts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_exception(&self) {
        self.exceptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a new choice point; `height` is the stack height after the push.
    #[inline]
    pub fn record_choice_point(&self, height: u64) {
        self.choice_points.fetch_add(1, Ordering::Relaxed);
        self.update_max_choice_depth(height);
    }

    #[inline]
    pub fn update_max_choice_depth(&self, depth: u64) {
        let mut current = self.max_choice_depth.load(Ordering::Relaxed);
        while depth > current {
            match self.max_choice_depth.compare_exchange_weak(
                current,
                depth,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(c) => current = c,
            }
        }
    }

    #[inline]
    pub fn record_solution(&self) {
        self.solutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            steps: self.steps.load(Ordering::Relaxed),
            goal_evaluations: self.goal_evaluations.load(Ordering::Relaxed),
            rule_selections: self.rule_selections.load(Ordering::Relaxed),
            primitive_calls: self.primitive_calls.load(Ordering::Relaxed),
            unifications: self.unifications.load(Ordering::Relaxed),
            unification_failures: self.unification_failures.load(Ordering::Relaxed),
            backtracks: self.backtracks.load(Ordering::Relaxed),
            cuts: self.cuts.load(Ordering::Relaxed),
            exceptions: self.exceptions.load(Ordering::Relaxed),
            choice_points: self.choice_points.load(Ordering::Relaxed),
            max_choice_depth: self.max_choice_depth.load(Ordering::Relaxed),
            solutions: self.solutions.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.steps,
            &self.goal_evaluations,
            &self.rule_selections,
            &self.primitive_calls,
            &self.unifications,
            &self.unification_failures,
            &self.backtracks,
            &self.cuts,
            &self.exceptions,
            &self.choice_points,
            &self.max_choice_depth,
            &self.solutions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(feature = "tracing")]
impl Default for EvalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsReport {
    pub steps: u64,
    pub goal_evaluations: u64,
    pub rule_selections: u64,
    pub primitive_calls: u64,
    pub unifications: u64,
    pub unification_failures: u64,
    pub backtracks: u64,
    pub cuts: u64,
    pub exceptions: u64,
    pub choice_points: u64,
    pub max_choice_depth: u64,
    pub solutions: u64,
}

impl MetricsReport {
    /// Share of clause head unifications that succeeded.
    pub fn unification_success_rate(&self) -> f64 {
        let total = self.unifications + self.unification_failures;
        if total == 0 {
            1.0
        } else {
            self.unifications as f64 / total as f64
        }
    }

    /// Choice points resumed per choice point created.
    pub fn backtrack_ratio(&self) -> f64 {
        if self.choice_points == 0 {
            0.0
        } else {
            self.backtracks as f64 / self.choice_points as f64
        }
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Resolution Metrics ===")?;
        writeln!(f, "Steps:              {}", self.steps)?;
        writeln!(
            f,
            "Goals:              {} evaluated, {} rule selections, {} primitive calls",
            self.goal_evaluations, self.rule_selections, self.primitive_calls
        )?;
        writeln!(
            f,
            "Unifications:       {} ({} failures, {:.1}% success)",
            self.unifications,
            self.unification_failures,
            self.unification_success_rate() * 100.0
        )?;
        writeln!(
            f,
            "Choice points:      {} created, {} resumed, max depth {}",
            self.choice_points, self.backtracks, self.max_choice_depth
        )?;
        writeln!(f, "Cuts:               {}", self.cuts)?;
        writeln!(f, "Exceptions:         {}", self.exceptions)?;
        writeln!(f, "Solutions:          {}", self.solutions)?;
        Ok(())
    }
}

// No-op implementation when tracing is disabled
#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct EvalMetrics;

#[cfg(not(feature = "tracing"))]
impl EvalMetrics {
    #[inline]
    pub fn new() -> Self {
        EvalMetrics
    }
    #[inline]
    pub fn record_step(&self) {}
    #[inline]
    pub fn record_goal_evaluation(&self) {}
    #[inline]
    pub fn record_rule_selection(&self) {}
    #[inline]
    pub fn record_primitive_call(&self) {}
    #[inline]
    pub fn record_unification(&self) {}
    #[inline]
    pub fn record_unification_failure(&self) {}
    #[inline]
    pub fn record_backtrack(&self) {}
    #[inline]
    pub fn record_cut(&self) {}
    #[inline]
    pub fn record_exception(&self) {}
    #[inline]
    pub fn record_choice_point(&self, _height: u64) {}
    #[inline]
    pub fn update_max_choice_depth(&self, _depth: u64) {}
    #[inline]
    pub fn record_solution(&self) {}
    #[inline]
    pub fn report(&self) -> MetricsReport {
        MetricsReport::default()
    }
    #[inline]
    pub fn reset(&self) {}
}

#[cfg(not(feature = "tracing"))]
impl Default for EvalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/metrics.rs"]
mod tests;
