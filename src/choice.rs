//! Continuations and the choice-point stack.
//!
//! Both are persistent singly-linked stacks: pushing returns a new stack
//! that shares its tail with the old one, so a choice point can capture the
//! continuation in O(1) and restoring it is a pointer copy.

use crate::clause::Clause;
use crate::library::Responses;
use crate::subst::Substitution;
use crate::term::Term;
use parking_lot::Mutex;
use std::fmt;
use std::iter::Peekable;
use std::sync::Arc;

struct Node<T> {
    head: T,
    tail: Stack<T>,
    len: usize,
}

/// An immutable stack with structural sharing.
pub struct Stack<T>(Option<Arc<Node<T>>>);

impl<T> Stack<T> {
    pub fn new() -> Self {
        Stack(None)
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |node| node.len)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn push(&self, head: T) -> Self {
        Stack(Some(Arc::new(Node {
            head,
            tail: self.clone(),
            len: self.len() + 1,
        })))
    }

    pub fn peek(&self) -> Option<&T> {
        self.0.as_ref().map(|node| &node.head)
    }

    /// Top element and the stack below it.
    pub fn pop(&self) -> Option<(&T, Stack<T>)> {
        self.0.as_ref().map(|node| (&node.head, node.tail.clone()))
    }

    /// The stack with everything above `len` elements removed.
    pub fn truncate(&self, len: usize) -> Self {
        let mut current = self.clone();
        while current.len() > len {
            current = match current.0.as_ref() {
                Some(node) => node.tail.clone(),
                None => break,
            };
        }
        current
    }

    pub fn iter(&self) -> StackIter<'_, T> {
        StackIter {
            current: self.0.as_deref(),
        }
    }
}

impl<T: PartialEq> Stack<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.iter().any(|v| v == value)
    }
}

impl<T> Clone for Stack<T> {
    fn clone(&self) -> Self {
        Stack(self.0.clone())
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Unlink iteratively; long continuations would overflow a recursive drop.
impl<T> Drop for Stack<T> {
    fn drop(&mut self) {
        let mut current = self.0.take();
        while let Some(node) = current {
            match Arc::try_unwrap(node) {
                Ok(mut node) => current = node.tail.0.take(),
                Err(_) => break,
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct StackIter<'a, T> {
    current: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for StackIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.current?;
        self.current = node.tail.0.as_deref();
        Some(&node.head)
    }
}

/// Ids of the `catch/3` frames enclosing a goal, innermost first.
pub type Catches = Stack<u64>;

/// Work pending after the current goal.
#[derive(Clone, Debug)]
pub enum Frame {
    /// Run `goal`; a cut inside it cuts back to `cut_parent`.
    Goal {
        goal: Term,
        cut_parent: usize,
        catches: Catches,
        depth: usize,
    },
    /// The goal of catch `id` succeeded; drop its marker if nothing above it.
    CatchExit { id: u64 },
    /// Discard choice points above `height` (the condition of `->` succeeded).
    CutTo { height: usize },
}

pub type Kont = Stack<Frame>;

/// State restored when resuming a choice point.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub kont: Kont,
    pub substitution: Substitution,
    pub catches: Catches,
    pub depth: usize,
}

/// What a choice point resumes.
pub enum Alternatives {
    /// Remaining candidate clauses for `goal`, from `next` on.
    Clauses {
        goal: Term,
        clauses: Arc<[Clause]>,
        next: usize,
    },
    /// Remaining responses of a primitive call. Taken on resume.
    Responses {
        goal: Term,
        responses: Mutex<Option<Peekable<Responses>>>,
    },
    /// Another branch of a disjunction or the else branch of `->`.
    Goal { goal: Term, cut_parent: usize },
    /// Marker of an active `catch/3`. No alternatives of its own.
    Catch {
        id: u64,
        catcher: Term,
        recovery: Term,
    },
}

impl fmt::Debug for Alternatives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alternatives::Clauses { goal, clauses, next } => f
                .debug_struct("Clauses")
                .field("goal", &goal.to_string())
                .field("remaining", &(clauses.len() - next))
                .finish(),
            Alternatives::Responses { goal, .. } => f
                .debug_struct("Responses")
                .field("goal", &goal.to_string())
                .finish(),
            Alternatives::Goal { goal, cut_parent } => f
                .debug_struct("Goal")
                .field("goal", &goal.to_string())
                .field("cut_parent", cut_parent)
                .finish(),
            Alternatives::Catch { id, catcher, .. } => f
                .debug_struct("Catch")
                .field("id", id)
                .field("catcher", &catcher.to_string())
                .finish(),
        }
    }
}

#[derive(Debug)]
pub struct ChoicePoint {
    pub snapshot: Snapshot,
    pub alternatives: Alternatives,
}

impl ChoicePoint {
    pub fn is_catch(&self, catch_id: u64) -> bool {
        matches!(self.alternatives, Alternatives::Catch { id, .. } if id == catch_id)
    }
}

/// Pending choice points, most recent on top. The height of the stack is
/// what cut barriers record.
#[derive(Clone, Debug, Default)]
pub struct ChoicePointStack(Stack<ChoicePoint>);

impl ChoicePointStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&self, choice_point: ChoicePoint) -> Self {
        ChoicePointStack(self.0.push(choice_point))
    }

    pub fn peek(&self) -> Option<&ChoicePoint> {
        self.0.peek()
    }

    pub fn pop(&self) -> Option<(&ChoicePoint, ChoicePointStack)> {
        self.0.pop().map(|(cp, rest)| (cp, ChoicePointStack(rest)))
    }

    /// Discard every choice point above `height`.
    pub fn cut_to(&self, height: usize) -> Self {
        ChoicePointStack(self.0.truncate(height))
    }

    pub fn iter(&self) -> StackIter<'_, ChoicePoint> {
        self.0.iter()
    }
}

#[cfg(test)]
#[path = "tests/choice.rs"]
mod tests;
