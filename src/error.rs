//! Error taxonomy.
//!
//! Logic errors (`PrologError`) travel only through `throw`/`catch`: a
//! primitive returns one, the engine turns it into a thrown ball. Host-level
//! misuse of the API (asserting a malformed clause, loading the same library
//! twice) is reported with ordinary `Result` errors instead.

use crate::term::{Indicator, Term};
use std::fmt;

/// The ISO error classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Instantiation,
    Type,
    Existence,
    Domain,
    Permission,
    Representation,
    Evaluation,
    Resource,
    System,
}

impl ErrorKind {
    /// Functor of the description term for this class.
    pub fn functor(self) -> &'static str {
        match self {
            ErrorKind::Instantiation => "instantiation_error",
            ErrorKind::Type => "type_error",
            ErrorKind::Existence => "existence_error",
            ErrorKind::Domain => "domain_error",
            ErrorKind::Permission => "permission_error",
            ErrorKind::Representation => "representation_error",
            ErrorKind::Evaluation => "evaluation_error",
            ErrorKind::Resource => "resource_error",
            ErrorKind::System => "system_error",
        }
    }
}

/// A structured logic error, thrown as `error(Description, Extra)`.
///
/// `contexts` is a stack of goals the error passed through, innermost
/// first. Unless `extra` is set explicitly it becomes the extra data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrologError {
    pub kind: ErrorKind,
    pub description: Term,
    pub message: String,
    pub extra: Option<Term>,
    pub contexts: Vec<Term>,
}

impl PrologError {
    fn new(kind: ErrorKind, description: Term, message: String) -> Self {
        Self {
            kind,
            description,
            message,
            extra: None,
            contexts: Vec::new(),
        }
    }

    pub fn instantiation() -> Self {
        Self::new(
            ErrorKind::Instantiation,
            Term::atom(ErrorKind::Instantiation.functor()),
            "arguments are not sufficiently instantiated".to_string(),
        )
    }

    pub fn type_error(expected: &str, culprit: Term) -> Self {
        let message = format!("expected {}, found {}", expected, culprit);
        Self::new(
            ErrorKind::Type,
            Term::compound(ErrorKind::Type.functor(), [Term::atom(expected), culprit]),
            message,
        )
    }

    pub fn existence_procedure(indicator: Indicator) -> Self {
        Self::new(
            ErrorKind::Existence,
            Term::compound(
                ErrorKind::Existence.functor(),
                [Term::atom("procedure"), indicator.to_term()],
            ),
            format!("unknown procedure {}", indicator),
        )
    }

    pub fn existence(object: &str, culprit: Term) -> Self {
        let message = format!("{} {} does not exist", object, culprit);
        Self::new(
            ErrorKind::Existence,
            Term::compound(ErrorKind::Existence.functor(), [Term::atom(object), culprit]),
            message,
        )
    }

    pub fn domain_error(domain: &str, culprit: Term) -> Self {
        let message = format!("{} is not in domain {}", culprit, domain);
        Self::new(
            ErrorKind::Domain,
            Term::compound(ErrorKind::Domain.functor(), [Term::atom(domain), culprit]),
            message,
        )
    }

    pub fn permission_error(action: &str, kind: &str, culprit: Term) -> Self {
        let message = format!("no permission to {} {} {}", action, kind, culprit);
        Self::new(
            ErrorKind::Permission,
            Term::compound(
                ErrorKind::Permission.functor(),
                [Term::atom(action), Term::atom(kind), culprit],
            ),
            message,
        )
    }

    pub fn representation_error(what: &str) -> Self {
        Self::new(
            ErrorKind::Representation,
            Term::compound(ErrorKind::Representation.functor(), [Term::atom(what)]),
            format!("cannot represent {}", what),
        )
    }

    pub fn evaluation_error(what: &str) -> Self {
        Self::new(
            ErrorKind::Evaluation,
            Term::compound(ErrorKind::Evaluation.functor(), [Term::atom(what)]),
            format!("arithmetic error: {}", what),
        )
    }

    pub fn resource_error(what: &str) -> Self {
        Self::new(
            ErrorKind::Resource,
            Term::compound(ErrorKind::Resource.functor(), [Term::atom(what)]),
            format!("resource exhausted: {}", what),
        )
    }

    pub fn system_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorKind::System,
            Term::compound(ErrorKind::System.functor(), [Term::atom(&message)]),
            message,
        )
    }

    pub fn with_extra(mut self, extra: Term) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Record that the error propagated out of `goal`.
    pub fn push_context(mut self, goal: Term) -> Self {
        self.contexts.push(goal);
        self
    }

    /// The thrown form `error(Description, Extra)`.
    pub fn to_term(&self) -> Term {
        let extra = match &self.extra {
            Some(extra) => extra.clone(),
            None => Term::list(self.contexts.iter().cloned()),
        };
        Term::compound("error", [self.description.clone(), extra])
    }
}

impl fmt::Display for PrologError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.functor(), self.message)
    }
}

impl std::error::Error for PrologError {}

/// Anything that can be thrown: a structured error or an arbitrary ball.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Throwable {
    Error(PrologError),
    Ball(Term),
}

impl Throwable {
    pub fn to_term(&self) -> Term {
        match self {
            Throwable::Error(e) => e.to_term(),
            Throwable::Ball(t) => t.clone(),
        }
    }
}

impl From<PrologError> for Throwable {
    fn from(e: PrologError) -> Self {
        Throwable::Error(e)
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Throwable::Error(e) => write!(f, "{}", e),
            Throwable::Ball(t) => write!(f, "unhandled exception: {}", t),
        }
    }
}

/// Why a request stopped for good.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Halt {
    /// `halt/0` or `halt/1` with the given exit code.
    Signal(i32),
    /// The request ran past its maximum duration.
    TimeOut,
    /// An exception reached the request root without a matching catch.
    Uncaught(Throwable),
}

impl Halt {
    pub fn is_time_out(&self) -> bool {
        matches!(self, Halt::TimeOut)
    }

    pub fn exception(&self) -> Option<&Throwable> {
        match self {
            Halt::Uncaught(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Signal(code) => write!(f, "halted with exit code {}", code),
            Halt::TimeOut => f.write_str("time out"),
            Halt::Uncaught(t) => write!(f, "{}", t),
        }
    }
}

/// A clause rejected before reaching a knowledge base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClauseError {
    /// The head is a variable or a number.
    InvalidHead(Term),
    /// A number sits where the body expects a goal.
    InvalidBody(Term),
    /// Directives have no head and cannot be stored.
    Directive(Term),
}

impl fmt::Display for ClauseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseError::InvalidHead(t) => write!(f, "clause head is not callable: {}", t),
            ClauseError::InvalidBody(t) => write!(f, "clause body is not callable: {}", t),
            ClauseError::Directive(t) => write!(f, "directive cannot be stored: {}", t),
        }
    }
}

impl std::error::Error for ClauseError {}

/// Library registration problems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryError {
    AlreadyLoaded(String),
    NotLoaded(String),
    InvalidClause { alias: String, error: ClauseError },
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::AlreadyLoaded(alias) => write!(f, "library {} is already loaded", alias),
            LibraryError::NotLoaded(alias) => write!(f, "library {} is not loaded", alias),
            LibraryError::InvalidClause { alias, error } => {
                write!(f, "library {}: {}", alias, error)
            }
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<ClauseError> for PrologError {
    fn from(e: ClauseError) -> Self {
        match e {
            ClauseError::InvalidHead(t) if t.is_var() => PrologError::instantiation(),
            ClauseError::InvalidHead(t)
            | ClauseError::InvalidBody(t)
            | ClauseError::Directive(t) => PrologError::type_error("callable", t),
        }
    }
}

#[cfg(test)]
#[path = "tests/error.rs"]
mod tests;
