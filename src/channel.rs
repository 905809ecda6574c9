//! Named I/O channels.
//!
//! The engine and its primitives never touch a device directly; they read
//! terms from an `InputChannel` and write text to an `OutputChannel`. Pipes
//! are crossbeam channels, so a host thread can feed input to, or collect
//! output from, a running solve request.

use crate::error::PrologError;
use crate::symbol::Symbol;
use crate::term::Term;
use crate::FxMap;
use crossbeam_channel::{Receiver, Sender};
use std::io::{BufRead, Write};
use std::sync::Arc;

pub const STDIN: &str = "stdin";
pub const STDOUT: &str = "stdout";
pub const STDERR: &str = "stderr";
pub const WARNINGS: &str = "warnings";

/// Create an unbounded pipe.
pub fn pipe<T>() -> (Sender<T>, Receiver<T>) {
    crossbeam_channel::unbounded()
}

#[derive(Clone, Debug)]
pub enum InputChannel {
    /// Terms sent by the host. Disconnected and empty reads as end of input.
    Pipe(Receiver<Term>),
    /// One atom per line of standard input, without the line terminator.
    Stdin,
    Empty,
}

impl InputChannel {
    /// Next available term, or `None` at end of input.
    pub fn next(&self) -> Option<Term> {
        match self {
            InputChannel::Pipe(rx) => rx.try_recv().ok(),
            InputChannel::Stdin => {
                let mut line = String::new();
                match std::io::stdin().lock().read_line(&mut line) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => Some(Term::atom(line.trim_end_matches(['\n', '\r']))),
                }
            }
            InputChannel::Empty => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum OutputChannel {
    Pipe(Sender<String>),
    Stdout,
    Stderr,
    /// Discards everything.
    Sink,
}

impl OutputChannel {
    pub fn write(&self, text: &str) -> Result<(), PrologError> {
        let io = |e: std::io::Error| PrologError::system_error(e.to_string());
        match self {
            OutputChannel::Pipe(tx) => tx
                .send(text.to_string())
                .map_err(|_| PrologError::existence("stream", Term::atom("pipe"))),
            OutputChannel::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes()).map_err(io)?;
                out.flush().map_err(io)
            }
            OutputChannel::Stderr => std::io::stderr().write_all(text.as_bytes()).map_err(io),
            OutputChannel::Sink => Ok(()),
        }
    }
}

/// The channel table handed to every solve request.
#[derive(Clone, Debug)]
pub struct Channels {
    inputs: Arc<FxMap<Symbol, InputChannel>>,
    outputs: Arc<FxMap<Symbol, OutputChannel>>,
}

impl Channels {
    /// Process standard streams; warnings go to standard error.
    pub fn standard() -> Self {
        Self::empty()
            .with_input(STDIN, InputChannel::Stdin)
            .with_output(STDOUT, OutputChannel::Stdout)
            .with_output(STDERR, OutputChannel::Stderr)
            .with_output(WARNINGS, OutputChannel::Stderr)
    }

    /// Standard names bound to nothing: no input, all output discarded.
    pub fn silent() -> Self {
        Self::empty()
            .with_input(STDIN, InputChannel::Empty)
            .with_output(STDOUT, OutputChannel::Sink)
            .with_output(STDERR, OutputChannel::Sink)
            .with_output(WARNINGS, OutputChannel::Sink)
    }

    fn empty() -> Self {
        Self {
            inputs: Arc::new(FxMap::default()),
            outputs: Arc::new(FxMap::default()),
        }
    }

    pub fn with_input(mut self, name: &str, channel: InputChannel) -> Self {
        Arc::make_mut(&mut self.inputs).insert(Symbol::intern(name), channel);
        self
    }

    pub fn with_output(mut self, name: &str, channel: OutputChannel) -> Self {
        Arc::make_mut(&mut self.outputs).insert(Symbol::intern(name), channel);
        self
    }

    pub fn input(&self, name: &str) -> Option<&InputChannel> {
        self.inputs.get(&Symbol::get(name)?)
    }

    pub fn output(&self, name: &str) -> Option<&OutputChannel> {
        self.outputs.get(&Symbol::get(name)?)
    }

    /// Write to a named output. Unknown names are an existence error.
    pub fn write(&self, name: &str, text: &str) -> Result<(), PrologError> {
        match self.output(name) {
            Some(channel) => channel.write(text),
            None => Err(PrologError::existence("stream", Term::atom(name))),
        }
    }

    /// Read from a named input. Unknown names are an existence error.
    pub fn read(&self, name: &str) -> Result<Option<Term>, PrologError> {
        match self.input(name) {
            Some(channel) => Ok(channel.next()),
            None => Err(PrologError::existence("stream", Term::atom(name))),
        }
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[path = "tests/channel.rs"]
mod tests;
