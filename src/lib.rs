//! A small line-oriented command interpreter.
//!
//! Each input line is split into shell words ([`lexer`]), cut into pipeline
//! stages at `|` ([`parser`]) and then run either as a builtin or as child
//! processes whose standard streams are chained together ([`pipeline`]).
//!
//! The main entry point is [`Interpreter`], which owns the session state
//! ([`env::Environment`]) and drives the read-eval loop over any
//! [`io_adapters::LineReader`].

pub mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod logger;
pub mod parser;
pub mod pipeline;
pub mod prompt;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
