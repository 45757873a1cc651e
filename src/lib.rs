//! A line-oriented command interpreter.
//!
//! Each input line is a pipeline of stages separated by `|`. A stage is a
//! builtin command, a `name=value` assignment, or an external program. Stages
//! run one after another, each one reading the complete output of the one
//! before it.
//!
//! The main entry point is [`Interpreter`]. The public modules expose the pieces
//! it is built from: [`lexer`] turns a line into a [`Pipeline`](lexer::Pipeline),
//! [`dispatch`] decides how each stage runs, and [`pipeline`] runs the stages.
//! Implement [`Command`](command::Command) and register it to add builtins.

mod builtin;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod env;
mod external;
mod interpreter;
mod io_adapters;
pub mod lexer;
pub mod logging;
pub mod pipeline;
mod substitution;

pub use external::{ExternalCommand, find_command_path};
pub use interpreter::Interpreter;
pub use io_adapters::Stream;
pub use substitution::substitute;
