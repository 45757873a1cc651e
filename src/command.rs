use crate::env::Environment;
use crate::io_adapters::Stream;
use crate::lexer::Token;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while a command runs. Any of them aborts the pipeline.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A file or directory argument could not be opened.
    #[error("{command}: {}: No such file or directory", .path.display())]
    FileNotFound { command: String, path: PathBuf },
    /// `cd` was pointed at something that is not a directory.
    #[error("cd: {}: Not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// Argument parsing failed; carries the usage message.
    #[error("{0}")]
    InvalidArguments(String),
    /// The external program could not be started.
    #[error("{program}: failed to start: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The external program exited unsuccessfully.
    #[error("{program}: exited with {status}")]
    ExternalProcessFailed { program: String, status: String },
    /// Reading input or producing output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The capability every pipeline stage handler satisfies.
///
/// Implementors receive the arguments after the head token and take ownership of
/// the input stream. They must release it exactly once, either by reading it or
/// by closing it, before returning their output.
pub trait Command {
    /// Canonical name of the command, e.g. "echo" or "wc".
    fn name(&self) -> &str;

    /// Run the command, consuming `input` and producing the stage's output.
    fn execute(
        &self,
        args: &[Token],
        input: Stream,
        env: &mut Environment,
    ) -> Result<Stream, ExecutionError>;
}

/// Name → implementation mapping of the in-process commands.
///
/// The registry is open: [`CommandRegistry::register`] adds new commands or
/// replaces existing ones. See [`Default`] for the builtins included out of the
/// box.
pub struct CommandRegistry {
    commands: BTreeMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// A registry with no commands at all.
    pub fn empty() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// Register `command` under its own name, replacing any previous entry.
    pub fn register(&mut self, command: Box<dyn Command>) -> &mut Self {
        self.commands.insert(command.name().to_string(), command);
        self
    }

    /// Builder-style variant of [`CommandRegistry::register`].
    pub fn with(mut self, command: Box<dyn Command>) -> Self {
        self.register(command);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

impl Default for CommandRegistry {
    /// Create a registry with the default builtins:
    /// `echo`, `cat`, `wc`, `pwd`, `cd`, `ls` and `exit`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::empty()
            .with(Box::new(Echo))
            .with(Box::new(Builtin::<Cat>::default()))
            .with(Box::new(Builtin::<Wc>::default()))
            .with(Box::new(Pwd))
            .with(Box::new(Builtin::<Cd>::default()))
            .with(Box::new(Builtin::<Ls>::default()))
            .with(Box::new(Exit))
    }
}
