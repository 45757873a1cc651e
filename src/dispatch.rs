//! Stage resolution: builtin, assignment or external program.
//!
//! ```text
//! Stage ──▶ head text registered? ──yes──▶ Resolution::Builtin
//!                  │no
//!                  ▼
//!           unquoted `name=value`? ──yes──▶ Resolution::Assignment
//!                  │no
//!                  ▼
//!           program found on disk/PATH? ──yes──▶ Resolution::External
//!                  │no
//!                  ▼
//!           DispatchError::UnknownCommand
//! ```

use crate::command::{Command, CommandRegistry};
use crate::external::{ExternalCommand, find_command_path};
use crate::lexer::{QuoteKind, Stage};
use crate::substitution::is_name_boundary;
use std::env;
use std::ffi::OsString;
use std::path::Path;
use thiserror::Error;

/// Errors that stop a stage before it runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{0}: command not found")]
    UnknownCommand(String),
    #[error("{0}: not a valid variable name")]
    MalformedAssignment(String),
}

/// What a stage turned out to be.
pub enum Resolution<'a> {
    /// An in-process command from the registry.
    Builtin(&'a dyn Command),
    /// `name=value`: writes one variable and produces no output.
    Assignment { name: String, value: String },
    /// A program to spawn, with its arguments already combined.
    External(ExternalCommand),
}

impl Resolution<'_> {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Resolution::Builtin(_) => "builtin",
            Resolution::Assignment { .. } => "assignment",
            Resolution::External(_) => "external",
        }
    }
}

/// Resolves stages against a [`CommandRegistry`] and the program search path.
pub struct Dispatcher {
    registry: CommandRegistry,
    search_path: Option<OsString>,
}

impl Dispatcher {
    /// Dispatcher over `registry`, searching the process `PATH` for programs.
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            search_path: None,
        }
    }

    /// Use a fixed search path instead of the process `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Decide how `stage` runs.
    ///
    /// Builtins win over everything, then unquoted `name=value` heads, then
    /// external programs. Relative program paths are looked up from
    /// `current_dir`. Anything else is an unknown command.
    pub fn resolve(
        &self,
        stage: &Stage,
        current_dir: &Path,
    ) -> Result<Resolution<'_>, DispatchError> {
        let head = stage.head();

        if let Some(command) = self.registry.get(head.text()) {
            return Ok(Resolution::Builtin(command));
        }

        if head.kind() == QuoteKind::Unquoted {
            if let Some(eq) = head.text().find('=').filter(|&index| index > 0) {
                let (name, value) = (&head.text()[..eq], &head.text()[eq + 1..]);
                if name.chars().any(|c| c == '$' || is_name_boundary(c)) {
                    return Err(DispatchError::MalformedAssignment(name.to_string()));
                }
                return Ok(Resolution::Assignment {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }

        let search_path = match &self.search_path {
            Some(path) => path.clone(),
            None => env::var_os("PATH").unwrap_or_default(),
        };
        let program = find_command_path(&search_path, current_dir, Path::new(head.text()))
            .ok_or_else(|| DispatchError::UnknownCommand(head.text().to_string()))?;

        Ok(Resolution::External(ExternalCommand::from_tokens(
            head.text(),
            program,
            stage.arguments(),
        )))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(CommandRegistry::default())
    }
}
