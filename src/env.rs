use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Session-lifetime mapping of shell variables backing `$name` substitution.
///
/// The store starts empty and is never populated from the process environment.
/// Looking up a name that was never assigned yields the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    vars: HashMap<String, String>,
}

impl VariableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name`, or `""` when it was never assigned.
    pub fn lookup(&self, name: &str) -> &str {
        self.vars.get(name).map(String::as_str).unwrap_or("")
    }

    /// Returns `true` if `name` has been assigned, even to the empty string.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Set or override a single variable.
    pub fn assign(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Mutable, per-session state handed to every command.
///
/// The environment contains:
/// - `variables`: the shell variables assigned with `name=value`.
/// - `current_dir`: the working directory for builtins and external commands.
/// - `should_exit`: raised by `exit`; the interactive loop checks it to terminate.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Shell variables visible to substitution.
    pub variables: VariableStore,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, the pipeline stops and the session should end.
    pub should_exit: bool,
}

impl Environment {
    /// Start a session: no variables, working directory taken from the process.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_dir(current_dir)
    }

    /// Start a session rooted at `current_dir`.
    pub fn with_dir(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            variables: VariableStore::new(),
            current_dir: current_dir.into(),
            should_exit: false,
        }
    }

    /// Home directory of the user running the interpreter, from `$HOME`.
    pub fn home_dir(&self) -> Option<PathBuf> {
        stdenv::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
