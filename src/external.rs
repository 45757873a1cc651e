use crate::command::ExecutionError;
use crate::env::Environment;
use crate::io_adapters::Stream;
use crate::lexer::Token;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::process::{ExitStatus, Stdio};

/// A program that is not a builtin.
///
/// All arguments after the program are joined with single spaces and handed to
/// the program as *one* argument. `grep -n foo` therefore runs `grep` with the
/// single argument `"-n foo"`. This is a known limitation of the interpreter, not
/// an argv-correct invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    name: String,
    program: PathBuf,
    combined_args: Option<String>,
}

impl ExternalCommand {
    pub fn new(name: impl Into<String>, program: PathBuf, combined_args: Option<String>) -> Self {
        Self {
            name: name.into(),
            program,
            combined_args,
        }
    }

    /// Build the invocation for `name` located at `program`, combining `args`.
    pub fn from_tokens(name: &str, program: PathBuf, args: &[Token]) -> Self {
        let combined_args = if args.is_empty() {
            None
        } else {
            Some(
                args.iter()
                    .map(Token::text)
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        };
        Self::new(name, program, combined_args)
    }

    /// The name as typed on the command line.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The single argument the program receives, if any.
    pub fn combined_args(&self) -> Option<&str> {
        self.combined_args.as_deref()
    }

    /// Run the program to completion and capture its standard output.
    ///
    /// The input stream is released unread, the child gets a null stdin. Standard
    /// error is passed through to the terminal.
    pub fn execute(&self, input: Stream, env: &Environment) -> Result<Stream, ExecutionError> {
        input.close();

        let mut cmd = std::process::Command::new(&self.program);
        if let Some(args) = &self.combined_args {
            cmd.arg(args);
        }
        cmd.current_dir(&env.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        tracing::debug!(
            program = %self.program.display(),
            args = ?self.combined_args,
            "spawning external command"
        );
        let output = cmd.output().map_err(|source| ExecutionError::SpawnFailed {
            program: self.name.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ExecutionError::ExternalProcessFailed {
                program: self.name.clone(),
                status: describe_status(output.status),
            });
        }
        Ok(Stream::from_bytes(output.stdout))
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => describe_signal(status),
    }
}

#[cfg(unix)]
fn describe_signal(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("signal {signal}"),
        None => status.to_string(),
    }
}

#[cfg(not(unix))]
fn describe_signal(status: ExitStatus) -> String {
    status.to_string()
}

/// Locate the program a stage names.
///
/// A bare name (`ls`) is searched in each directory of `search_paths`. Anything
/// with a separator (`/bin/ls`, `./run.sh`, `tools/fmt`) is a path, relative ones
/// are taken from the session directory `cwd` rather than the process cwd.
/// Only regular files match.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, name: &Path) -> Option<PathBuf> {
    let mut components = name.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(Component::Normal(bare)), None) => find_in_path(search_paths, bare),
        _ => Some(cwd.join(name)).filter(|path| path.is_file()),
    }
}

fn find_in_path(search_paths: &OsStr, name: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}
