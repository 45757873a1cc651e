use crate::command::{Command, ExecutionError};
use crate::env::Environment;
use crate::io_adapters::Stream;
use crate::lexer::Token;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Read;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Built-in commands whose arguments are parsed with [`argh`].
///
/// Implementors are plain `FromArgs` structs; [`Builtin`] adapts them to the
/// [`Command`] capability by parsing the stage's tokens first.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cat" or "wc".
    fn name() -> &'static str;

    /// Executes the parsed command. `input` must be consumed or closed.
    fn execute(self, input: Stream, env: &mut Environment) -> Result<Stream, ExecutionError>;
}

/// [`Command`] adapter for an argh-parsed [`BuiltinCommand`].
pub(crate) struct Builtin<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Builtin<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> Command for Builtin<T> {
    fn name(&self) -> &str {
        T::name()
    }

    fn execute(
        &self,
        args: &[Token],
        input: Stream,
        env: &mut Environment,
    ) -> Result<Stream, ExecutionError> {
        let args: Vec<&str> = args.iter().map(Token::text).collect();
        match T::from_args(&[T::name()], &args) {
            Ok(cmd) => cmd.execute(input, env),
            // --help and friends: the usage text is the command's output
            Err(EarlyExit {
                output,
                status: Ok(()),
            }) => {
                input.close();
                Ok(Stream::from_text(output))
            }
            Err(EarlyExit { output, .. }) => {
                input.close();
                Err(ExecutionError::InvalidArguments(
                    output.trim_end().to_string(),
                ))
            }
        }
    }
}

/// Resolve a user-supplied path against the session's working directory.
fn resolve_path(env: &Environment, path: &str) -> PathBuf {
    env.current_dir.join(path)
}

fn read_file(command: &str, env: &Environment, name: &str) -> Result<Vec<u8>, ExecutionError> {
    let mut file =
        fs::File::open(resolve_path(env, name)).map_err(|_| ExecutionError::FileNotFound {
            command: command.to_string(),
            path: PathBuf::from(name),
        })?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Print the current working directory.
pub struct Pwd;

impl Command for Pwd {
    fn name(&self) -> &str {
        "pwd"
    }

    fn execute(
        &self,
        _args: &[Token],
        input: Stream,
        env: &mut Environment,
    ) -> Result<Stream, ExecutionError> {
        input.close();
        Ok(Stream::from_text(format!(
            "{}\n",
            env.current_dir.to_string_lossy()
        )))
    }
}

/// Write every argument followed by a space, then a newline.
pub struct Echo;

impl Command for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn execute(
        &self,
        args: &[Token],
        input: Stream,
        _env: &mut Environment,
    ) -> Result<Stream, ExecutionError> {
        input.close();
        let mut out = String::new();
        for arg in args {
            out.push_str(arg.text());
            out.push(' ');
        }
        out.push('\n');
        Ok(Stream::from_text(out))
    }
}

/// End the session. The pipeline executor stops as soon as this runs.
pub struct Exit;

impl Command for Exit {
    fn name(&self) -> &str {
        "exit"
    }

    fn execute(
        &self,
        _args: &[Token],
        input: Stream,
        env: &mut Environment,
    ) -> Result<Stream, ExecutionError> {
        input.close();
        env.should_exit = true;
        Ok(Stream::empty())
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by $HOME.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to, absolute or relative to the current directory;
    /// defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, input: Stream, env: &mut Environment) -> Result<Stream, ExecutionError> {
        input.close();
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => env.home_dir().ok_or_else(|| {
                ExecutionError::InvalidArguments("cd: no target and HOME not set".into())
            })?,
        };

        let new_dir = env.current_dir.join(&target);
        if !new_dir.exists() {
            return Err(ExecutionError::FileNotFound {
                command: "cd".into(),
                path: target,
            });
        }
        if !new_dir.is_dir() {
            return Err(ExecutionError::NotADirectory(target));
        }

        let canonical = fs::canonicalize(&new_dir)?;
        env::set_current_dir(&canonical)?;
        tracing::debug!(dir = %canonical.display(), "changed directory");
        env.current_dir = canonical;
        Ok(Stream::empty())
    }
}

/// Line, word and byte totals printed by `wc`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Counts {
    pub lines: usize,
    pub words: usize,
    pub bytes: usize,
}

impl Counts {
    fn add_line(&mut self, line: &str) {
        self.lines += 1;
        self.words += line.split_whitespace().count();
        self.bytes += line.len();
    }

    /// Counts for piped text: the newline itself is not part of a line, and the
    /// empty piece after a final newline is not a line.
    pub(crate) fn of_stream(text: &str) -> Self {
        let mut pieces: Vec<&str> = text.split('\n').collect();
        if pieces.last() == Some(&"") {
            pieces.pop();
        }
        let mut counts = Self::default();
        for line in pieces {
            counts.add_line(line);
        }
        counts
    }

    /// Counts for file content: each line keeps its terminating newline.
    pub(crate) fn of_file(text: &str) -> Self {
        let mut counts = Self::default();
        for line in text.split_inclusive('\n') {
            counts.add_line(line);
        }
        counts
    }
}

#[derive(FromArgs)]
/// count lines, words and bytes
pub struct Wc {
    #[argh(positional, greedy)]
    /// files to count; the input stream is counted when none are given.
    pub files: Vec<String>,
}

impl BuiltinCommand for Wc {
    fn name() -> &'static str {
        "wc"
    }

    fn execute(self, input: Stream, env: &mut Environment) -> Result<Stream, ExecutionError> {
        if self.files.is_empty() {
            let c = Counts::of_stream(&input.read_to_string()?);
            return Ok(Stream::from_text(format!(
                "{:>3} {:>3} {:>3}\n",
                c.lines, c.words, c.bytes
            )));
        }

        input.close();
        let mut out = String::new();
        for fname in &self.files {
            let content = read_file("wc", env, fname)?;
            let c = Counts::of_file(&String::from_utf8_lossy(&content));
            out.push_str(&format!(
                "{:>3} {:>3} {:>3} {:>6}\n",
                c.lines, c.words, c.bytes, fname
            ));
        }
        Ok(Stream::from_text(out))
    }
}

#[derive(FromArgs)]
/// print file(s) to stdout
pub struct Cat {
    #[argh(positional, greedy)]
    /// files to print; the input stream is copied when none are given.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(self, input: Stream, env: &mut Environment) -> Result<Stream, ExecutionError> {
        if self.files.is_empty() {
            return Ok(Stream::from_text(input.read_to_string()?));
        }

        input.close();
        let mut out = Vec::new();
        for fname in &self.files {
            out.extend(read_file("cat", env, fname)?);
        }
        Ok(Stream::from_bytes(out))
    }
}

#[derive(FromArgs)]
/// list directory contents, skipping hidden entries
pub struct Ls {
    #[argh(positional, greedy)]
    /// directories to list; defaults to the current directory. `~` means $HOME.
    pub dirs: Vec<String>,
}

impl Ls {
    fn visible_entries(dir: &Path, shown_as: &str) -> Result<Vec<String>, ExecutionError> {
        let entries = fs::read_dir(dir).map_err(|_| ExecutionError::FileNotFound {
            command: "ls".into(),
            path: PathBuf::from(shown_as),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn one_per_line(names: &[String]) -> String {
    names.iter().map(|name| format!("{name}\n")).collect()
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(mut self, input: Stream, env: &mut Environment) -> Result<Stream, ExecutionError> {
        input.close();
        let mut out = String::new();

        if self.dirs.is_empty() {
            let names = Self::visible_entries(&env.current_dir, ".")?;
            return Ok(Stream::from_text(one_per_line(&names)));
        }

        self.dirs.sort();
        let with_headers = self.dirs.len() > 1;
        for dir in &self.dirs {
            let (path, shown_as) = match (dir.as_str(), env.home_dir()) {
                ("~", Some(home)) => (home.clone(), home.to_string_lossy().into_owned()),
                _ => (resolve_path(env, dir), dir.clone()),
            };

            let names = Self::visible_entries(&path, &shown_as)?;
            if with_headers {
                out.push_str(&shown_as);
                out.push('\n');
            }
            out.push_str(&one_per_line(&names));
            if with_headers {
                out.push('\n');
            }
        }
        Ok(Stream::from_text(out))
    }
}
