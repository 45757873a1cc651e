use crate::command::CommandRegistry;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::env::{Environment, VariableStore};
use crate::io_adapters::Stream;
use crate::lexer::lex;
use crate::pipeline::{Outcome, PipelineExecutor, ShellError};
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};

/// A session of the line interpreter.
///
/// The interpreter owns the session [`Environment`] (variables, working
/// directory, exit flag) and a [`PipelineExecutor`] over a registry of
/// commands. Each line is lexed against the current variables and then run
/// stage by stage.
///
/// Example
/// ```
/// use pipeshell::{Interpreter, Stream};
/// let mut sh = Interpreter::default();
/// let out = sh.evaluate("echo hello world", Stream::empty()).unwrap();
/// assert_eq!(out.as_deref(), Some("hello world \n"));
/// ```
pub struct Interpreter {
    env: Environment,
    executor: PipelineExecutor,
}

impl Interpreter {
    /// Create an interpreter over a custom set of commands.
    pub fn new(registry: CommandRegistry) -> Self {
        Self::with_environment(registry, Environment::new())
    }

    pub fn with_environment(registry: CommandRegistry, env: Environment) -> Self {
        Self {
            env,
            executor: PipelineExecutor::new(Dispatcher::new(registry)),
        }
    }

    /// Lex and run one line. `ambient` feeds the first stage.
    pub fn run_line(&mut self, line: &str, ambient: Stream) -> Result<Outcome, ShellError> {
        let pipeline = match lex(line, &self.env.variables) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                ambient.close();
                return Err(err.into());
            }
        };
        tracing::debug!(stages = pipeline.len(), "lexed line");
        self.executor.execute(&pipeline, ambient, &mut self.env)
    }

    /// Run one line and collect its output.
    ///
    /// Returns `Ok(None)` when the line ended the session.
    pub fn evaluate(&mut self, line: &str, ambient: Stream) -> Result<Option<String>, ShellError> {
        match self.run_line(line, ambient)? {
            Outcome::Output(stream) => Ok(Some(
                stream
                    .read_to_string()
                    .map_err(|err| ShellError::Execution(err.into()))?,
            )),
            Outcome::Exit => Ok(None),
        }
    }

    /// Log `err` and print the one-line diagnostic for it.
    pub fn report(&self, err: &ShellError) {
        tracing::debug!(error = ?err, "line failed");
        eprintln!("{err}");
    }

    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    pub fn variables(&self) -> &VariableStore {
        &self.env.variables
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Commands known to this session; register more to extend it.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        self.executor.dispatcher_mut().registry_mut()
    }

    /// Read-Eval-Print Loop over the terminal.
    ///
    /// Ends on `exit`, Ctrl-C or Ctrl-D. Failed lines are reported and the loop
    /// continues.
    pub fn repl(&mut self, config: &Config) -> anyhow::Result<()> {
        let mut editor = DefaultEditor::new().context("failed to initialise the line editor")?;
        let mut stdout = io::stdout();

        while !self.should_exit() {
            let line = match editor.readline(&config.prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(err) => return Err(err).context("failed to read a line"),
            };
            if !config.no_history && !line.trim().is_empty() {
                editor
                    .add_history_entry(line.as_str())
                    .context("failed to record history")?;
            }

            match self.evaluate(&line, Stream::stdin()) {
                Ok(Some(output)) => {
                    stdout
                        .write_all(output.as_bytes())
                        .and_then(|()| stdout.flush())
                        .context("failed to write output")?;
                }
                Ok(None) => break,
                Err(err) => self.report(&err),
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default builtins, see
    /// [`CommandRegistry::default`].
    fn default() -> Self {
        Self::new(CommandRegistry::default())
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use crate::command::ExecutionError;
    use crate::dispatch::DispatchError;
    use crate::lexer::LexError;
    use pretty_assertions::assert_eq;

    fn eval(sh: &mut Interpreter, line: &str) -> String {
        sh.evaluate(line, Stream::empty())
            .unwrap()
            .expect("line should not exit")
    }

    #[test]
    fn test_echo_number() {
        let mut sh = Interpreter::default();
        assert_eq!(eval(&mut sh, "echo 123"), "123 \n");
    }

    #[test]
    fn test_echo_double_quoted() {
        let mut sh = Interpreter::default();
        assert_eq!(eval(&mut sh, "echo \"Hello\""), "Hello \n");
    }

    #[test]
    fn test_variables_across_lines() {
        let mut sh = Interpreter::default();
        assert_eq!(eval(&mut sh, "i=4"), "");
        assert_eq!(eval(&mut sh, "echo $i"), "4 \n");
        assert_eq!(eval(&mut sh, "echo \"$i\""), "4 \n");
        assert_eq!(eval(&mut sh, "echo '$i'"), "$i \n");
        assert_eq!(eval(&mut sh, "echo $j"), " \n");
        assert_eq!(sh.variables().lookup("i"), "4");
    }

    #[test]
    fn test_variable_as_command_name() {
        let mut sh = Interpreter::default();
        eval(&mut sh, "x=ec");
        eval(&mut sh, "y=ho");
        assert_eq!(eval(&mut sh, "$x$y hi"), "hi \n");
    }

    #[test]
    fn test_echo_pipe_wc_pipe_wc() {
        let mut sh = Interpreter::default();
        assert_eq!(eval(&mut sh, "echo 123 | wc | wc"), "  1   3  11\n");
    }

    #[test]
    fn test_pipe_inside_quotes_is_literal() {
        let mut sh = Interpreter::default();
        assert_eq!(eval(&mut sh, "echo \"a|b\""), "a|b \n");
    }

    #[test]
    fn test_cat_passes_through() {
        let mut sh = Interpreter::default();
        assert_eq!(eval(&mut sh, "echo 'a  b' | cat"), "a  b \n");
    }

    #[test]
    fn test_unterminated_quote_runs_nothing() {
        let mut sh = Interpreter::default();
        let err = sh.evaluate("x=1 | echo \"abc", Stream::empty()).unwrap_err();
        assert!(matches!(err, ShellError::Lex(LexError::UnterminatedQuote { .. })));
        assert!(!sh.variables().contains("x"));
    }

    #[test]
    fn test_failure_mid_pipeline_has_no_output() {
        let mut sh = Interpreter::with_environment(
            CommandRegistry::default(),
            Environment::with_dir(std::env::temp_dir()),
        );
        let err = sh
            .evaluate("echo 1 | wc no-such-file-here.txt | cat", Stream::empty())
            .unwrap_err();
        assert!(matches!(
            err,
            ShellError::Execution(ExecutionError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_unknown_command() {
        let mut sh = Interpreter::default();
        let err = sh
            .evaluate("no-such-command-at-all-7", Stream::empty())
            .unwrap_err();
        assert!(matches!(err, ShellError::Dispatch(DispatchError::UnknownCommand(_))));
    }

    #[test]
    fn test_exit_ends_session() {
        let mut sh = Interpreter::default();
        assert_eq!(sh.evaluate("echo 1 | exit | wc", Stream::empty()).unwrap(), None);
        assert!(sh.should_exit());
    }

    #[test]
    fn test_blank_line_is_empty_output() {
        let mut sh = Interpreter::default();
        assert_eq!(eval(&mut sh, "   "), "");
    }
}
