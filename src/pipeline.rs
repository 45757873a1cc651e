use crate::command::{CommandRegistry, ExecutionError};
use crate::dispatch::{DispatchError, Dispatcher, Resolution};
use crate::env::Environment;
use crate::io_adapters::Stream;
use crate::lexer::{LexError, Pipeline, Stage};
use thiserror::Error;

/// Any failure of a single input line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Result of a pipeline that ran to completion.
#[derive(Debug)]
pub enum Outcome {
    /// The stream produced by the last stage.
    Output(Stream),
    /// A stage asked to end the session; nothing else is printed.
    Exit,
}

/// Runs the stages of a [`Pipeline`] one after another.
///
/// Stage 0 receives the ambient stream, every later stage receives exactly the
/// output of its predecessor. The first failing stage aborts the pipeline and
/// whatever was produced so far is dropped.
pub struct PipelineExecutor {
    dispatcher: Dispatcher,
}

impl PipelineExecutor {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn execute(
        &self,
        pipeline: &Pipeline,
        ambient: Stream,
        env: &mut Environment,
    ) -> Result<Outcome, ShellError> {
        if pipeline.is_empty() {
            ambient.close();
            return Ok(Outcome::Output(Stream::empty()));
        }

        let mut current = ambient;
        for (index, stage) in pipeline.stages().iter().enumerate() {
            current = self.run_stage(index, stage, current, env)?;
            if env.should_exit {
                tracing::debug!(stage = index, "exit requested");
                current.close();
                return Ok(Outcome::Exit);
            }
        }
        Ok(Outcome::Output(current))
    }

    fn run_stage(
        &self,
        index: usize,
        stage: &Stage,
        input: Stream,
        env: &mut Environment,
    ) -> Result<Stream, ShellError> {
        let resolution = match self.dispatcher.resolve(stage, &env.current_dir) {
            Ok(resolution) => resolution,
            Err(err) => {
                input.close();
                return Err(err.into());
            }
        };
        tracing::debug!(
            stage = index,
            head = stage.head().text(),
            kind = resolution.kind(),
            "running stage"
        );

        let output = match resolution {
            Resolution::Builtin(command) => command.execute(stage.arguments(), input, env)?,
            Resolution::Assignment { name, value } => {
                input.close();
                tracing::debug!(%name, %value, "assigning variable");
                env.variables.assign(name, value);
                Stream::empty()
            }
            Resolution::External(command) => command.execute(input, env)?,
        };
        Ok(output)
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new(Dispatcher::new(CommandRegistry::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::env::VariableStore;
    use crate::lexer::{Token, lex};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::io::{self, Read};
    use std::rc::Rc;

    /// Counts its invocations and passes input through.
    struct Tally {
        calls: Rc<Cell<usize>>,
    }

    impl Command for Tally {
        fn name(&self) -> &str {
            "tally"
        }

        fn execute(
            &self,
            _args: &[Token],
            input: Stream,
            _env: &mut Environment,
        ) -> Result<Stream, ExecutionError> {
            self.calls.set(self.calls.get() + 1);
            Ok(Stream::from_text(input.read_to_string()?))
        }
    }

    fn executor_with_tally() -> (PipelineExecutor, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let registry = CommandRegistry::default().with(Box::new(Tally {
            calls: Rc::clone(&calls),
        }));
        let dispatcher = Dispatcher::new(registry).with_search_path("");
        (PipelineExecutor::new(dispatcher), calls)
    }

    fn output(outcome: Outcome) -> String {
        match outcome {
            Outcome::Output(stream) => stream.read_to_string().unwrap(),
            Outcome::Exit => panic!("unexpected exit"),
        }
    }

    fn run(
        executor: &PipelineExecutor,
        line: &str,
        env: &mut Environment,
    ) -> Result<Outcome, ShellError> {
        let pipeline = lex(line, &env.variables)?;
        executor.execute(&pipeline, Stream::empty(), env)
    }

    #[test]
    fn test_empty_pipeline_yields_empty_output() {
        let executor = PipelineExecutor::default();
        let mut env = Environment::new();
        let outcome = executor
            .execute(&Pipeline::default(), Stream::from_text("ignored"), &mut env)
            .unwrap();
        assert_eq!(output(outcome), "");
    }

    /// Ambient input that panics if anything reads it.
    struct Untouchable;

    impl Read for Untouchable {
        fn read(&mut self, _out: &mut [u8]) -> io::Result<usize> {
            panic!("ambient input must not be read");
        }
    }

    #[test]
    fn test_blank_line_does_not_read_ambient_input() {
        let executor = PipelineExecutor::default();
        let mut env = Environment::new();
        let pipeline = lex("   ", &env.variables).unwrap();
        let outcome = executor
            .execute(&pipeline, Stream::from_reader(Untouchable), &mut env)
            .unwrap();
        assert_eq!(output(outcome), "");
    }

    #[test]
    fn test_first_stage_reads_ambient_stream() {
        let (executor, _) = executor_with_tally();
        let mut env = Environment::new();
        let pipeline = lex("cat | tally", &VariableStore::new()).unwrap();
        let outcome = executor
            .execute(&pipeline, Stream::from_text("ambient\n"), &mut env)
            .unwrap();
        assert_eq!(output(outcome), "ambient\n");
    }

    #[test]
    fn test_stages_chain_outputs() {
        let executor = PipelineExecutor::default();
        let mut env = Environment::new();
        let outcome = run(&executor, "echo 123 | wc | wc", &mut env).unwrap();
        assert_eq!(output(outcome), "  1   3  11\n");
    }

    #[test]
    fn test_assignment_changes_one_variable_and_emits_nothing() {
        let executor = PipelineExecutor::default();
        let mut env = Environment::new();
        let outcome = run(&executor, "greeting=hi", &mut env).unwrap();
        assert_eq!(output(outcome), "");
        assert_eq!(env.variables.len(), 1);
        assert_eq!(env.variables.lookup("greeting"), "hi");
    }

    #[test]
    fn test_unknown_command_aborts_before_later_stages() {
        let (executor, calls) = executor_with_tally();
        let mut env = Environment::new();
        let err = run(&executor, "tally | no-such-command | tally", &mut env).unwrap_err();
        assert!(matches!(
            err,
            ShellError::Dispatch(DispatchError::UnknownCommand(ref name))
                if name == "no-such-command"
        ));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failing_stage_discards_output() {
        let (executor, calls) = executor_with_tally();
        let mut env = Environment::with_dir(std::env::temp_dir());
        let err = run(
            &executor,
            "echo kept | cat definitely-missing-file.txt | tally",
            &mut env,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ShellError::Execution(ExecutionError::FileNotFound { .. })
        ));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_exit_stops_the_pipeline() {
        let (executor, calls) = executor_with_tally();
        let mut env = Environment::new();
        let outcome = run(&executor, "echo bye | exit | tally", &mut env).unwrap();
        assert!(matches!(outcome, Outcome::Exit));
        assert!(env.should_exit);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_exit_as_last_stage() {
        let executor = PipelineExecutor::default();
        let mut env = Environment::new();
        let outcome = run(&executor, "exit", &mut env).unwrap();
        assert!(matches!(outcome, Outcome::Exit));
    }
}
