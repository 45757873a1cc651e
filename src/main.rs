use anyhow::Context;
use pipeshell::config::Config;
use pipeshell::{Interpreter, Stream, logging};
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config: Config = argh::from_env();
    logging::init(config.verbose);

    match run(&config) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> anyhow::Result<ExitCode> {
    let mut sh = Interpreter::default();

    let Some(line) = &config.command else {
        sh.repl(config)?;
        return Ok(ExitCode::SUCCESS);
    };

    match sh.evaluate(line, Stream::stdin()) {
        Ok(Some(output)) => {
            let mut stdout = io::stdout();
            stdout
                .write_all(output.as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write output")?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            sh.report(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}
