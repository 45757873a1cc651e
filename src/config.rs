use argh::FromArgs;

/// Prompt shown by the interactive loop unless `--prompt` overrides it.
pub const DEFAULT_PROMPT: &str = "interpreter> ";

#[derive(FromArgs, Debug, PartialEq, Eq)]
/// A line-oriented command interpreter with pipes, quotes and variables.
pub struct Config {
    #[argh(option, short = 'c')]
    /// run one command line, print its output and exit
    pub command: Option<String>,

    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// prompt of the interactive session
    pub prompt: String,

    #[argh(switch, short = 'v')]
    /// log at debug level unless RUST_LOG says otherwise
    pub verbose: bool,

    #[argh(switch)]
    /// do not record entered lines in the line-editor history
    pub no_history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: None,
            prompt: DEFAULT_PROMPT.to_string(),
            verbose: false,
            no_history: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, argh::EarlyExit> {
        Config::from_args(&["pipeshell"], args)
    }

    #[test]
    fn test_defaults() {
        assert_eq!(parse(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_command_and_flags() {
        let config = parse(&["-c", "echo 1 | wc", "-v", "--no-history"]).unwrap();
        assert_eq!(config.command.as_deref(), Some("echo 1 | wc"));
        assert!(config.verbose);
        assert!(config.no_history);
        assert_eq!(config.prompt, DEFAULT_PROMPT);
    }

    #[test]
    fn test_custom_prompt() {
        let config = parse(&["--prompt", "$ "]).unwrap();
        assert_eq!(config.prompt, "$ ");
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = parse(&["--frobnicate"]).unwrap_err();
        assert!(err.status.is_err());
    }
}
