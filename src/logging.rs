use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when `RUST_LOG` is unset or invalid.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Install the global subscriber. Logs go to stderr so they never mix with
/// pipeline output on stdout.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "warn");
    }
}
