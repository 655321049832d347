//! Console logging for the CLI.
//!
//!   cipherstudio-cli --debug ...              # debug logging
//!   RUST_LOG=cipherstudio_preview=debug ...   # fine-grained control

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset. Only warnings by default, so stderr stays
/// quiet around command output.
fn fallback_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. Logs go to stderr so command output stays clean.
pub fn init_tracing(debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback_directive(debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_quiet_unless_debugging() {
        assert_eq!(fallback_directive(false), "warn");
        assert_eq!(fallback_directive(true), "debug");
    }
}
