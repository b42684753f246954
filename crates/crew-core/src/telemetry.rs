//! Log output for the `agentic-crew` binary.
//!
//! Everything goes to stderr; stdout carries command output and `--json`
//! documents only. `RUST_LOG`, when set, replaces the command-line level.

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter for `level` unless `RUST_LOG` says otherwise.
fn filter_for(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

/// Install stderr logging, as JSON lines when `json` is set.
///
/// A second call keeps the subscriber installed by the first.
pub fn init_tracing(json: bool, level: Level) {
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let output = if json {
        stderr.json().boxed()
    } else {
        stderr.boxed()
    };
    let _ = tracing_subscriber::registry()
        .with(filter_for(level))
        .with(output)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_ignored() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
    }
}
