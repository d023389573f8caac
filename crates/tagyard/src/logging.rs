//! Logging setup for the CLI.
//!
//! The library emits `tracing` events; this wires them to stderr in either
//! pretty or JSON form. The level configured in `[logging]` is the default
//! filter directive and the `RUST_LOG` environment variable overrides it
//! entirely.

use tagyard_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `level` is the default filter directive (`"warn"`, `"info"`, `"debug"`,
/// ...). Output goes to stderr so stdout stays reserved for captions and
/// tables.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize from the app config, honoring the CLI flag overrides.
pub fn init_from_config(config: &Config, verbose_override: bool, json_logs_override: bool) {
    let (level, json_format) = resolve(config, verbose_override, json_logs_override);
    init(level, json_format);
}

/// Pick the effective filter directive and output format.
///
/// `--verbose` raises the filter to debug regardless of the configured
/// level; `--json-logs` forces JSON output. Otherwise the config's
/// `logging.level` and `logging.format` are used as-is.
fn resolve<'a>(config: &'a Config, verbose: bool, json_logs: bool) -> (&'a str, bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let json_format = json_logs || config.logging.format == "json";
    (level, json_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_verbatim() {
        let mut config = Config::default();
        config.logging.level = "warn".to_string();
        assert_eq!(resolve(&config, false, false), ("warn", false));
    }

    #[test]
    fn verbose_flag_overrides_the_configured_level() {
        let mut config = Config::default();
        config.logging.level = "error".to_string();
        assert_eq!(resolve(&config, true, false), ("debug", false));
    }

    #[test]
    fn json_comes_from_config_or_flag() {
        let mut config = Config::default();
        config.logging.format = "json".to_string();
        assert_eq!(resolve(&config, false, false).1, true);

        let config = Config::default();
        assert_eq!(resolve(&config, false, true).1, true);
        assert_eq!(resolve(&config, false, false).1, false);
    }
}
