use clap::ValueEnum;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` with full filter directives when set.
pub const LOG_ENV: &str = "DRIFTCODEC_LOG";

const CRATE_TARGETS: [&str; 4] = [
    "driftcodec",
    "driftcodec_protocol",
    "driftcodec_metadata",
    "driftcodec_codec",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn name(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// `level` for our own crates; dependencies never go below `warn`.
    fn directives(self) -> String {
        let others = if self == LogLevel::Error { "error" } else { "warn" };
        let mut directives = others.to_string();
        for target in CRATE_TARGETS {
            directives.push_str(&format!(",{target}={}", self.name()));
        }
        directives
    }

    /// Catalog, codec and protocol events are told apart by target.
    fn shows_target(self) -> bool {
        matches!(self, LogLevel::Debug | LogLevel::Trace)
    }
}

fn build_env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level.directives()))
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(level.shows_target());
    let registry = tracing_subscriber::registry().with(build_env_filter(level));

    let _ = match format {
        LogFormat::Text => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_scope_level_to_workspace_crates() {
        assert_eq!(
            LogLevel::Debug.directives(),
            "warn,driftcodec=debug,driftcodec_protocol=debug,\
             driftcodec_metadata=debug,driftcodec_codec=debug"
        );
        assert!(LogLevel::Error.directives().starts_with("error,"));
    }

    #[test]
    fn targets_shown_only_when_verbose() {
        assert!(!LogLevel::Info.shows_target());
        assert!(LogLevel::Trace.shows_target());
    }
}
