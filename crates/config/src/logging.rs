//! `[log]` section
//!
//! The level applies to the stage's own crates. Dependencies (the HTTP
//! server, the trace layer) are held one notch quieter and never louder
//! than `warn` unless the stage itself runs at `debug` or `trace`.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Tracing targets of the stage's own crates
pub const STAGE_TARGETS: [&str; 6] = [
    "rtdl",
    "rtdl_config",
    "rtdl_routing",
    "rtdl_sinks",
    "rtdl_transform",
    "rtdl_pipeline",
];

/// Verbosity of the stage crates
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    /// Per-event decisions: resolved destination, matched rule, version written
    Debug,
    /// Startup, reloads and forward targets
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive name understood by `EnvFilter`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Level applied to targets outside [`STAGE_TARGETS`]
    pub const fn dependency_level(self) -> Self {
        match self {
            Self::Trace => Self::Debug,
            Self::Debug => Self::Info,
            Self::Info | Self::Warn => Self::Warn,
            Self::Error => Self::Error,
        }
    }

    /// Filter directives for this level, e.g. `warn,rtdl=info,rtdl_config=info,...`
    pub fn directives(self) -> String {
        let mut out = String::from(self.dependency_level().as_str());
        for target in STAGE_TARGETS {
            out.push(',');
            out.push_str(target);
            out.push('=');
            out.push_str(self.as_str());
        }
        out
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Output format of the subscriber
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per line, for log shippers
    Json,
}

/// `[log]` section
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: LogConfig = toml::from_str("").unwrap();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Console);
    }

    #[test]
    fn test_json_format() {
        let config: LogConfig = toml::from_str("level = \"debug\"\nformat = \"json\"").unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(toml::from_str::<LogConfig>("level = \"loud\"").is_err());
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_parse_is_lenient_about_case() {
        assert_eq!(" WARNING ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("Debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
    }

    #[test]
    fn test_dependencies_stay_quiet_at_info() {
        assert_eq!(
            LogLevel::Info.directives(),
            "warn,rtdl=info,rtdl_config=info,rtdl_routing=info,rtdl_sinks=info,\
             rtdl_transform=info,rtdl_pipeline=info"
        );
    }

    #[test]
    fn test_dependency_level_is_never_louder_than_stage() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert!(level.dependency_level() >= level, "{level}");
        }
        assert!(LogLevel::Error.directives().starts_with("error,"));
        assert!(LogLevel::Trace.directives().starts_with("debug,rtdl=trace"));
    }
}
