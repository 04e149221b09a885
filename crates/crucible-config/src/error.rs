use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The layer of the configuration an error was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// `defaults.toml` compiled into the binary.
    Defaults,
    /// `config.toml` under `~/.crucible` or `$CRUCIBLE_HOME`.
    User,
    /// The file passed with `--config`.
    Explicit,
    /// All layers merged, after environment fallbacks.
    Merged,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Defaults => "built-in defaults",
            Self::User => "user config",
            Self::Explicit => "--config file",
            Self::Merged => "merged configuration",
        })
    }
}

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read {layer} {}: {source}", path.display())]
    Unreadable {
        /// Layer the file belongs to.
        layer: ConfigLayer,
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The `--config` file does not exist.
    #[error("--config file {} does not exist", path.display())]
    MissingFile {
        /// The path that was given.
        path: PathBuf,
    },

    /// A config file is larger than Crucible accepts.
    #[error("{layer} {} is {size} bytes, over the {limit} byte limit", path.display())]
    TooLarge {
        /// Layer the file belongs to.
        layer: ConfigLayer,
        /// The file.
        path: PathBuf,
        /// Its size in bytes.
        size: u64,
        /// The limit in bytes.
        limit: u64,
    },

    /// A layer is not valid TOML, or does not fit the Crucible schema.
    #[error("{layer} ({origin}) is not a valid Crucible config: {source}")]
    Malformed {
        /// Layer that failed.
        layer: ConfigLayer,
        /// File path, or a description for layers without one.
        origin: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A setting has a value Crucible cannot run with.
    #[error("invalid setting `{field}`: {message}")]
    Invalid {
        /// Dotted path of the setting, such as `sandbox.default_timeout_ms`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// There is no home directory to find `~/.crucible` in.
    #[error("no home directory to look for ~/.crucible in; set CRUCIBLE_HOME or pass --config")]
    NoHomeDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_layer() {
        let err = ConfigError::Unreadable {
            layer: ConfigLayer::User,
            path: PathBuf::from("/home/u/.crucible/config.toml"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "cannot read user config /home/u/.crucible/config.toml: denied"
        );

        let err = ConfigError::MissingFile {
            path: PathBuf::from("ci.toml"),
        };
        assert_eq!(err.to_string(), "--config file ci.toml does not exist");
    }

    #[test]
    fn test_invalid_setting_message() {
        let err = ConfigError::Invalid {
            field: "sandbox.default_timeout_ms".to_owned(),
            message: "must be greater than zero".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "invalid setting `sandbox.default_timeout_ms`: must be greater than zero"
        );
    }
}
