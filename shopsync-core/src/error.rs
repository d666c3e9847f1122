//! Error types for shopsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving credentials and configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.shopsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The requested section is not present in the config file.
    #[error("section '{section}' not found in {path}")]
    UnknownSection { section: String, path: PathBuf },

    /// Neither the config file nor the environment supplied a shop host.
    #[error("no shop host configured for section '{section}'; set SHOPIFY_HOST or add `host:` to the config")]
    MissingHost { section: String },
}
