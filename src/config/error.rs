use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config from {0}")]
    Parse(String, #[source] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Unknown station group '{0}'")]
    UnknownGroup(String),

    #[error("Config has already been installed")]
    AlreadyInstalled,
}
