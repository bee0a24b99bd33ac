//! Errors raised while persisting `config.ron`.

/// Failure to load or store the terrain configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config.ron: {0}")]
    Read(#[source] std::io::Error),

    /// Also covers creating the config directory.
    #[error("could not write config.ron: {0}")]
    Write(#[source] std::io::Error),

    #[error("config.ron is not valid RON: {0}")]
    Parse(#[source] ron::error::SpannedError),

    #[error("could not encode config as RON: {0}")]
    Serialize(#[source] ron::Error),
}
