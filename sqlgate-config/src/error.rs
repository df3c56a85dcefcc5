//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("syntax error in configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
