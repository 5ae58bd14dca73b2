use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardinalsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
