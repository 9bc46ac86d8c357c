use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Vision error: {0}")]
    Vision(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Concurrency error: {0}")]
    Concurrency(String),
}

pub type Result<T> = std::result::Result<T, Error>;
