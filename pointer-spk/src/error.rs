//! Error types for pointer-spk

use pointer_core::Error as CoreError;
use thiserror::Error;

/// Speech output errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SpeechError> for CoreError {
    fn from(err: SpeechError) -> Self {
        CoreError::Speech(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_error_to_core_error() {
        let err = SpeechError::Engine("espeak-ng not available".to_string());
        let core: CoreError = err.into();
        match core {
            CoreError::Speech(msg) => assert!(msg.contains("espeak-ng")),
            _ => panic!("Expected Speech error"),
        }
    }
}
