//! TTS engine implementations

pub mod log;
pub mod native;

use crate::config::{SpeechConfig, VoiceConfig};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Longest utterance handed to an engine, in characters
pub const MAX_UTTERANCE_CHARS: usize = 1_000;

/// Trait for TTS engines
///
/// `speak` resolves once the utterance has been vocalized, which is what lets
/// the announcement queue serialize speech.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Vocalize text
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError>;

    /// Check if engine is available
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &str;
}

/// Build the engine selected by `config`.
///
/// A disabled config, or a native engine missing on this host, falls back to
/// the log engine so the pipeline keeps running silently.
pub fn build_engine(config: &SpeechConfig) -> Result<Arc<dyn TtsEngine>, SpeechError> {
    config.validate().map_err(SpeechError::Config)?;

    if !config.enabled {
        return Ok(Arc::new(log::LogTtsEngine::new()));
    }

    match config.engine {
        crate::config::TtsEngine::Native => {
            let engine = native::NativeTtsEngine::new_with_config(config.rate, config.volume, config.pitch);
            if engine.is_available() {
                Ok(Arc::new(engine))
            } else {
                warn!("Native TTS engine not available, falling back to log output");
                Ok(Arc::new(log::LogTtsEngine::new()))
            }
        }
        crate::config::TtsEngine::Log => Ok(Arc::new(log::LogTtsEngine::new())),
    }
}

/// Strip control characters and cap the length of an utterance
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .take(MAX_UTTERANCE_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  cup\n"), "cup");
        assert_eq!(sanitize_text("dining\u{0}table"), "diningtable");
        assert_eq!(sanitize_text(&"a".repeat(5000)).len(), MAX_UTTERANCE_CHARS);
    }

    #[test]
    fn test_build_engine_disabled_uses_log() {
        let config = SpeechConfig {
            enabled: false,
            ..SpeechConfig::default()
        };
        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.name(), "log");
    }

    #[test]
    fn test_build_engine_rejects_invalid_config() {
        let config = SpeechConfig {
            queue_size: 0,
            ..SpeechConfig::default()
        };
        assert!(matches!(build_engine(&config), Err(SpeechError::Config(_))));
    }
}
