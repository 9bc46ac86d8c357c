//! Engine that writes utterances to the log

use crate::config::VoiceConfig;
use crate::engines::TtsEngine;
use crate::error::SpeechError;
use async_trait::async_trait;
use tracing::info;

/// Log-only engine for headless hosts and disabled speech
#[derive(Debug, Default)]
pub struct LogTtsEngine;

impl LogTtsEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TtsEngine for LogTtsEngine {
    async fn speak(&self, text: &str, _voice: &VoiceConfig) -> Result<(), SpeechError> {
        info!(utterance = %text, "speak");
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "log"
    }
}
