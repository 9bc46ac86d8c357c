//! Configuration for speech output

use serde::{Deserialize, Serialize};

/// Speech output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speak through the configured engine; when off, utterances are only logged
    pub enabled: bool,

    /// Preferred TTS engine
    pub engine: TtsEngine,

    /// Voice settings
    pub voice: VoiceConfig,

    /// Speech rate (words per minute, 0-500, default 150)
    pub rate: u32,

    /// Volume (0.0-1.0, default 1.0)
    pub volume: f32,

    /// Pitch adjustment (-1.0 to 1.0, default 0.0)
    pub pitch: f32,

    /// Maximum number of utterances waiting to be spoken
    pub queue_size: usize,
}

/// TTS Engine type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TtsEngine {
    /// Native platform TTS (Linux espeak-ng, macOS say)
    Native,
    /// Write utterances to the log instead of speaking them
    Log,
}

/// Voice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice name/identifier
    pub name: Option<String>,

    /// Language code (e.g., "en", "en-US")
    pub language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: TtsEngine::Native,
            voice: VoiceConfig::default(),
            rate: 150,
            volume: 1.0,
            pitch: 0.0,
            queue_size: 8,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: "en".to_string(),
        }
    }
}

impl VoiceConfig {
    /// Validate voice configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_empty() {
            return Err("Language code cannot be empty".to_string());
        }

        if self.language.len() > 32 {
            return Err("Language code too long (max 32 chars)".to_string());
        }

        if !self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("Language code contains invalid characters (only alphanumeric and '-' allowed)".to_string());
        }

        if let Some(ref name) = self.name {
            if name.is_empty() {
                return Err("Voice name cannot be empty if provided".to_string());
            }

            if name.len() > 256 {
                return Err("Voice name too long (max 256 chars)".to_string());
            }

            if name.chars().any(|c| c == '\0' || c.is_control()) {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        Ok(())
    }
}

impl SpeechConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rate > 500 {
            return Err("Speech rate must be between 0 and 500 WPM".to_string());
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        if !(-1.0..=1.0).contains(&self.pitch) {
            return Err("Pitch must be between -1.0 and 1.0".to_string());
        }

        if self.queue_size == 0 {
            return Err("Queue size must be greater than 0".to_string());
        }

        if self.queue_size > 1024 {
            return Err("Queue size too large (max 1024)".to_string());
        }

        self.voice.validate()
    }
}
